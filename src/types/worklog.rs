use std::fmt;
use std::sync::OnceLock;

use clap::ValueEnum;
use regex::Regex;
use serde::Serialize;

use crate::error::{Result, TrackerError};

/// How the remaining estimate is recalculated after logging work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RecalculationMode {
    /// Reduce the remaining estimate by the time spent
    AdjustAutomatically,
    /// Leave the remaining estimate untouched
    RetainRemaining,
    /// Replace the remaining estimate with a new value
    SetRemaining(String),
}

/// Mode names accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RemainingArg {
    #[default]
    Auto,
    Retain,
    Set,
}

impl RecalculationMode {
    /// Build a mode from its CLI name; `set` requires the new estimate.
    pub fn from_arg(arg: RemainingArg, new_estimate: Option<&str>) -> Result<Self> {
        match arg {
            RemainingArg::Auto => Ok(Self::AdjustAutomatically),
            RemainingArg::Retain => Ok(Self::RetainRemaining),
            RemainingArg::Set => match new_estimate.map(str::trim) {
                Some(estimate) if !estimate.is_empty() => {
                    validate_duration(estimate)?;
                    Ok(Self::SetRemaining(estimate.to_string()))
                }
                _ => Err(TrackerError::MissingEstimate),
            },
        }
    }

    /// Value of Jira's `adjustEstimate` query parameter.
    pub fn adjust_param(&self) -> &'static str {
        match self {
            Self::AdjustAutomatically => "auto",
            Self::RetainRemaining => "leave",
            Self::SetRemaining(_) => "new",
        }
    }
}

impl fmt::Display for RecalculationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdjustAutomatically => write!(f, "Adjust automatically"),
            Self::RetainRemaining => write!(f, "Do not change"),
            Self::SetRemaining(estimate) => write!(f, "Set to {estimate}"),
        }
    }
}

/// A time-tracking entry to add to each selected issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorklogRequest {
    pub time_spent: String,
    pub mode: RecalculationMode,
}

impl WorklogRequest {
    pub fn new(time_spent: impl Into<String>, mode: RecalculationMode) -> Self {
        Self {
            time_spent: time_spent.into(),
            mode,
        }
    }

    /// Requests with no time spent are skipped by the commit.
    pub fn is_empty(&self) -> bool {
        self.time_spent.trim().is_empty()
    }
}

fn duration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(\d+(\.\d+)?\s*[wdhm]\s*)+$").expect("invalid duration regex")
    })
}

/// Check a Jira duration such as `1w 2d 3h 30m`.
pub fn validate_duration(value: &str) -> Result<()> {
    if duration_regex().is_match(value) {
        Ok(())
    } else {
        Err(TrackerError::InvalidTimeSpent(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_duration() {
        assert!(validate_duration("1h").is_ok());
        assert!(validate_duration("1w 2d 3h 30m").is_ok());
        assert!(validate_duration("1.5h").is_ok());
        assert!(validate_duration("soon").is_err());
        assert!(validate_duration("").is_err());
    }

    #[test]
    fn test_set_mode_requires_estimate() {
        assert!(matches!(
            RecalculationMode::from_arg(RemainingArg::Set, None),
            Err(TrackerError::MissingEstimate)
        ));
        assert!(matches!(
            RecalculationMode::from_arg(RemainingArg::Set, Some("  ")),
            Err(TrackerError::MissingEstimate)
        ));
        assert_eq!(
            RecalculationMode::from_arg(RemainingArg::Set, Some("2h")).unwrap(),
            RecalculationMode::SetRemaining("2h".to_string())
        );
    }

    #[test]
    fn test_other_modes_ignore_estimate() {
        assert_eq!(
            RecalculationMode::from_arg(RemainingArg::Retain, Some("2h")).unwrap(),
            RecalculationMode::RetainRemaining
        );
        assert_eq!(RecalculationMode::AdjustAutomatically.adjust_param(), "auto");
    }

    #[test]
    fn test_blank_time_spent_is_empty() {
        let request = WorklogRequest::new("  ", RecalculationMode::AdjustAutomatically);
        assert!(request.is_empty());
    }
}
