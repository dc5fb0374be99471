//! Workflow actions shared by a selection, and field values for executing them.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::error::{Result, TrackerError};
use crate::service::IssueService;
use crate::types::{FieldRequirement, FieldValue, Identifiable, Issue, Resolution, User, WorkflowAction};

/// Who an issue is assigned to when an action requires an assignee.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AssigneeChoice {
    /// Keep the issue's current assignee.
    #[default]
    Keep,
    /// Hand the issue back to whoever reported it.
    Reporter,
    User(User),
}

impl AssigneeChoice {
    const KEEP_ID: &'static str = "__keep__";
    const REPORTER_ID: &'static str = "__reporter__";

    /// The concrete user for an issue; reporter falls back to the assignee.
    pub fn resolve(&self, issue: &Issue) -> Option<User> {
        match self {
            Self::Keep => issue.assignee.clone(),
            Self::Reporter => issue.reporter.clone().or_else(|| issue.assignee.clone()),
            Self::User(user) => Some(user.clone()),
        }
    }
}

impl Identifiable for AssigneeChoice {
    fn id(&self) -> &str {
        match self {
            Self::Keep => Self::KEEP_ID,
            Self::Reporter => Self::REPORTER_ID,
            Self::User(user) => user.id(),
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Keep => "(Current Assignee)",
            Self::Reporter => "(Reporter)",
            Self::User(user) => user.name(),
        }
    }
}

/// How the value of a required field is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldStrategy {
    /// First resolution whose name contains "fix".
    FixResolution,
    /// The resolved assignee's id.
    Assignee,
    /// Never sent.
    Omit,
    /// The issue's stored value, else the configured default.
    StoredOrConfigured,
}

struct FieldRule {
    applies: fn(&FieldRequirement) -> bool,
    strategy: FieldStrategy,
}

fn is_resolution(field: &FieldRequirement) -> bool {
    field.name.eq_ignore_ascii_case("Resolution")
}

fn is_assignee(field: &FieldRequirement) -> bool {
    field.name.eq_ignore_ascii_case("Assignee")
}

// Some server versions reject an explicit worklog on transitions.
fn is_worklog(field: &FieldRequirement) -> bool {
    field.id.eq_ignore_ascii_case("Worklog") || field.name.eq_ignore_ascii_case("Worklog")
}

/// Evaluated top to bottom; unmatched fields use `StoredOrConfigured`.
const FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        applies: is_resolution,
        strategy: FieldStrategy::FixResolution,
    },
    FieldRule {
        applies: is_assignee,
        strategy: FieldStrategy::Assignee,
    },
    FieldRule {
        applies: is_worklog,
        strategy: FieldStrategy::Omit,
    },
];

pub fn strategy_for(field: &FieldRequirement) -> FieldStrategy {
    FIELD_RULES
        .iter()
        .find(|rule| (rule.applies)(field))
        .map_or(FieldStrategy::StoredOrConfigured, |rule| rule.strategy)
}

/// Id of the first resolution whose name contains "fix", ignoring case.
pub fn find_fix_resolution(resolutions: &[Resolution]) -> Result<&Resolution> {
    resolutions
        .iter()
        .find(|r| r.name.to_lowercase().contains("fix"))
        .ok_or(TrackerError::NoFixResolution)
}

pub struct ActionResolver<'a, S> {
    service: &'a S,
}

impl<'a, S: IssueService> ActionResolver<'a, S> {
    pub fn new(service: &'a S) -> Self {
        Self { service }
    }

    /// Actions offered by every one of the issues, matched by name.
    ///
    /// Back-ends may use different ids for the same logical action across
    /// issues, so ids are not compared. A failed lookup counts as no actions.
    pub async fn available_actions(&self, issues: &[Issue]) -> Vec<WorkflowAction> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut actions: HashMap<String, WorkflowAction> = HashMap::new();

        for issue in issues {
            let offered = self.actions_for(issue).await;
            let mut seen = HashSet::new();
            for action in offered {
                if !seen.insert(action.name.clone()) {
                    continue;
                }
                *counts.entry(action.name.clone()).or_default() += 1;
                actions.insert(action.name.clone(), action);
            }
        }

        let mut shared: Vec<WorkflowAction> = actions
            .into_iter()
            .filter(|(name, _)| counts.get(name) == Some(&issues.len()))
            .map(|(_, action)| action)
            .collect();
        shared.sort_by_cached_key(|action| action.name.to_lowercase());

        debug!(
            issues = issues.len(),
            actions = shared.len(),
            "computed shared actions"
        );
        shared
    }

    /// The issue's own action with this display name.
    pub async fn find_action(&self, issue: &Issue, name: &str) -> Result<WorkflowAction> {
        self.actions_for(issue)
            .await
            .into_iter()
            .find(|action| action.name == name)
            .ok_or_else(|| TrackerError::ActionNotFound(name.to_string()))
    }

    /// Values for every field the action requires on this issue.
    pub async fn resolve_fields(
        &self,
        issue: &Issue,
        action: &WorkflowAction,
        assignee: Option<&User>,
        config_lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Vec<FieldValue>> {
        let required = self
            .service
            .fields_for_action(&issue.key, &action.id)
            .await?;
        let mut resolutions: Option<Vec<Resolution>> = None;
        let mut values = Vec::with_capacity(required.len());

        for field in &required {
            let field_values = match strategy_for(field) {
                FieldStrategy::Omit => continue,
                FieldStrategy::FixResolution => {
                    if resolutions.is_none() {
                        resolutions = Some(self.service.list_resolutions().await?);
                    }
                    let all = resolutions.as_deref().unwrap_or_default();
                    vec![find_fix_resolution(all)?.id.clone()]
                }
                FieldStrategy::Assignee => {
                    let user = assignee
                        .ok_or_else(|| TrackerError::UnresolvedAssignee(issue.key.clone()))?;
                    vec![user.id.clone()]
                }
                FieldStrategy::StoredOrConfigured => match issue.field_value(&field.id) {
                    Some(stored) => stored.to_vec(),
                    None => config_lookup(&format!("{}:{}", action.name, field.name))
                        .map(|value| vec![value])
                        .unwrap_or_default(),
                },
            };

            values.push(FieldValue {
                id: field.id.clone(),
                values: field_values,
            });
        }

        Ok(values)
    }

    async fn actions_for(&self, issue: &Issue) -> Vec<WorkflowAction> {
        match self.service.available_actions(&issue.key).await {
            Ok(actions) => actions,
            Err(e) => {
                warn!(issue = %issue.key, error = %e, "could not list actions");
                Vec::new()
            }
        }
    }
}
