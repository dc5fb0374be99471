use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Facet, Faceted, Identifiable, User};

/// Snapshot of a remote issue.
#[derive(Serialize, Debug, Clone)]
pub struct Issue {
    pub id: String,
    /// Human-facing key, e.g. `ABC-12`.
    pub key: String,
    pub title: String,
    pub description: String,
    pub state: Option<IssueState>,
    pub assignee: Option<User>,
    pub reporter: Option<User>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Raw stored values by field id.
    #[serde(skip)]
    pub fields: HashMap<String, Vec<String>>,
}

impl Issue {
    pub fn state_name(&self) -> &str {
        Facet::label_of(self.state.as_ref())
    }

    pub fn assignee_name(&self) -> &str {
        Facet::label_of(self.assignee.as_ref())
    }

    pub fn reporter_name(&self) -> &str {
        Facet::label_of(self.reporter.as_ref())
    }

    /// Stored value for a field, `None` when absent or blank.
    pub fn field_value(&self, field_id: &str) -> Option<&[String]> {
        self.fields
            .get(field_id)
            .filter(|values| values.iter().any(|v| !v.is_empty()))
            .map(Vec::as_slice)
    }
}

impl Identifiable for Issue {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.title
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct IssueState {
    pub id: String,
    pub name: String,
}

impl IssueState {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl Identifiable for IssueState {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Faceted for IssueState {
    const ANY_LABEL: &'static str = "(All Statuses)";
    const UNKNOWN_LABEL: &'static str = "Unknown";
}
