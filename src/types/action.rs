use serde::{Deserialize, Serialize};

use super::Identifiable;

/// A workflow transition an issue may undergo.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct WorkflowAction {
    pub id: String,
    pub name: String,
}

impl WorkflowAction {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl Identifiable for WorkflowAction {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A field that must be supplied to execute a workflow action.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FieldRequirement {
    pub id: String,
    pub name: String,
}

impl FieldRequirement {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A value sent for a field when executing an action.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FieldValue {
    pub id: String,
    pub values: Vec<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub id: String,
    pub name: String,
}

impl Resolution {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}
