use serde::{Deserialize, Serialize};

use super::{Faceted, Identifiable};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub name: String,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl Identifiable for User {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Faceted for User {
    const ANY_LABEL: &'static str = "(All Users)";
    const UNKNOWN_LABEL: &'static str = "Unassigned";
}
