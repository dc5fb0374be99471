use serde::Serialize;

use super::Identifiable;

/// A server-side saved query.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RemoteFilter {
    pub id: String,
    pub name: String,
    /// Sends the free-text filter along with the query.
    #[serde(skip)]
    pub text_search: bool,
}

impl RemoteFilter {
    pub const ALL_ISSUES_ID: &'static str = "__all_issues__";

    pub fn saved(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            text_search: false,
        }
    }

    /// The built-in filter that runs a plain text search over all issues.
    pub fn all_issues() -> Self {
        Self {
            id: Self::ALL_ISSUES_ID.to_string(),
            name: "All Issues (text search)".to_string(),
            text_search: true,
        }
    }
}

impl Identifiable for RemoteFilter {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}
