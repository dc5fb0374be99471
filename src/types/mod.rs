mod action;
mod facet;
mod filter;
mod issue;
mod user;
mod worklog;

pub use action::{FieldRequirement, FieldValue, Resolution, WorkflowAction};
pub use facet::{Facet, Faceted, Identifiable};
pub use filter::RemoteFilter;
pub use issue::{Issue, IssueState};
pub use user::User;
pub use worklog::{validate_duration, RecalculationMode, RemainingArg, WorklogRequest};
