//! The issue-tracking capability the engine runs against.

use crate::error::Result;
use crate::types::{
    FieldRequirement, FieldValue, Issue, RemoteFilter, Resolution, User, WorkflowAction,
    WorklogRequest,
};

/// Remote issue tracker operations.
///
/// Every call may fail with a transport or domain error; callers decide
/// which failures are fatal.
#[allow(async_fn_in_trait)]
pub trait IssueService {
    /// Saved filters visible to the current user.
    async fn list_filters(&self) -> Result<Vec<RemoteFilter>>;

    /// Issues matched by a saved filter, optionally narrowed by free text.
    async fn search(
        &self,
        filter_id: &str,
        text: Option<&str>,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Issue>>;

    /// Plain text search over all issues.
    async fn text_search(&self, query: &str, offset: u32, limit: u32) -> Result<Vec<Issue>>;

    async fn current_user(&self) -> Result<User>;

    async fn list_users(&self) -> Result<Vec<User>>;

    /// Workflow actions the issue can currently take.
    async fn available_actions(&self, issue_key: &str) -> Result<Vec<WorkflowAction>>;

    async fn fields_for_action(
        &self,
        issue_key: &str,
        action_id: &str,
    ) -> Result<Vec<FieldRequirement>>;

    async fn submit_worklog(&self, issue_key: &str, worklog: &WorklogRequest) -> Result<()>;

    async fn execute_action(
        &self,
        issue_key: &str,
        action_id: &str,
        fields: &[FieldValue],
        comment: &str,
    ) -> Result<()>;

    async fn add_comment(&self, issue_key: &str, text: &str) -> Result<()>;

    async fn list_resolutions(&self) -> Result<Vec<Resolution>>;
}

#[cfg(test)]
pub mod fake {
    //! In-memory tracker that records every call.

    use std::cell::{Cell, RefCell};
    use std::collections::{HashMap, HashSet};

    use chrono::{TimeZone, Utc};

    use super::IssueService;
    use crate::error::{Result, TrackerError};
    use crate::types::{
        FieldRequirement, FieldValue, Issue, IssueState, RemoteFilter, Resolution, User,
        WorkflowAction, WorklogRequest,
    };

    pub fn user(id: &str, name: &str) -> User {
        User::new(id, name)
    }

    pub fn issue(key: &str, title: &str) -> Issue {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        Issue {
            id: format!("id-{key}"),
            key: key.to_string(),
            title: title.to_string(),
            description: String::new(),
            state: Some(IssueState::new("1", "Open")),
            assignee: Some(user("alice", "Alice Smith")),
            reporter: Some(user("bob", "Bob Jones")),
            created_at: created,
            updated_at: created,
            fields: HashMap::new(),
        }
    }

    fn unavailable(what: &str) -> TrackerError {
        TrackerError::ApiError {
            status: 503,
            message: format!("{what} unavailable"),
        }
    }

    #[derive(Default)]
    pub struct FakeService {
        pub filters: Vec<RemoteFilter>,
        /// Issues returned by `search`, keyed by filter id.
        pub filter_results: HashMap<String, Vec<Issue>>,
        pub text_results: Vec<Issue>,
        pub users: Vec<User>,
        pub actions: HashMap<String, Vec<WorkflowAction>>,
        pub fields: HashMap<String, Vec<FieldRequirement>>,
        pub resolutions: Vec<Resolution>,

        pub fail_filters: bool,
        pub fail_search: Cell<bool>,
        pub fail_actions_for: HashSet<String>,
        pub fail_worklog_for: HashSet<String>,
        pub fail_execute_for: HashSet<String>,

        pub search_calls: RefCell<Vec<(String, Option<String>)>>,
        pub text_search_calls: RefCell<Vec<String>>,
        pub action_calls: Cell<usize>,
        pub worklogs: RefCell<Vec<(String, WorklogRequest)>>,
        pub executed: RefCell<Vec<(String, String, Vec<FieldValue>, String)>>,
        pub comments: RefCell<Vec<(String, String)>>,
    }

    impl FakeService {
        pub fn with_actions(mut self, key: &str, names: &[&str]) -> Self {
            let actions = names
                .iter()
                .enumerate()
                .map(|(i, name)| WorkflowAction::new(format!("{key}-{i}"), *name))
                .collect();
            self.actions.insert(key.to_string(), actions);
            self
        }

        pub fn with_fields(mut self, action_id: &str, fields: &[(&str, &str)]) -> Self {
            let fields = fields
                .iter()
                .map(|(id, name)| FieldRequirement::new(*id, *name))
                .collect();
            self.fields.insert(action_id.to_string(), fields);
            self
        }

        pub fn remote_calls(&self) -> usize {
            self.search_calls.borrow().len() + self.text_search_calls.borrow().len()
        }
    }

    impl IssueService for FakeService {
        async fn list_filters(&self) -> Result<Vec<RemoteFilter>> {
            if self.fail_filters {
                return Err(unavailable("filters"));
            }
            Ok(self.filters.clone())
        }

        async fn search(
            &self,
            filter_id: &str,
            text: Option<&str>,
            _offset: u32,
            limit: u32,
        ) -> Result<Vec<Issue>> {
            self.search_calls
                .borrow_mut()
                .push((filter_id.to_string(), text.map(String::from)));
            if self.fail_search.get() {
                return Err(unavailable("search"));
            }
            let found = self
                .filter_results
                .get(filter_id)
                .ok_or_else(|| TrackerError::FilterNotFound(filter_id.to_string()))?;
            Ok(found.iter().take(limit as usize).cloned().collect())
        }

        async fn text_search(&self, query: &str, _offset: u32, limit: u32) -> Result<Vec<Issue>> {
            self.text_search_calls.borrow_mut().push(query.to_string());
            if self.fail_search.get() {
                return Err(unavailable("search"));
            }
            Ok(self.text_results.iter().take(limit as usize).cloned().collect())
        }

        async fn current_user(&self) -> Result<User> {
            Ok(user("me", "Current User"))
        }

        async fn list_users(&self) -> Result<Vec<User>> {
            Ok(self.users.clone())
        }

        async fn available_actions(&self, issue_key: &str) -> Result<Vec<WorkflowAction>> {
            self.action_calls.set(self.action_calls.get() + 1);
            if self.fail_actions_for.contains(issue_key) {
                return Err(unavailable("actions"));
            }
            Ok(self.actions.get(issue_key).cloned().unwrap_or_default())
        }

        async fn fields_for_action(
            &self,
            _issue_key: &str,
            action_id: &str,
        ) -> Result<Vec<FieldRequirement>> {
            Ok(self.fields.get(action_id).cloned().unwrap_or_default())
        }

        async fn submit_worklog(&self, issue_key: &str, worklog: &WorklogRequest) -> Result<()> {
            if self.fail_worklog_for.contains(issue_key) {
                return Err(unavailable("worklog"));
            }
            self.worklogs
                .borrow_mut()
                .push((issue_key.to_string(), worklog.clone()));
            Ok(())
        }

        async fn execute_action(
            &self,
            issue_key: &str,
            action_id: &str,
            fields: &[FieldValue],
            comment: &str,
        ) -> Result<()> {
            if self.fail_execute_for.contains(issue_key) {
                return Err(unavailable("transition"));
            }
            self.executed.borrow_mut().push((
                issue_key.to_string(),
                action_id.to_string(),
                fields.to_vec(),
                comment.to_string(),
            ));
            Ok(())
        }

        async fn add_comment(&self, issue_key: &str, text: &str) -> Result<()> {
            self.comments
                .borrow_mut()
                .push((issue_key.to_string(), text.to_string()));
            Ok(())
        }

        async fn list_resolutions(&self) -> Result<Vec<Resolution>> {
            Ok(self.resolutions.clone())
        }
    }
}
