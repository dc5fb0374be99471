//! Applies a worklog, a transition or a comment to each selected issue.

use std::fmt;

use tracing::{debug, info, warn};

use crate::actions::{ActionResolver, AssigneeChoice};
use crate::error::{Result, TrackerError};
use crate::service::IssueService;
use crate::types::{Issue, WorklogRequest};

const DEFAULT_ACTION_LABEL: &str = "Working";

/// Everything the operator asked to apply to the selection.
#[derive(Debug, Clone, Default)]
pub struct CommitRequest {
    pub comment: String,
    pub worklog: Option<WorklogRequest>,
    /// Display name of the workflow action to run.
    pub action: Option<String>,
    pub assignee: AssigneeChoice,
    pub revision: Option<u64>,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStage {
    Worklog,
    Action,
    Comment,
}

impl fmt::Display for CommitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Worklog => write!(f, "worklog"),
            Self::Action => write!(f, "action"),
            Self::Comment => write!(f, "comment"),
        }
    }
}

/// A step that failed for one issue.
#[derive(Debug)]
pub struct IssueFailure {
    pub key: String,
    pub title: String,
    pub stage: CommitStage,
    pub error: TrackerError,
}

impl fmt::Display for IssueFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed to commit issue {} - {} ({}): {}",
            self.key, self.title, self.stage, self.error
        )
    }
}

pub struct CommitOrchestrator<'a, S, L> {
    service: &'a S,
    config_lookup: L,
}

impl<'a, S, L> CommitOrchestrator<'a, S, L>
where
    S: IssueService,
    L: Fn(&str) -> Option<String>,
{
    pub fn new(service: &'a S, config_lookup: L) -> Self {
        Self {
            service,
            config_lookup,
        }
    }

    /// Commit to every issue, collecting failures instead of stopping.
    ///
    /// Each issue gets its worklog first; a worklog failure does not prevent
    /// the action or comment step for that issue.
    pub async fn commit(&self, issues: &[Issue], request: &CommitRequest) -> Vec<IssueFailure> {
        let action = request.action.as_deref();
        let summary = compose_summary(action, issues);
        let message = strip_appended_summary(&request.comment, &summary);
        let text = compose_comment(message, action, issues, request.revision, &request.files);

        let mut failures = Vec::new();
        for issue in issues {
            if self.commit_issue(issue, request, &text, &mut failures).await {
                info!(issue = %issue.key, "committed");
            } else {
                debug!(issue = %issue.key, "nothing to post");
            }
        }
        failures
    }

    /// Run the steps for one issue; returns whether anything reached the server.
    async fn commit_issue(
        &self,
        issue: &Issue,
        request: &CommitRequest,
        text: &str,
        failures: &mut Vec<IssueFailure>,
    ) -> bool {
        let mut record = |stage: CommitStage, error: TrackerError| {
            warn!(issue = %issue.key, %stage, error = %error, "commit step failed");
            failures.push(IssueFailure {
                key: issue.key.clone(),
                title: issue.title.clone(),
                stage,
                error,
            });
        };

        let mut posted = false;
        if let Some(worklog) = request.worklog.as_ref().filter(|w| !w.is_empty()) {
            match self.service.submit_worklog(&issue.key, worklog).await {
                Ok(()) => posted = true,
                Err(e) => record(CommitStage::Worklog, e),
            }
        }

        let outcome = match request.action.as_deref() {
            Some(name) => self
                .transition(issue, name, &request.assignee, text)
                .await
                .map(|()| true)
                .map_err(|e| (CommitStage::Action, e)),
            None if text.trim().is_empty() => Ok(false),
            None => self
                .service
                .add_comment(&issue.key, text)
                .await
                .map(|()| true)
                .map_err(|e| (CommitStage::Comment, e)),
        };

        match outcome {
            Ok(sent) => posted || sent,
            Err((stage, e)) => {
                record(stage, e);
                posted
            }
        }
    }

    async fn transition(
        &self,
        issue: &Issue,
        action_name: &str,
        assignee: &AssigneeChoice,
        comment: &str,
    ) -> Result<()> {
        let resolver = ActionResolver::new(self.service);
        let action = resolver.find_action(issue, action_name).await?;
        let resolved = assignee.resolve(issue);
        if resolved.is_none() && *assignee != AssigneeChoice::Keep {
            return Err(TrackerError::UnresolvedAssignee(issue.key.clone()));
        }
        let fields = resolver
            .resolve_fields(issue, &action, resolved.as_ref(), &self.config_lookup)
            .await?;

        self.service
            .execute_action(&issue.key, &action.id, &fields, comment)
            .await
    }
}

/// One `"<action> <key> : <title>"` line per issue.
pub fn compose_summary(action: Option<&str>, issues: &[Issue]) -> String {
    let label = action.unwrap_or(DEFAULT_ACTION_LABEL);
    issues
        .iter()
        .map(|issue| format!("{label} {} : {}", issue.key, issue.title))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The text posted to each issue: the message, the per-issue summary, then
/// the revision after a blank line and the changed files one per line.
pub fn compose_comment(
    message: &str,
    action: Option<&str>,
    issues: &[Issue],
    revision: Option<u64>,
    files: &[String],
) -> String {
    let mut sections = Vec::new();

    let message = message.trim_end();
    if !message.is_empty() {
        sections.push(message.to_string());
    }

    let summary = compose_summary(action, issues);
    if !summary.is_empty() {
        sections.push(summary);
    }

    if let Some(revision) = revision.filter(|&r| r > 0) {
        sections.push(format!("revision: {revision}"));
    }

    let mut text = sections.join("\n\n");
    for file in files {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(file);
    }
    text
}

/// Drop a summary previously appended to an edited message.
pub fn strip_appended_summary<'m>(message: &'m str, summary: &str) -> &'m str {
    let trimmed = message.trim_end();
    if summary.is_empty() {
        return trimmed;
    }
    match trimmed.strip_suffix(summary) {
        Some(rest) => rest.trim_end(),
        None => trimmed,
    }
}
