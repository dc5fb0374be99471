use std::collections::HashSet;

use colored::Colorize;
use serde::Serialize;

use crate::actions::AssigneeChoice;
use crate::cli::CommitArgs;
use crate::commands::{open_view, select_keys};
use crate::commit::{CommitOrchestrator, CommitRequest, IssueFailure};
use crate::config::Config;
use crate::error::{Result, TrackerError};
use crate::output::{is_json_output, print_failure, print_item, print_message};
use crate::pipeline::FilterPipeline;
use crate::service::IssueService;
use crate::types::{
    validate_duration, Identifiable, Issue, RecalculationMode, User, WorklogRequest,
};

#[derive(Serialize)]
struct CommitReport {
    committed: Vec<String>,
    failures: Vec<FailureReport>,
}

#[derive(Serialize)]
struct FailureReport {
    key: String,
    stage: String,
    error: String,
}

impl From<&IssueFailure> for FailureReport {
    fn from(failure: &IssueFailure) -> Self {
        Self {
            key: failure.key.clone(),
            stage: failure.stage.to_string(),
            error: failure.error.to_string(),
        }
    }
}

fn worklog(args: &CommitArgs) -> Result<Option<WorklogRequest>> {
    let Some(time_spent) = args.time_spent.as_deref().map(str::trim) else {
        return Ok(None);
    };
    if time_spent.is_empty() {
        return Ok(None);
    }
    validate_duration(time_spent)?;
    let mode = RecalculationMode::from_arg(args.remaining, args.new_estimate.as_deref())?;
    Ok(Some(WorklogRequest::new(time_spent, mode)))
}

/// `me`, `reporter`, a known user by login or display name, or any other login.
async fn assignee_choice<S: IssueService>(
    service: &S,
    pipeline: &FilterPipeline<'_, S>,
    assign: Option<&str>,
) -> Result<AssigneeChoice> {
    let Some(assign) = assign.map(str::trim).filter(|a| !a.is_empty()) else {
        return Ok(AssigneeChoice::Keep);
    };
    if assign.eq_ignore_ascii_case("me") {
        return Ok(AssigneeChoice::User(service.current_user().await?));
    }
    if assign.eq_ignore_ascii_case("reporter") {
        return Ok(AssigneeChoice::Reporter);
    }

    let known = pipeline.assignees().items().iter().find(|choice| {
        matches!(choice, AssigneeChoice::User(_))
            && (choice.id() == assign || choice.name().eq_ignore_ascii_case(assign))
    });
    Ok(known
        .cloned()
        .unwrap_or_else(|| AssigneeChoice::User(User::new(assign, assign))))
}

fn report(issues: &[Issue], failures: &[IssueFailure]) {
    let failed: HashSet<&str> = failures.iter().map(|f| f.key.as_str()).collect();
    let committed: Vec<&Issue> = issues
        .iter()
        .filter(|issue| !failed.contains(issue.key.as_str()))
        .collect();

    if is_json_output() {
        let report = CommitReport {
            committed: committed.iter().map(|issue| issue.key.clone()).collect(),
            failures: failures.iter().map(FailureReport::from).collect(),
        };
        print_item(&report, |_| {});
        return;
    }

    for issue in committed {
        print_message(&format!("{} {} - {}", "✓".green(), issue.key, issue.title));
    }
    for failure in failures {
        print_failure(&failure.to_string());
    }
}

pub async fn run<S: IssueService>(service: &S, config: &Config, args: CommitArgs) -> Result<()> {
    let worklog = worklog(&args)?;
    let mut pipeline = open_view(service, config.page_size(), &args.view).await?;
    let issues = select_keys(&mut pipeline, &args.keys)?;
    if issues.is_empty() {
        print_message("No visible issues selected, nothing to commit.");
        return Ok(());
    }

    let request = CommitRequest {
        assignee: assignee_choice(service, &pipeline, args.assign.as_deref()).await?,
        comment: args.message,
        worklog,
        action: args.action,
        revision: args.revision,
        files: args.files,
    };

    let orchestrator = CommitOrchestrator::new(service, |key: &str| config.lookup(key));
    let failures = orchestrator.commit(&issues, &request).await;
    report(&issues, &failures);

    let failed: HashSet<&str> = failures.iter().map(|f| f.key.as_str()).collect();
    if failed.is_empty() {
        Ok(())
    } else {
        Err(TrackerError::CommitFailed {
            failed: failed.len(),
            total: issues.len(),
        })
    }
}
