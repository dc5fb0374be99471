use tabled::Tabled;

use crate::cli::ViewArgs;
use crate::commands::open_view;
use crate::error::Result;
use crate::output::{format_date, print_message, print_table, status_colored, truncate};
use crate::service::IssueService;
use crate::types::Issue;

#[derive(Tabled)]
struct IssueRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Assignee")]
    assignee: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

impl From<&Issue> for IssueRow {
    fn from(issue: &Issue) -> Self {
        Self {
            key: issue.key.clone(),
            title: truncate(&issue.title, 50),
            status: status_colored(issue.state_name()),
            assignee: issue.assignee_name().to_string(),
            updated: format_date(&issue.updated_at),
        }
    }
}

pub async fn list<S: IssueService>(service: &S, page_size: u32, view: &ViewArgs) -> Result<()> {
    let pipeline = open_view(service, page_size, view).await?;
    print_table(pipeline.visible(), |issue| IssueRow::from(issue));

    let state: Vec<String> = pipeline
        .export_state()
        .iter()
        .map(|(key, value)| format!("{key}: {value}"))
        .collect();
    print_message(&format!(
        "{} of {} issues shown ({})",
        pipeline.visible().len(),
        pipeline.found().len(),
        state.join(", ")
    ));
    Ok(())
}
