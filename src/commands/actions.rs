use tabled::Tabled;

use crate::actions::ActionResolver;
use crate::cli::ViewArgs;
use crate::commands::{open_view, select_keys};
use crate::error::Result;
use crate::output::print_table;
use crate::service::IssueService;
use crate::types::WorkflowAction;

#[derive(Tabled)]
struct ActionRow {
    #[tabled(rename = "Action")]
    name: String,
    #[tabled(rename = "ID")]
    id: String,
}

impl From<&WorkflowAction> for ActionRow {
    fn from(action: &WorkflowAction) -> Self {
        Self {
            name: action.name.clone(),
            id: action.id.clone(),
        }
    }
}

/// Actions offered by every one of the given issues.
pub async fn list<S: IssueService>(
    service: &S,
    page_size: u32,
    keys: &[String],
    view: &ViewArgs,
) -> Result<()> {
    let mut pipeline = open_view(service, page_size, view).await?;
    let issues = select_keys(&mut pipeline, keys)?;

    let actions = ActionResolver::new(service).available_actions(&issues).await;
    print_table(&actions, |action| ActionRow::from(action));
    Ok(())
}
