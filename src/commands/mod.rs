pub mod actions;
pub mod browse;
pub mod commit;
pub mod filters;
pub mod init;
pub mod issues;

use crate::cli::ViewArgs;
use crate::error::{Result, TrackerError};
use crate::pipeline::FilterPipeline;
use crate::service::IssueService;
use crate::types::{Identifiable, Issue};

/// Load the pipeline with the requested filter selections applied.
pub async fn open_view<'a, S: IssueService>(
    service: &'a S,
    page_size: u32,
    view: &ViewArgs,
) -> Result<FilterPipeline<'a, S>> {
    let mut pipeline = FilterPipeline::with_page_size(service, page_size);
    pipeline.import_state(&view.state());
    if let Some(text) = &view.text {
        pipeline.set_text_filter(text).await?;
    }
    pipeline.load().await?;

    if let Some(name) = &view.filter {
        require_selected(pipeline.filters().selected(), name, "filter")?;
    }
    if let Some(name) = &view.assignee {
        require_selected(pipeline.assignee_filters().selected(), name, "assignee")?;
    }
    if let Some(name) = &view.status {
        require_selected(pipeline.status_filters().selected(), name, "status")?;
    }
    Ok(pipeline)
}

fn require_selected<T: Identifiable>(selected: Option<&T>, name: &str, what: &str) -> Result<()> {
    match selected {
        Some(item) if item.name().eq_ignore_ascii_case(name) => Ok(()),
        _ => Err(TrackerError::FilterNotFound(format!("{what} '{name}'"))),
    }
}

/// Mark the given keys and return the selected issues still visible.
///
/// Keys missing from the fetched issues are an error; keys hidden by the
/// local filters are reported and left out.
pub fn select_keys<S: IssueService>(
    pipeline: &mut FilterPipeline<'_, S>,
    keys: &[String],
) -> Result<Vec<Issue>> {
    pipeline.clear_selection();
    for key in keys {
        let id = pipeline
            .found()
            .iter()
            .find(|issue| issue.key.eq_ignore_ascii_case(key))
            .map(|issue| issue.id.clone())
            .ok_or_else(|| TrackerError::IssueNotFound(key.clone()))?;
        pipeline.select_issue(&id, true);
    }

    let selected = pipeline.selected_issues();
    for key in keys {
        if !selected.iter().any(|issue| issue.key.eq_ignore_ascii_case(key)) {
            tracing::warn!(issue = %key, "hidden by the current filters, skipping");
        }
    }
    Ok(selected)
}
