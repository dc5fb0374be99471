use tabled::Tabled;

use crate::error::Result;
use crate::output::print_table;
use crate::pipeline::filter_catalog;
use crate::service::IssueService;
use crate::types::RemoteFilter;

#[derive(Tabled)]
struct FilterRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "ID")]
    id: String,
}

impl From<&RemoteFilter> for FilterRow {
    fn from(filter: &RemoteFilter) -> Self {
        Self {
            name: filter.name.clone(),
            id: if filter.text_search {
                String::new()
            } else {
                filter.id.clone()
            },
        }
    }
}

pub async fn list<S: IssueService>(service: &S) -> Result<()> {
    let filters = filter_catalog(service.list_filters().await?);
    print_table(&filters, |filter| FilterRow::from(filter));
    Ok(())
}
