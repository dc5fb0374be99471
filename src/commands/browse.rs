use serde::Serialize;

use crate::client::browse_url;
use crate::config::Config;
use crate::error::Result;
use crate::output::print_item;

#[derive(Serialize)]
struct BrowseLink {
    key: String,
    url: String,
}

pub fn run(config: &Config, key: &str) -> Result<()> {
    let url = browse_url(&config.server_url()?, key)?;
    let link = BrowseLink {
        key: key.to_string(),
        url: url.to_string(),
    };
    print_item(&link, |link| println!("{}", link.url));
    Ok(())
}
