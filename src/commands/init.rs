use std::io::{self, BufRead, Write};
use std::path::Path;

use serde::Serialize;

use crate::config::{normalize_server_url, Config};
use crate::error::{Result, TrackerError};

#[derive(Serialize)]
struct ConfigFile {
    server_url: String,
    username: String,
    api_token: String,
    resolve_user_names: bool,
}

fn prompt(input: &mut impl BufRead, label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn write_config(path: &Path, file: &ConfigFile) -> Result<()> {
    let write_error = |source: io::Error| TrackerError::ConfigWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    std::fs::write(path, toml::to_string(file)?).map_err(write_error)
}

pub fn run() -> Result<()> {
    let config_path = Config::config_path()?;
    let mut input = io::stdin().lock();

    if config_path.exists() {
        let answer = prompt(
            &mut input,
            &format!(
                "Config file already exists at {}. Overwrite? [y/N] ",
                config_path.display()
            ),
        )?;
        if !answer.eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    println!("jira-commit configuration");
    println!("=========================\n");

    let server_url = prompt(&mut input, "Jira server URL (e.g., https://jira.example.com): ")?;
    if server_url.is_empty() {
        return Err(TrackerError::MissingServerUrl);
    }
    let username = prompt(&mut input, "Username: ")?;
    let api_token = prompt(&mut input, "API token or password: ")?;
    if username.is_empty() || api_token.is_empty() {
        return Err(TrackerError::MissingCredentials);
    }
    let names = prompt(&mut input, "Show display names instead of logins? [Y/n] ")?;

    let file = ConfigFile {
        server_url: normalize_server_url(&server_url),
        username,
        api_token,
        resolve_user_names: !names.eq_ignore_ascii_case("n"),
    };
    write_config(&config_path, &file)?;

    println!("\nConfig saved to {}", config_path.display());
    println!("You can now use 'jira-commit' commands!");
    Ok(())
}
