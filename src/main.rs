use std::env;
use std::io;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use jira_commit::cache::UserCache;
use jira_commit::cli::{Cli, Commands, OutputFormat};
use jira_commit::client::JiraClient;
use jira_commit::config::Config;
use jira_commit::error::{ErrorKind, TrackerError};
use jira_commit::{commands, output};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    let verbose = cli.verbose;
    init_tracing(verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");

        if verbose {
            for cause in e.chain().skip(1) {
                eprintln!("Caused by: {cause}");
            }
        }

        let setup_problem = e.downcast_ref::<TrackerError>().is_some_and(|err| {
            matches!(
                err.kind(),
                ErrorKind::Configuration | ErrorKind::Authentication
            )
        });
        if setup_problem {
            eprintln!("Hint: run 'jira-commit init' or set JIRA_URL, JIRA_USER and JIRA_API_TOKEN");
        }

        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("JIRA_COMMIT_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "jira_commit=debug,info"
        } else {
            "jira_commit=info,warn"
        })
    });

    let format = env::var("JIRA_COMMIT_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(io::stderr))
                .init();
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    output::set_json_output(cli.format == OutputFormat::Json);
    output::set_quiet(cli.quiet);

    match cli.command {
        // Commands that don't need a session
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "jira-commit", &mut io::stdout());
        }
        Commands::Init => {
            commands::init::run().context("could not write the configuration")?;
        }
        Commands::Browse { key } => {
            let config = Config::load()?;
            commands::browse::run(&config, &key)?;
        }
        command => {
            let config = Config::load()?;
            let server_url = config.server_url()?;
            let client = JiraClient::connect(
                &server_url,
                config.credentials()?,
                config.resolve_user_names,
                UserCache::load(),
            )
            .await
            .with_context(|| format!("could not connect to {server_url}"))?;

            match command {
                Commands::Filters => {
                    commands::filters::list(&client).await?;
                }
                Commands::Issues(view) => {
                    commands::issues::list(&client, config.page_size(), &view).await?;
                }
                Commands::Actions { keys, view } => {
                    commands::actions::list(&client, config.page_size(), &keys, &view).await?;
                }
                Commands::Commit(args) => {
                    commands::commit::run(&client, &config, args).await?;
                }
                Commands::Completions { .. } | Commands::Init | Commands::Browse { .. } => {
                    // Already handled above
                }
            }
        }
    }

    Ok(())
}
