use std::collections::BTreeMap;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use crate::pipeline::{STATE_ASSIGNEE_KEY, STATE_FILTER_KEY, STATE_STATUS_KEY};
use crate::types::RemainingArg;

#[derive(Parser)]
#[command(name = "jira-commit")]
#[command(about = "Log work, comment on and transition Jira issues in one go", version)]
#[command(after_help = "EXAMPLES:
    jira-commit issues --filter \"My open issues\"
    jira-commit actions ABC-12 ABC-14
    jira-commit commit ABC-12 -m \"Fix login\" --action \"Resolve Issue\" --time-spent 1h
    jira-commit browse ABC-12")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Only print results and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Debug logging and full error chains
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List saved and favourite filters
    #[command(after_help = "EXAMPLES:
    jira-commit filters
    jira-commit filters --format json")]
    Filters,
    /// List the issues of a filter, narrowed locally
    #[command(after_help = "EXAMPLES:
    jira-commit issues
    jira-commit issues --text \"login timeout\"
    jira-commit issues --filter \"Sprint 12\" --assignee \"Alice Smith\" --status Open")]
    Issues(ViewArgs),
    /// Workflow actions every given issue can take
    #[command(after_help = "EXAMPLES:
    jira-commit actions ABC-12
    jira-commit actions ABC-12 ABC-14 --filter \"Sprint 12\"")]
    Actions {
        /// Issue keys (e.g., ABC-12)
        #[arg(required = true)]
        keys: Vec<String>,

        #[command(flatten)]
        view: ViewArgs,
    },
    /// Log work, comment on and optionally transition issues
    #[command(after_help = "EXAMPLES:
    jira-commit commit ABC-12 -m \"Cache user lookups\"
    jira-commit commit ABC-12 ABC-14 -m \"Fixed\" --action \"Resolve Issue\" --assign reporter
    jira-commit commit ABC-12 -m \"WIP\" --time-spent 2h --remaining set --new-estimate 1d
    jira-commit commit ABC-12 -m \"Fix\" --revision 1234 --file src/login.rs")]
    Commit(CommitArgs),
    /// Print the web address of an issue
    #[command(after_help = "EXAMPLES:
    jira-commit browse ABC-12")]
    Browse {
        /// Issue key (e.g., ABC-12)
        key: String,
    },
    /// Generate shell completions
    #[command(after_help = "EXAMPLES:
    jira-commit completions bash > ~/.bash_completion.d/jira-commit
    jira-commit completions zsh > ~/.zfunc/_jira-commit")]
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
    /// Initialize configuration file interactively
    #[command(after_help = "EXAMPLES:
    jira-commit init")]
    Init,
}

/// Which issues are shown: a remote filter plus local refinements.
#[derive(Args, Debug, Default, Clone)]
pub struct ViewArgs {
    /// Saved filter name (defaults to the text search over all issues)
    #[arg(long)]
    pub filter: Option<String>,

    /// Only issues assigned to this user (display name)
    #[arg(long)]
    pub assignee: Option<String>,

    /// Only issues in this status
    #[arg(long)]
    pub status: Option<String>,

    /// Words that must all appear in the issue
    #[arg(long)]
    pub text: Option<String>,
}

impl ViewArgs {
    /// The requested selections in the pipeline's state format.
    pub fn state(&self) -> BTreeMap<String, String> {
        [
            (STATE_FILTER_KEY, &self.filter),
            (STATE_ASSIGNEE_KEY, &self.assignee),
            (STATE_STATUS_KEY, &self.status),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| (key.to_string(), v.clone())))
        .collect()
    }
}

#[derive(Args, Debug)]
pub struct CommitArgs {
    /// Issue keys (e.g., ABC-12)
    #[arg(required = true)]
    pub keys: Vec<String>,

    /// Commit message, posted as the comment
    #[arg(short, long)]
    pub message: String,

    /// Workflow action to run (e.g., "Resolve Issue")
    #[arg(short, long)]
    pub action: Option<String>,

    /// Assignee for actions that need one: me, reporter or a login name
    #[arg(long)]
    pub assign: Option<String>,

    /// Time to log (e.g., 1h 30m)
    #[arg(short, long)]
    pub time_spent: Option<String>,

    /// How to update the remaining estimate after logging work
    #[arg(long, value_enum, default_value_t = RemainingArg::Auto)]
    pub remaining: RemainingArg,

    /// New remaining estimate, with --remaining set
    #[arg(long)]
    pub new_estimate: Option<String>,

    /// Revision number of the change
    #[arg(long)]
    pub revision: Option<u64>,

    /// Changed file, listed in the comment (repeatable)
    #[arg(long = "file")]
    pub files: Vec<String>,

    #[command(flatten)]
    pub view: ViewArgs,
}
