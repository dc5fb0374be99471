use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to read config file at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write config file at {path}: {source}")]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("No server URL found. Set JIRA_URL env var or add server_url to the config file")]
    MissingServerUrl,

    #[error(
        "No credentials found. Set JIRA_USER and JIRA_API_TOKEN env vars or add username and api_token to the config file"
    )]
    MissingCredentials,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Authentication failed for {user}: {reason}")]
    AuthenticationFailed { user: String, reason: String },

    #[error("Could not load {catalog}: {reason}")]
    CatalogUnavailable { catalog: &'static str, reason: String },

    #[error("Issue not found: {0}")]
    IssueNotFound(String),

    #[error("Filter not found: {0}")]
    FilterNotFound(String),

    #[error("Action {0} not found.")]
    ActionNotFound(String),

    #[error("Unable to locate a resolution containing the text 'fix'.")]
    NoFixResolution,

    #[error("Invalid assignee for {0}.")]
    UnresolvedAssignee(String),

    #[error("A new remaining estimate is required when setting the remaining estimate")]
    MissingEstimate,

    #[error("Invalid time spent '{0}', expected values like 1h 30m")]
    InvalidTimeSpent(String),

    #[error("{failed} of {total} issues failed to commit")]
    CommitFailed { failed: usize, total: usize },
}

/// Broad classes of failure, used to decide how an error is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A remote call failed or returned something unusable.
    Transport,
    /// A required field value could not be produced.
    Resolution,
    /// A named remote object does not exist.
    NotFound,
    /// Local setup or catalog population failed.
    Configuration,
    /// No session could be established.
    Authentication,
}

impl TrackerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Http(_)
            | Self::ApiError { .. }
            | Self::CommitFailed { .. } => ErrorKind::Transport,
            Self::NoFixResolution
            | Self::UnresolvedAssignee(_)
            | Self::MissingEstimate
            | Self::InvalidTimeSpent(_) => ErrorKind::Resolution,
            Self::IssueNotFound(_) | Self::FilterNotFound(_) | Self::ActionNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::AuthenticationFailed { .. } => ErrorKind::Authentication,
            Self::Io(_)
            | Self::ConfigRead { .. }
            | Self::ConfigParse { .. }
            | Self::ConfigWrite { .. }
            | Self::ConfigSerialize(_)
            | Self::NoConfigDir
            | Self::MissingServerUrl
            | Self::MissingCredentials
            | Self::InvalidUrl(_)
            | Self::CatalogUnavailable { .. } => ErrorKind::Configuration,
        }
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
