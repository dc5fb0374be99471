//! Engine for committing work to Jira issues: filter the issue list, pick the
//! workflow action every selected issue supports, then log work, transition or
//! comment issue by issue.

pub mod actions;
pub mod cache;
pub mod cli;
pub mod client;
pub mod commands;
pub mod commit;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod responses;
pub mod selection;
pub mod service;
pub mod types;
