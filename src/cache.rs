use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::types::User;

const CACHE_TTL_SECS: u64 = 30 * 24 * 3600; // 30 days

/// Users seen in search results, offered as assignee choices.
///
/// The tracker has no user listing call, so the list grows as issues are
/// fetched and is persisted beside the config file.
#[derive(Serialize, Deserialize, Default, Debug)]
pub struct UserCache {
    users: BTreeMap<String, String>,
    #[serde(default)]
    timestamp: u64,
    #[serde(skip)]
    path: Option<PathBuf>,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

impl UserCache {
    pub fn load() -> Self {
        match Config::config_path() {
            Ok(path) => Self::load_from(&path.with_file_name("cache.json")),
            Err(_) => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        let empty = Self {
            path: Some(path.to_path_buf()),
            ..Self::default()
        };

        let Ok(contents) = std::fs::read_to_string(path) else {
            return empty;
        };
        let Ok(mut cache) = serde_json::from_str::<Self>(&contents) else {
            tracing::debug!(path = %path.display(), "ignoring unreadable user cache");
            return empty;
        };

        if now_secs().saturating_sub(cache.timestamp) > CACHE_TTL_SECS {
            return empty;
        }

        cache.path = Some(path.to_path_buf());
        cache
    }

    pub fn save(&self) {
        let Some(path) = &self.path else {
            return;
        };

        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let contents = match serde_json::to_string_pretty(self) {
            Ok(c) => c,
            Err(_) => return,
        };

        if let Err(e) = std::fs::write(path, contents) {
            tracing::warn!(path = %path.display(), error = %e, "could not save user cache");
        }
    }

    /// Record users; returns true when anything new was learned.
    pub fn remember<'a>(&mut self, users: impl IntoIterator<Item = &'a User>) -> bool {
        let mut changed = false;
        for user in users {
            if self.users.get(&user.id) != Some(&user.name) {
                self.users.insert(user.id.clone(), user.name.clone());
                changed = true;
            }
        }
        if changed {
            self.timestamp = now_secs();
        }
        changed
    }

    pub fn users(&self) -> Vec<User> {
        self.users
            .iter()
            .map(|(id, name)| User::new(id, name))
            .collect()
    }
}
