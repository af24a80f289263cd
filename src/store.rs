use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::PluginConfig;
use crate::profile::UNKNOWN;

/// One cached user profile, keyed by platform user id in the table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: String,
    #[serde(default)]
    pub nickname: String,
    /// Unix timestamp of the message that created the record.
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default = "unknown_text")]
    pub gender: String,
    /// ISO `YYYY-MM-DD` or the unknown sentinel.
    #[serde(default = "unknown_text")]
    pub birthday: String,
    /// Last-seen group role code, set only after a group message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_title: Option<String>,
}

fn unknown_text() -> String {
    UNKNOWN.to_string()
}

/// Membership snapshot, keyed by group id then user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMemberRecord {
    pub user_id: String,
    pub group_id: String,
    pub group_role: String,
    pub group_title: String,
    pub nickname: String,
    /// RFC 3339 time the snapshot was taken.
    pub timestamp: String,
}

pub type UserTable = HashMap<String, UserRecord>;
pub type GroupTable = HashMap<String, HashMap<String, GroupMemberRecord>>;

/// Both tables are read and written wholesale: small files, sequential hook
/// invocations, no merge logic beyond overwriting whole records.
pub struct ProfileStore {
    user_path: PathBuf,
    group_path: PathBuf,
}

impl ProfileStore {
    pub fn new(config: &PluginConfig) -> Self {
        Self {
            user_path: config.user_info_path(),
            group_path: config.group_info_path(),
        }
    }

    pub fn load_users(&self) -> UserTable {
        load_table(&self.user_path)
    }

    pub fn load_groups(&self) -> GroupTable {
        load_table(&self.group_path)
    }

    pub fn save_users(&self, users: &UserTable) -> Result<()> {
        save_table(&self.user_path, users)
    }

    pub fn save_groups(&self, groups: &GroupTable) -> Result<()> {
        save_table(&self.group_path, groups)
    }
}

/// Missing file means first run; unreadable or corrupt content degrades to an
/// empty table rather than failing the hook.
fn load_table<T: Default + for<'de> Deserialize<'de>>(path: &Path) -> T {
    if !path.exists() {
        return T::default();
    }
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to read {}: {e}", path.display());
            return T::default();
        }
    };
    match serde_json::from_str(&content) {
        Ok(table) => table,
        Err(e) => {
            tracing::error!("Failed to parse {}: {e}", path.display());
            T::default()
        }
    }
}

fn save_table<T: Serialize>(path: &Path, table: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(table)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json)
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}
