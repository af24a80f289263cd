//! Profile-enrichment plugin for chat-bot LLM prompts.
//!
//! Caches per-user and per-group profile metadata (nickname, gender,
//! birthday, group role/title) fetched from the messaging platform, persists
//! it to local JSON files, and injects a localized summary into outgoing
//! provider requests via the host framework's `on_llm_request` hook.

pub mod config;
pub mod event;
pub mod plugin;
pub mod profile;
pub mod rewrite;
pub mod store;

pub use config::PluginConfig;
pub use event::{GroupMemberInfo, MessageEvent, PlatformClient, ProviderRequest, StrangerInfo};
pub use plugin::ProfilePlugin;
pub use store::{GroupMemberRecord, ProfileStore, UserRecord};
