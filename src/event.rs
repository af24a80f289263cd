use anyhow::Result;
use serde::Deserialize;

/// Inbound message metadata supplied by the host framework.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub platform: String,
    pub sender_id: String,
    pub sender_name: String,
    /// Set for group messages, `None` for direct chats.
    pub group_id: Option<String>,
    /// Unix timestamp of the message.
    pub timestamp: i64,
}

impl MessageEvent {
    pub fn is_group(&self) -> bool {
        self.group_id.is_some()
    }
}

/// The outgoing LLM request the hook mutates in place.
#[derive(Debug, Default)]
pub struct ProviderRequest {
    pub system_prompt: String,
    /// Serialized chat history, possibly containing nickname placeholders.
    pub context: String,
}

/// Public profile as returned by the platform's stranger-info endpoint.
/// Birthday components are absent or zero when the user hides them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StrangerInfo {
    #[serde(default)]
    pub sex: String,
    #[serde(default)]
    pub birthday_year: Option<u32>,
    #[serde(default)]
    pub birthday_month: Option<u32>,
    #[serde(default)]
    pub birthday_day: Option<u32>,
}

/// Per-group membership info: role code plus an optional honorary title.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupMemberInfo {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub title: String,
}

/// Host-supplied client for the messaging-platform API.
#[async_trait::async_trait]
pub trait PlatformClient: Send + Sync {
    async fn stranger_info(&self, user_id: &str) -> Result<StrangerInfo>;
    async fn group_member_info(&self, group_id: &str, user_id: &str) -> Result<GroupMemberInfo>;
}
