use std::sync::Arc;

use anyhow::Result;
use chrono::{Local, NaiveDate};

use crate::config::PluginConfig;
use crate::event::{MessageEvent, PlatformClient, ProviderRequest};
use crate::profile::{self, Gender, NO_TITLE, UNKNOWN};
use crate::rewrite;
use crate::store::{GroupMemberRecord, ProfileStore, UserRecord};

const MISSING_RECORD_REPLY: &str = "您的用户信息不存在，请先发送一条消息触发信息记录";

/// The plugin surface the host framework wires up: one prompt-enrichment hook
/// plus the profile edit/view commands. Command parsing and dispatch stay on
/// the host side; handlers return the reply text to send back.
pub struct ProfilePlugin {
    config: PluginConfig,
    store: ProfileStore,
    client: Arc<dyn PlatformClient>,
}

impl ProfilePlugin {
    pub fn new(config: PluginConfig, client: Arc<dyn PlatformClient>) -> Result<Self> {
        config.ensure_data_dir()?;
        let store = ProfileStore::new(&config);
        Ok(Self {
            config,
            store,
            client,
        })
    }

    /// Called by the host before every LLM request. Never fails the request:
    /// enrichment errors are logged and the prompt goes out unmodified.
    pub async fn on_llm_request(&self, event: &MessageEvent, req: &mut ProviderRequest) {
        if event.platform != self.config.platform {
            return;
        }
        if let Err(e) = self.enrich_request(event, req).await {
            tracing::error!("Failed to enrich request for {}: {e}", event.sender_id);
        }
    }

    async fn enrich_request(
        &self,
        event: &MessageEvent,
        req: &mut ProviderRequest,
    ) -> Result<()> {
        let mut users = self.store.load_users();

        if !users.contains_key(&event.sender_id) {
            let record = self.fetch_user_record(event).await;
            users.insert(event.sender_id.clone(), record);
            self.store.save_users(&users)?;
            tracing::info!("Recorded new user {}", event.sender_id);
        }
        let record = &users[&event.sender_id];

        // Group membership snapshot is refreshed on every group message
        if let Some(group_id) = &event.group_id {
            let mut groups = self.store.load_groups();
            let snapshot = GroupMemberRecord {
                user_id: event.sender_id.clone(),
                group_id: group_id.clone(),
                group_role: record
                    .group_role
                    .clone()
                    .unwrap_or_else(|| "member".to_string()),
                group_title: record
                    .group_title
                    .clone()
                    .unwrap_or_else(|| NO_TITLE.to_string()),
                nickname: if record.nickname.is_empty() {
                    UNKNOWN.to_string()
                } else {
                    record.nickname.clone()
                },
                timestamp: Local::now().to_rfc3339(),
            };
            groups
                .entry(group_id.clone())
                .or_default()
                .insert(event.sender_id.clone(), snapshot);
            self.store.save_groups(&groups)?;
            tracing::debug!(
                "Updated group snapshot for {} in {group_id}",
                event.sender_id
            );
        }

        req.context = rewrite::replace_nicknames(&users, &req.context);

        let today = Local::now().date_naive();
        let user_prompt = profile::format_for_prompt(record, event.is_group(), today);
        if !user_prompt.is_empty() {
            let nickname = if record.nickname.is_empty() {
                "用户"
            } else {
                &record.nickname
            };
            req.system_prompt = format!(
                "当前对话用户信息: {user_prompt}。请称呼用户为{nickname}。{}",
                req.system_prompt
            );
            tracing::debug!("Injected user info into prompt: {user_prompt}");
        }

        Ok(())
    }

    /// Build a fresh record from the event plus platform lookups. API
    /// failures degrade to unknown fields so the record is still usable.
    async fn fetch_user_record(&self, event: &MessageEvent) -> UserRecord {
        let mut record = UserRecord {
            user_id: event.sender_id.clone(),
            nickname: event.sender_name.clone(),
            timestamp: event.timestamp,
            gender: UNKNOWN.to_string(),
            birthday: UNKNOWN.to_string(),
            group_role: None,
            group_title: None,
        };

        match self.client.stranger_info(&event.sender_id).await {
            Ok(info) => {
                record.gender = Gender::from_code(&info.sex).as_text().to_string();
                record.birthday = profile::parse_birthday(&info);
            }
            Err(e) => {
                tracing::error!("Failed to fetch profile for {}: {e}", event.sender_id);
            }
        }

        if let Some(group_id) = &event.group_id {
            match self
                .client
                .group_member_info(group_id, &event.sender_id)
                .await
            {
                Ok(info) => {
                    record.group_role = Some(if info.role.is_empty() {
                        "member".to_string()
                    } else {
                        info.role
                    });
                    record.group_title = Some(if info.title.is_empty() {
                        NO_TITLE.to_string()
                    } else {
                        info.title
                    });
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to fetch member info for {} in {group_id}: {e}",
                        event.sender_id
                    );
                }
            }
        }

        record
    }

    // --- Edit commands ---

    pub fn set_nickname(&self, user_id: &str, new_nickname: &str) -> String {
        match self.update_record(user_id, |record| {
            tracing::info!(
                "User {user_id} nickname: {} -> {new_nickname}",
                record.nickname
            );
            record.nickname = new_nickname.to_string();
        }) {
            Ok(true) => format!("已更新您的昵称: {new_nickname}"),
            Ok(false) => MISSING_RECORD_REPLY.to_string(),
            Err(e) => {
                tracing::error!("Failed to update nickname for {user_id}: {e}");
                format!("更新昵称失败: {e}")
            }
        }
    }

    pub fn set_birthday(&self, user_id: &str, new_birthday: &str, today: NaiveDate) -> String {
        if let Err(e) = profile::validate_birthday(new_birthday, today) {
            return format!("生日格式不正确，请使用 YYYY-MM-DD 格式: {e}");
        }
        match self.update_record(user_id, |record| {
            tracing::info!(
                "User {user_id} birthday: {} -> {new_birthday}",
                record.birthday
            );
            record.birthday = new_birthday.to_string();
        }) {
            Ok(true) => format!("已更新您的生日: {new_birthday}"),
            Ok(false) => MISSING_RECORD_REPLY.to_string(),
            Err(e) => {
                tracing::error!("Failed to update birthday for {user_id}: {e}");
                format!("更新生日失败: {e}")
            }
        }
    }

    pub fn set_gender(&self, user_id: &str, new_gender: &str) -> String {
        // Only an explicit choice is accepted; "unknown" stays API-driven
        if new_gender != Gender::Male.as_text() && new_gender != Gender::Female.as_text() {
            return format!(
                "性别必须是: {}, {}",
                Gender::Male.as_text(),
                Gender::Female.as_text()
            );
        }
        match self.update_record(user_id, |record| {
            tracing::info!("User {user_id} gender: {} -> {new_gender}", record.gender);
            record.gender = new_gender.to_string();
        }) {
            Ok(true) => format!("已更新您的性别: {new_gender}"),
            Ok(false) => MISSING_RECORD_REPLY.to_string(),
            Err(e) => {
                tracing::error!("Failed to update gender for {user_id}: {e}");
                format!("更新性别失败: {e}")
            }
        }
    }

    pub fn my_info(&self, user_id: &str, today: NaiveDate) -> String {
        let users = self.store.load_users();
        let Some(record) = users.get(user_id) else {
            return MISSING_RECORD_REPLY.to_string();
        };

        let mut text = format!(
            "您的信息:\nID: {}\n昵称: {}\n性别: {}\n生日: {}",
            record.user_id, record.nickname, record.gender, record.birthday
        );
        if record.birthday != UNKNOWN {
            let age = profile::calculate_age(&record.birthday, today);
            if age > 0 {
                text.push_str(&format!("\n年龄: {age}岁"));
            }
        }
        text
    }

    fn update_record(
        &self,
        user_id: &str,
        apply: impl FnOnce(&mut UserRecord),
    ) -> Result<bool> {
        let mut users = self.store.load_users();
        let Some(record) = users.get_mut(user_id) else {
            return Ok(false);
        };
        apply(record);
        self.store.save_users(&users)?;
        Ok(true)
    }
}
