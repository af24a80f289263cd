use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::store::UserTable;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[User ID: (\d+), Nickname: ([^\]]+)\]").expect("placeholder pattern")
});

/// Rewrite nickname placeholders in the chat context to the latest stored
/// nickname. Tokens whose id has no record, or whose nickname is already
/// current, are left untouched.
pub fn replace_nicknames(users: &UserTable, text: &str) -> String {
    if users.is_empty() || text.is_empty() {
        return text.to_string();
    }
    PLACEHOLDER
        .replace_all(text, |caps: &Captures| {
            let user_id = &caps[1];
            let old_nickname = &caps[2];
            match users.get(user_id) {
                Some(record)
                    if !record.nickname.is_empty() && record.nickname != old_nickname =>
                {
                    format!("[User ID: {user_id}, Nickname: {}]", record.nickname)
                }
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}
