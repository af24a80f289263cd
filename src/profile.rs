use anyhow::{Result, bail};
use chrono::{Datelike, NaiveDate};

use crate::event::StrangerInfo;
use crate::store::UserRecord;

/// Sentinel for fields the platform did not reveal.
pub const UNKNOWN: &str = "未知";

/// No-title marker stored when a group member has no honorary title.
pub const NO_TITLE: &str = "无";

// --- Gender ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl Gender {
    /// Parse the platform's gender code. Anything unrecognized is unknown.
    pub fn from_code(code: &str) -> Self {
        match code {
            "male" => Gender::Male,
            "female" => Gender::Female,
            _ => Gender::Unknown,
        }
    }

    pub fn as_text(self) -> &'static str {
        match self {
            Gender::Male => "男",
            Gender::Female => "女",
            Gender::Unknown => UNKNOWN,
        }
    }
}

// --- Group role ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupRole {
    Owner,
    Admin,
    Member,
}

impl GroupRole {
    /// Parse the platform's role code. Unrecognized codes fall back to member.
    pub fn from_code(code: &str) -> Self {
        match code {
            "owner" => GroupRole::Owner,
            "admin" => GroupRole::Admin,
            _ => GroupRole::Member,
        }
    }

    pub fn as_text(self) -> &'static str {
        match self {
            GroupRole::Owner => "群主",
            GroupRole::Admin => "管理员",
            GroupRole::Member => "成员",
        }
    }
}

// --- Birthday ---

/// Assemble an ISO `YYYY-MM-DD` birthday from stranger info. All three
/// components must be present and nonzero, otherwise the sentinel.
pub fn parse_birthday(info: &StrangerInfo) -> String {
    match (info.birthday_year, info.birthday_month, info.birthday_day) {
        (Some(y), Some(m), Some(d)) if y > 0 && m > 0 && d > 0 => {
            format!("{y:04}-{m:02}-{d:02}")
        }
        _ => UNKNOWN.to_string(),
    }
}

/// Validate a user-supplied birthday for the edit command.
pub fn validate_birthday(birthday: &str, today: NaiveDate) -> Result<()> {
    let Some((year, month, day)) = split_ymd(birthday) else {
        bail!("生日格式不正确");
    };
    if !(1900..=today.year()).contains(&year) {
        bail!("年份不合理");
    }
    if !(1..=12).contains(&month) {
        bail!("月份不合理");
    }
    if !(1..=31).contains(&day) {
        bail!("日期不合理");
    }
    Ok(())
}

/// Age in whole years at `today`. The year difference drops by one when
/// (month, day) of today precedes the birthday's, compared as tuples.
/// Unknown or malformed birthdays yield 0.
pub fn calculate_age(birthday: &str, today: NaiveDate) -> u32 {
    if birthday == UNKNOWN {
        return 0;
    }
    let Some((year, month, day)) = split_ymd(birthday) else {
        return 0;
    };
    let mut age = today.year() - year;
    if (today.month(), today.day()) < (month, day) {
        age -= 1;
    }
    age.max(0) as u32
}

fn split_ymd(s: &str) -> Option<(i32, u32, u32)> {
    let mut parts = s.split('-');
    let year = parts.next()?.parse().ok()?;
    let month = parts.next()?.parse().ok()?;
    let day = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((year, month, day))
}

// --- Prompt formatting ---

/// Localized one-line summary for system-prompt injection.
pub fn format_for_prompt(record: &UserRecord, is_group: bool, today: NaiveDate) -> String {
    let mut parts = Vec::new();

    parts.push(format!("用户ID: {}", record.user_id));
    parts.push(format!("昵称: {}", record.nickname));

    if record.gender != UNKNOWN {
        parts.push(format!("性别: {}", record.gender));
    }

    // Birthday line is always present, even when unknown
    parts.push(format!("生日: {}", record.birthday));

    if record.birthday != UNKNOWN {
        let age = calculate_age(&record.birthday, today);
        if age > 0 {
            parts.push(format!("年龄: {age}岁"));
        }
    }

    if is_group {
        if let Some(role) = &record.group_role {
            parts.push(format!("群身份: {}", GroupRole::from_code(role).as_text()));
        }
        if let Some(title) = &record.group_title
            && !title.is_empty()
            && title.as_str() != NO_TITLE
        {
            parts.push(format!("群头衔: {title}"));
        }
    }

    parts.join("，")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(user_id: &str, nickname: &str, birthday: &str) -> UserRecord {
        UserRecord {
            user_id: user_id.to_string(),
            nickname: nickname.to_string(),
            timestamp: 0,
            gender: UNKNOWN.to_string(),
            birthday: birthday.to_string(),
            group_role: None,
            group_title: None,
        }
    }

    #[test]
    fn test_age_birthday_already_passed() {
        assert_eq!(calculate_age("2000-01-01", date(2024, 6, 1)), 24);
    }

    #[test]
    fn test_age_decrements_before_birthday() {
        // Born Sep 15 — still 23 on Jun 1, 24 from Sep 15 onward
        assert_eq!(calculate_age("2000-09-15", date(2024, 6, 1)), 23);
        assert_eq!(calculate_age("2000-09-15", date(2024, 9, 14)), 23);
        assert_eq!(calculate_age("2000-09-15", date(2024, 9, 15)), 24);
    }

    #[test]
    fn test_age_newborn_is_zero() {
        assert_eq!(calculate_age("2024-02-01", date(2024, 6, 1)), 0);
        // Future birthday never goes negative
        assert_eq!(calculate_age("2030-01-01", date(2024, 6, 1)), 0);
    }

    #[test]
    fn test_age_unknown_or_malformed_is_zero() {
        let today = date(2024, 6, 1);
        assert_eq!(calculate_age(UNKNOWN, today), 0);
        assert_eq!(calculate_age("", today), 0);
        assert_eq!(calculate_age("2000-01", today), 0);
        assert_eq!(calculate_age("2000-01-01-01", today), 0);
        assert_eq!(calculate_age("not-a-date", today), 0);
    }

    #[test]
    fn test_age_tolerates_unpadded_components() {
        // Files written by the older plugin carry unpadded dates
        assert_eq!(calculate_age("2000-5-3", date(2024, 6, 1)), 24);
    }

    #[test]
    fn test_parse_birthday() {
        let info = StrangerInfo {
            sex: "male".into(),
            birthday_year: Some(1998),
            birthday_month: Some(5),
            birthday_day: Some(3),
        };
        assert_eq!(parse_birthday(&info), "1998-05-03");
    }

    #[test]
    fn test_parse_birthday_hidden_components() {
        let hidden = StrangerInfo {
            birthday_year: Some(0),
            birthday_month: Some(0),
            birthday_day: Some(0),
            ..Default::default()
        };
        assert_eq!(parse_birthday(&hidden), UNKNOWN);
        assert_eq!(parse_birthday(&StrangerInfo::default()), UNKNOWN);
    }

    #[test]
    fn test_validate_birthday() {
        let today = date(2024, 6, 1);
        assert!(validate_birthday("2000-01-01", today).is_ok());
        assert!(validate_birthday("1900-12-31", today).is_ok());
        assert!(validate_birthday("1899-01-01", today).is_err());
        assert!(validate_birthday("2025-01-01", today).is_err());
        assert!(validate_birthday("2000-13-01", today).is_err());
        assert!(validate_birthday("2000-01-32", today).is_err());
        assert!(validate_birthday("2000-01", today).is_err());
        assert!(validate_birthday("birthday", today).is_err());
    }

    #[test]
    fn test_gender_and_role_mapping() {
        assert_eq!(Gender::from_code("male").as_text(), "男");
        assert_eq!(Gender::from_code("female").as_text(), "女");
        assert_eq!(Gender::from_code("other").as_text(), UNKNOWN);
        assert_eq!(GroupRole::from_code("owner").as_text(), "群主");
        assert_eq!(GroupRole::from_code("admin").as_text(), "管理员");
        assert_eq!(GroupRole::from_code("member").as_text(), "成员");
        assert_eq!(GroupRole::from_code("???").as_text(), "成员");
    }

    #[test]
    fn test_format_excludes_unknown_gender_and_zero_age() {
        let rec = record("12345", "小明", UNKNOWN);
        let text = format_for_prompt(&rec, false, date(2024, 6, 1));
        assert_eq!(text, "用户ID: 12345，昵称: 小明，生日: 未知");
    }

    #[test]
    fn test_format_full_record_in_group() {
        let mut rec = record("12345", "小明", "2000-01-01");
        rec.gender = "男".to_string();
        rec.group_role = Some("admin".to_string());
        rec.group_title = Some("扛把子".to_string());
        let text = format_for_prompt(&rec, true, date(2024, 6, 1));
        assert_eq!(
            text,
            "用户ID: 12345，昵称: 小明，性别: 男，生日: 2000-01-01，年龄: 24岁，群身份: 管理员，群头衔: 扛把子"
        );
    }

    #[test]
    fn test_format_hides_group_fields_in_direct_chat() {
        let mut rec = record("12345", "小明", UNKNOWN);
        rec.group_role = Some("owner".to_string());
        rec.group_title = Some(NO_TITLE.to_string());
        let text = format_for_prompt(&rec, false, date(2024, 6, 1));
        assert!(!text.contains("群身份"));
        assert!(!text.contains("群头衔"));
    }

    #[test]
    fn test_format_hides_placeholder_title() {
        let mut rec = record("12345", "小明", UNKNOWN);
        rec.group_role = Some("member".to_string());
        rec.group_title = Some(NO_TITLE.to_string());
        let text = format_for_prompt(&rec, true, date(2024, 6, 1));
        assert!(text.contains("群身份: 成员"));
        assert!(!text.contains("群头衔"));
    }
}
