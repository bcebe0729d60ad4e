//! Auto-order settings reconciliation rules.
//!
//! # Design
//! The backend stores one settings record per account and only offers a
//! whole-record write, so every edit has to be composed onto the current
//! record before it is written back. This module holds the pure half of that
//! read-modify-write: parsing the stored dish string, the strict and
//! tolerant views of a record, list edits, and composition of the full write
//! payload. `MeicanApi` supplies the reads and the write.
//!
//! A record is active while its expiration date lies strictly after the
//! evaluation day. A record without a readable date is never active.
//!
//! `listAllCheck` returns every account's record. Only the caller's record
//! is decoded, so a malformed record of another account cannot fail the
//! caller's reads.
//!
//! Writes carry the stored `expireDate` back verbatim unless the edit
//! replaces it. The dish string is always re-serialized from the parsed
//! list, so empty segments such as the middle of `"A,,B"` are dropped on
//! any write.
//!
//! There is no concurrency token on the record: two writers racing between
//! read and write lose the earlier write.

use chrono::NaiveDate;
use serde_json::Value;

use crate::error::ApiError;
use crate::menu::format_date;
use crate::types::{AutoOrderInfo, BlacklistDetail, SettingsRecord, SettingsWrite};

const DISH_SEPARATOR: char = ',';

/// Split the stored dish string into trimmed, non-empty names.
pub fn parse_blacklist(raw: &str) -> Vec<String> {
    raw.split(DISH_SEPARATOR)
        .map(str::trim)
        .filter(|dish| !dish.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join dish names back into the stored form.
pub fn serialize_blacklist(dishes: &[String]) -> String {
    dishes.join(&DISH_SEPARATOR.to_string())
}

/// Find and decode the record belonging to `account`. Other records are
/// not inspected beyond their `accountName`.
pub fn find_record(records: &[Value], account: Option<&str>) -> Result<Option<SettingsRecord>, ApiError> {
    let Some(account) = account else {
        return Ok(None);
    };
    records
        .iter()
        .find(|r| r.get("accountName").and_then(Value::as_str) == Some(account))
        .map(|r| serde_json::from_value(r.clone()).map_err(|e| ApiError::Deserialization(e.to_string())))
        .transpose()
}

pub fn is_active(expire_date: Option<NaiveDate>, today: NaiveDate) -> bool {
    expire_date.is_some_and(|d| d > today)
}

/// The record and its expiration day, provided the record exists and is
/// still active.
pub fn active_record<'a>(
    record: Option<&'a SettingsRecord>,
    account: Option<&str>,
    today: NaiveDate,
) -> Result<(&'a SettingsRecord, NaiveDate), ApiError> {
    let account = account.unwrap_or_default().to_string();
    let record = record.ok_or_else(|| ApiError::NotConfigured {
        account: account.clone(),
    })?;
    match record.expire_date {
        Some(expire_date) if is_active(Some(expire_date), today) => Ok((record, expire_date)),
        expire_date => Err(ApiError::Expired { account, expire_date }),
    }
}

/// Strict view: the record must exist and still be active.
pub fn detail(
    record: Option<&SettingsRecord>,
    account: Option<&str>,
    today: NaiveDate,
) -> Result<BlacklistDetail, ApiError> {
    let (record, expire_date) = active_record(record, account, today)?;
    Ok(BlacklistDetail {
        no_order_dishes: parse_blacklist(record.no_order_dishes.as_deref().unwrap_or_default()),
        expire_date,
    })
}

/// Tolerant view: never fails, stale data is returned as-is.
pub fn info(record: Option<&SettingsRecord>) -> AutoOrderInfo {
    let Some(record) = record else {
        return AutoOrderInfo::default();
    };
    AutoOrderInfo {
        no_order_dishes: parse_blacklist(record.no_order_dishes.as_deref().unwrap_or_default()),
        expire_date: record.expire_date,
        likes: record.likes.clone().unwrap_or_default(),
        restrictions: record.restrictions.clone().unwrap_or_default(),
    }
}

/// Dishes currently in force: empty unless the record is active.
pub fn active_blacklist(record: Option<&SettingsRecord>, today: NaiveDate) -> Vec<String> {
    match record {
        Some(r) if is_active(r.expire_date, today) => {
            parse_blacklist(r.no_order_dishes.as_deref().unwrap_or_default())
        }
        _ => Vec::new(),
    }
}

/// Append `dish` to the list. Duplicates are kept: adding a dish that is
/// already present lists it twice.
pub fn with_added(current: &[String], dish: &str) -> Vec<String> {
    let mut next = current.to_vec();
    next.push(dish.to_string());
    next
}

/// Remove every occurrence of `dish`. Removing an absent dish is a no-op.
pub fn with_removed(current: &[String], dish: &str) -> Vec<String> {
    current.iter().filter(|d| *d != dish).cloned().collect()
}

/// Full record for a blacklist edit: the new list, the expiration of the
/// strictly validated record, and the preferences of the tolerantly read one.
pub fn compose_blacklist_write(
    account: Option<&str>,
    dishes: &[String],
    validated: &SettingsRecord,
    current: Option<&SettingsRecord>,
) -> SettingsWrite {
    let current = info(current);
    SettingsWrite {
        account_name: account.map(str::to_string),
        expire_date: validated.expire_date_raw.clone(),
        no_order_dishes: serialize_blacklist(dishes),
        likes: current.likes,
        restrictions: current.restrictions,
    }
}

/// Full record with only the expiration replaced.
pub fn compose_expire_date_write(
    account: Option<&str>,
    current: Option<&SettingsRecord>,
    expire_date: NaiveDate,
) -> SettingsWrite {
    let current = info(current);
    SettingsWrite {
        account_name: account.map(str::to_string),
        expire_date: Value::String(format_date(expire_date)),
        no_order_dishes: serialize_blacklist(&current.no_order_dishes),
        likes: current.likes,
        restrictions: current.restrictions,
    }
}

/// Full record with only the preferences replaced. The stored expiration is
/// written back as stored, readable or not.
pub fn compose_preferences_write(
    account: Option<&str>,
    current: Option<&SettingsRecord>,
    likes: &str,
    restrictions: &str,
) -> SettingsWrite {
    SettingsWrite {
        account_name: account.map(str::to_string),
        expire_date: current.map(|r| r.expire_date_raw.clone()).unwrap_or_default(),
        no_order_dishes: serialize_blacklist(&info(current).no_order_dishes),
        likes: likes.to_string(),
        restrictions: restrictions.to_string(),
    }
}
