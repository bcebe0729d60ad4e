//! Wire DTOs for the meican backend and the normalized shapes handed to
//! callers.
//!
//! # Design
//! Backend records are read leniently: every settings field except the
//! account key is optional, and task fields the adapter only passes through
//! are kept as raw `serde_json::Value` so their backend types survive
//! untouched. Write payloads are separate types with no optional mutable
//! fields, because the settings endpoint replaces the whole record.
//!
//! A stored `expireDate` is kept twice: as the calendar day used for the
//! active/expired decision, and as the raw value written back by edits that
//! do not replace it. A value whose day cannot be read is never rewritten.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The `{code, msg, data}` wrapper around every backend response.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Value,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// One per-account auto-order settings record as stored by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "StoredSettings")]
pub struct SettingsRecord {
    pub account_name: String,
    pub no_order_dishes: Option<String>,
    /// Day read from `expire_date_raw`, if it holds one.
    pub expire_date: Option<NaiveDate>,
    pub expire_date_raw: Value,
    pub likes: Option<String>,
    pub restrictions: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSettings {
    account_name: String,
    #[serde(default)]
    no_order_dishes: Option<String>,
    #[serde(default)]
    expire_date: Value,
    #[serde(default)]
    likes: Option<String>,
    #[serde(default)]
    restrictions: Option<String>,
}

impl From<StoredSettings> for SettingsRecord {
    fn from(stored: StoredSettings) -> Self {
        Self {
            account_name: stored.account_name,
            no_order_dishes: stored.no_order_dishes,
            expire_date: read_date(&stored.expire_date),
            expire_date_raw: stored.expire_date,
            likes: stored.likes,
            restrictions: stored.restrictions,
        }
    }
}

/// Whole-record write for `/meicanAccount/addAccountDishCheck`.
///
/// `expire_date` is sent as given so a stored value can be written back
/// byte-for-byte; new dates are `yyyy-MM-dd` strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsWrite {
    pub account_name: Option<String>,
    pub expire_date: Value,
    pub no_order_dishes: String,
    pub likes: String,
    pub restrictions: String,
}

/// Strict view of an active settings record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlacklistDetail {
    pub no_order_dishes: Vec<String>,
    pub expire_date: NaiveDate,
}

/// Tolerant view of a settings record; defaults when none exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoOrderInfo {
    pub no_order_dishes: Vec<String>,
    pub expire_date: Option<NaiveDate>,
    pub likes: String,
    pub restrictions: String,
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// A raw task record from `/meicanTask/pageTask`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    #[serde(default)]
    pub uid: Value,
    #[serde(default)]
    pub order_dish: Value,
    #[serde(default)]
    pub account_name: Value,
    #[serde(default)]
    pub order_date: Value,
    #[serde(default)]
    pub order_status: Value,
    #[serde(default)]
    pub create_date: Value,
    #[serde(default)]
    pub error_msg: Value,
    #[serde(default)]
    pub select_reason: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPage {
    #[serde(default)]
    pub records: Vec<TaskRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

/// Order history entry in the shape the frontend consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub order_id: Value,
    pub item: OrderItem,
    pub dates: Vec<Value>,
    pub status: Value,
    pub create_time: Value,
    pub error_msg: Value,
    pub select_reason: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: Value,
    pub uid: Value,
}

/// An order the user wants placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub order_dish: String,
    pub order_date: NaiveDate,
    pub select_reason: Option<String>,
}

/// Body of `/meicanTask/addTask`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSubmission {
    pub account_name: Option<String>,
    pub order_dish: String,
    pub order_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select_reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Menu and accounts
// ---------------------------------------------------------------------------

/// A dish offered by a restaurant on a given date.
///
/// Only the names are typed; the remaining backend fields are carried in
/// `extra` unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dish_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restaurant_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A registered meican account as listed by `/meicanAccount/listAll`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Credentials for registering an account with the ordering backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRegistration {
    pub username: String,
    pub password: String,
    pub cookie: String,
}

/// Body of `/meicanAccount/addAccount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSubmission {
    pub account_name: String,
    pub account_password: String,
    pub account_cookie: String,
}

impl From<&AccountRegistration> for AccountSubmission {
    fn from(reg: &AccountRegistration) -> Self {
        Self {
            account_name: reg.username.clone(),
            account_password: reg.password.clone(),
            account_cookie: reg.cookie.clone(),
        }
    }
}

/// Reads `yyyy-MM-dd`, optionally followed by a time part, or epoch
/// milliseconds (UTC). Anything else is no date.
fn read_date(raw: &Value) -> Option<NaiveDate> {
    match raw {
        Value::String(s) => {
            let day = s.get(..10).unwrap_or(s);
            NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|t| t.date_naive()),
        _ => None,
    }
}
