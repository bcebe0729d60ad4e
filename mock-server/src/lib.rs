use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRecord {
    pub account_name: String,
    pub no_order_dishes: Option<String>,
    pub expire_date: Option<String>,
    pub likes: Option<String>,
    pub restrictions: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_name: String,
    #[serde(skip_serializing)]
    pub account_password: String,
    pub account_cookie: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub uid: String,
    pub account_name: String,
    pub order_dish: String,
    pub order_date: String,
    pub order_status: String,
    pub create_date: u64,
    pub error_msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select_reason: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuEntry {
    pub dish_name: String,
    pub restaurant_name: String,
}

/// Everything the fake backend knows. Seed it with the `with_*` builders.
#[derive(Debug, Default)]
pub struct Backend {
    pub accounts: Vec<Account>,
    pub settings: Vec<SettingsRecord>,
    pub tasks: Vec<Task>,
    pub menus: HashMap<String, Vec<MenuEntry>>,
    /// Accounts whose requests are answered with HTTP 401.
    pub revoked: HashSet<String>,
    /// Number of settings writes received, per account.
    pub settings_writes: HashMap<String, usize>,
}

impl Backend {
    pub fn with_menu(mut self, date: &str, entries: Vec<MenuEntry>) -> Self {
        self.menus.insert(date.to_string(), entries);
        self
    }

    pub fn with_settings(mut self, record: SettingsRecord) -> Self {
        self.settings.push(record);
        self
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn with_revoked(mut self, account: &str) -> Self {
        self.revoked.insert(account.to_string());
        self
    }
}

pub type Db = Arc<RwLock<Backend>>;

pub fn app() -> Router {
    app_with(Arc::new(RwLock::new(Backend::default())))
}

pub fn app_with(db: Db) -> Router {
    Router::new()
        .route("/meicanTask/restaurantDishList", get(restaurant_dish_list))
        .route("/meicanTask/pageTask", get(page_task))
        .route("/meicanTask/removeTask", delete(remove_task))
        .route("/meicanTask/addTask", post(add_task))
        .route("/meicanTask/recommendDish", get(recommend_dish))
        .route("/meicanAccount/listAll", get(list_accounts))
        .route("/meicanAccount/addAccount", post(add_account))
        .route("/meicanAccount/listAllCheck", get(list_settings))
        .route("/meicanAccount/addAccountDishCheck", post(write_settings))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, Arc::new(RwLock::new(Backend::default()))).await
}

pub async fn run_with(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    info!(addr = ?listener.local_addr().ok(), "mock backend listening");
    axum::serve(listener, app_with(db)).await
}

fn ok<T: Serialize>(data: T) -> Response {
    Json(json!({ "code": 200, "msg": "success", "data": data })).into_response()
}

fn fail(msg: &str) -> Response {
    Json(json!({ "code": 500, "msg": msg, "data": Value::Null })).into_response()
}

fn is_revoked(backend: &Backend, account: Option<&str>) -> bool {
    account.is_some_and(|a| backend.revoked.contains(a))
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuQuery {
    pub account_name: Option<String>,
    pub date: String,
}

async fn restaurant_dish_list(State(db): State<Db>, Query(query): Query<MenuQuery>) -> Response {
    let backend = db.read().await;
    if is_revoked(&backend, query.account_name.as_deref()) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    debug!(date = %query.date, "menu requested");
    ok(backend.menus.get(&query.date).cloned().unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page_no: usize,
    pub page_size: usize,
    pub account_name: Option<String>,
}

async fn page_task(State(db): State<Db>, Query(query): Query<PageQuery>) -> Response {
    let backend = db.read().await;
    if is_revoked(&backend, query.account_name.as_deref()) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let matching: Vec<&Task> = backend
        .tasks
        .iter()
        .filter(|t| query.account_name.as_deref().map_or(true, |a| t.account_name == a))
        .collect();
    let records: Vec<&Task> = matching
        .iter()
        .skip(query.page_no.saturating_sub(1) * query.page_size)
        .take(query.page_size)
        .copied()
        .collect();
    ok(json!({ "records": records, "total": matching.len() }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveQuery {
    pub task_id: String,
}

async fn remove_task(State(db): State<Db>, Query(query): Query<RemoveQuery>) -> Response {
    let mut backend = db.write().await;
    let before = backend.tasks.len();
    backend.tasks.retain(|t| t.uid != query.task_id);
    if backend.tasks.len() == before {
        return fail("task not found");
    }
    ok(true)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub account_name: Option<String>,
    pub order_dish: String,
    pub order_date: String,
    pub select_reason: Option<String>,
}

async fn add_task(State(db): State<Db>, Json(input): Json<NewTask>) -> Response {
    let mut backend = db.write().await;
    let Some(account_name) = input.account_name else {
        return fail("accountName is required");
    };
    if backend.revoked.contains(&account_name) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let task = Task {
        uid: Uuid::new_v4().to_string(),
        account_name,
        order_dish: input.order_dish,
        order_date: input.order_date,
        order_status: "PENDING".to_string(),
        create_date: now_millis(),
        error_msg: None,
        select_reason: input.select_reason,
    };
    backend.tasks.push(task.clone());
    ok(task.uid)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendQuery {
    pub account_name: Option<String>,
    pub order_date: String,
    #[serde(default)]
    pub recent_recommend: String,
}

/// Picks the first dish on the menu that is neither blacklisted nor recently
/// recommended.
async fn recommend_dish(State(db): State<Db>, Query(query): Query<RecommendQuery>) -> Response {
    let backend = db.read().await;
    if is_revoked(&backend, query.account_name.as_deref()) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let blacklist: Vec<&str> = backend
        .settings
        .iter()
        .find(|s| Some(s.account_name.as_str()) == query.account_name.as_deref())
        .and_then(|s| s.no_order_dishes.as_deref())
        .map(|d| d.split(',').map(str::trim).collect())
        .unwrap_or_default();
    let recent: Vec<&str> = query.recent_recommend.split(',').map(str::trim).collect();

    let pick = backend
        .menus
        .get(&query.order_date)
        .into_iter()
        .flatten()
        .find(|m| !blacklist.contains(&m.dish_name.as_str()) && !recent.contains(&m.dish_name.as_str()));
    match pick {
        Some(entry) => ok(json!({
            "dishName": entry.dish_name,
            "restaurantName": entry.restaurant_name,
            "reason": "not on your blacklist",
        })),
        None => fail("no dish available to recommend"),
    }
}

async fn list_accounts(State(db): State<Db>) -> Response {
    ok(&db.read().await.accounts)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub account_name: String,
    pub account_password: String,
    pub account_cookie: String,
}

async fn add_account(State(db): State<Db>, Json(input): Json<NewAccount>) -> Response {
    let mut backend = db.write().await;
    if backend.accounts.iter().any(|a| a.account_name == input.account_name) {
        return fail("account already exists");
    }
    backend.accounts.push(Account {
        account_name: input.account_name,
        account_password: input.account_password,
        account_cookie: input.account_cookie,
    });
    ok(Value::Null)
}

async fn list_settings(State(db): State<Db>) -> Response {
    ok(&db.read().await.settings)
}

/// Whole-record upsert keyed by account name.
async fn write_settings(State(db): State<Db>, Json(input): Json<SettingsRecord>) -> Response {
    let mut backend = db.write().await;
    if input.account_name.is_empty() {
        return fail("accountName is required");
    }
    if backend.revoked.contains(&input.account_name) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    *backend
        .settings_writes
        .entry(input.account_name.clone())
        .or_default() += 1;
    match backend
        .settings
        .iter()
        .position(|s| s.account_name == input.account_name)
    {
        Some(i) => backend.settings[i] = input,
        None => backend.settings.push(input),
    }
    ok(true)
}
