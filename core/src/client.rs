//! Stateless HTTP request builder and response parser for the meican backend.
//!
//! # Design
//! `MeicanClient` holds only the base URL and the per-call timeouts and
//! carries no mutable state between calls. Each endpoint is split into a
//! `build_*` method that produces an `HttpRequest` and a `parse_*` method
//! that consumes an `HttpResponse`. The caller executes the round-trip.
//!
//! Every response goes through the same two gates: the HTTP status (401 is
//! `Unauthorized`, any other non-2xx is `HttpStatus`) and then the
//! `{code, msg, data}` envelope, where only `code == 200` unwraps to `data`.

use std::time::Duration;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::ApiConfig;
use crate::error::{ApiError, DEFAULT_REJECTION_MESSAGE};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::menu::format_date;
use crate::types::{
    Account, AccountSubmission, Envelope, MenuEntry, SettingsWrite, TaskPage, TaskSubmission,
};

/// History is fetched as a single fixed page.
pub const HISTORY_PAGE_NO: u32 = 1;
pub const HISTORY_PAGE_SIZE: u32 = 100;

const ENVELOPE_OK: i64 = 200;

/// Synchronous, stateless client for the meican backend.
#[derive(Debug, Clone)]
pub struct MeicanClient {
    base_url: String,
    timeout: Duration,
    recommend_timeout: Duration,
}

impl MeicanClient {
    pub fn new(base_url: &str) -> Self {
        Self::from_config(&ApiConfig::new(base_url))
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
            recommend_timeout: config.recommend_timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -----------------------------------------------------------------------
    // Menu
    // -----------------------------------------------------------------------

    pub fn build_restaurant_dish_list(&self, account: Option<&str>, date: NaiveDate) -> HttpRequest {
        let date = format_date(date);
        self.get(
            "/meicanTask/restaurantDishList",
            &[("accountName", account), ("date", Some(date.as_str()))],
        )
    }

    /// A null `data` is read as an empty menu.
    pub fn parse_restaurant_dish_list(&self, response: HttpResponse) -> Result<Vec<MenuEntry>, ApiError> {
        Ok(parse_data::<Option<Vec<MenuEntry>>>(response)?.unwrap_or_default())
    }

    // -----------------------------------------------------------------------
    // Accounts
    // -----------------------------------------------------------------------

    pub fn build_list_accounts(&self) -> HttpRequest {
        self.get("/meicanAccount/listAll", &[])
    }

    pub fn parse_list_accounts(&self, response: HttpResponse) -> Result<Vec<Account>, ApiError> {
        Ok(parse_data::<Option<Vec<Account>>>(response)?.unwrap_or_default())
    }

    pub fn build_add_account(&self, input: &AccountSubmission) -> Result<HttpRequest, ApiError> {
        self.post("/meicanAccount/addAccount", input)
    }

    // -----------------------------------------------------------------------
    // Orders
    // -----------------------------------------------------------------------

    /// The `accountName` filter is only sent when `account` is given.
    pub fn build_page_task(&self, account: Option<&str>) -> HttpRequest {
        let page_no = HISTORY_PAGE_NO.to_string();
        let page_size = HISTORY_PAGE_SIZE.to_string();
        self.get(
            "/meicanTask/pageTask",
            &[
                ("pageNo", Some(page_no.as_str())),
                ("pageSize", Some(page_size.as_str())),
                ("accountName", account),
            ],
        )
    }

    pub fn parse_page_task(&self, response: HttpResponse) -> Result<TaskPage, ApiError> {
        Ok(parse_data::<Option<TaskPage>>(response)?.unwrap_or_default())
    }

    pub fn build_remove_task(&self, task_id: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Delete,
            ..self.get("/meicanTask/removeTask", &[("taskId", Some(task_id))])
        }
    }

    pub fn build_add_task(&self, input: &TaskSubmission) -> Result<HttpRequest, ApiError> {
        self.post("/meicanTask/addTask", input)
    }

    pub fn build_recommend_dish(&self, account: Option<&str>, order_date: NaiveDate, recent_recommend: &str) -> HttpRequest {
        let order_date = format_date(order_date);
        HttpRequest {
            timeout: self.recommend_timeout,
            ..self.get(
                "/meicanTask/recommendDish",
                &[
                    ("accountName", account),
                    ("orderDate", Some(order_date.as_str())),
                    ("recentRecommend", Some(recent_recommend)),
                ],
            )
        }
    }

    pub fn parse_recommend_dish(&self, response: HttpResponse) -> Result<Value, ApiError> {
        parse_data(response)
    }

    // -----------------------------------------------------------------------
    // Settings
    // -----------------------------------------------------------------------

    pub fn build_list_settings(&self) -> HttpRequest {
        self.get("/meicanAccount/listAllCheck", &[])
    }

    /// Every account's settings, undecoded. Pick one with
    /// `settings::find_record`.
    pub fn parse_list_settings(&self, response: HttpResponse) -> Result<Vec<Value>, ApiError> {
        Ok(parse_data::<Option<Vec<Value>>>(response)?.unwrap_or_default())
    }

    pub fn build_write_settings(&self, input: &SettingsWrite) -> Result<HttpRequest, ApiError> {
        self.post("/meicanAccount/addAccountDishCheck", input)
    }

    /// Parse a write acknowledgement; `data` is returned as-is.
    pub fn parse_ack(&self, response: HttpResponse) -> Result<Value, ApiError> {
        parse_data(response)
    }

    // -----------------------------------------------------------------------
    // Builders
    // -----------------------------------------------------------------------

    fn url(&self, path: &str, query: &[(&str, Option<&str>)]) -> String {
        let mut pairs = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in query {
            if let Some(value) = value {
                pairs.append_pair(key, value);
            }
        }
        let query = pairs.finish();
        if query.is_empty() {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}{path}?{query}", self.base_url)
        }
    }

    fn get(&self, path: &str, query: &[(&str, Option<&str>)]) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: self.url(path, query),
            headers: Vec::new(),
            body: None,
            timeout: self.timeout,
        }
    }

    fn post<T: Serialize>(&self, path: &str, input: &T) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(input).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: self.url(path, &[]),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
            timeout: self.timeout,
        })
    }
}

/// Apply the status and envelope gates and decode `data` as `T`.
fn parse_data<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    check_status(&response)?;
    let envelope: Envelope =
        serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))?;
    if envelope.code != ENVELOPE_OK {
        return Err(ApiError::Rejected {
            code: envelope.code,
            message: envelope
                .msg
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_REJECTION_MESSAGE.to_string()),
        });
    }
    serde_json::from_value(envelope.data).map_err(|e| ApiError::Deserialization(e.to_string()))
}

fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    match response.status {
        200..=299 => Ok(()),
        401 => Err(ApiError::Unauthorized),
        status => Err(ApiError::HttpStatus {
            status,
            body: response.body.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> MeicanClient {
        MeicanClient::new("http://localhost:3000/api")
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ok(data: &str) -> HttpResponse {
        HttpResponse::new(200, format!(r#"{{"code":200,"msg":"success","data":{data}}}"#))
    }

    #[test]
    fn build_restaurant_dish_list_produces_correct_request() {
        let req = client().build_restaurant_dish_list(Some("u1"), day(2024, 3, 7));
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(
            req.url,
            "http://localhost:3000/api/meicanTask/restaurantDishList?accountName=u1&date=2024-03-07"
        );
        assert!(req.body.is_none());
        assert_eq!(req.timeout, Duration::from_millis(5000));
    }

    #[test]
    fn build_restaurant_dish_list_without_identity_omits_account() {
        let req = client().build_restaurant_dish_list(None, day(2024, 3, 7));
        assert_eq!(req.query_param("accountName"), None);
        assert_eq!(req.query_param("date").as_deref(), Some("2024-03-07"));
    }

    #[test]
    fn build_page_task_filters_by_account_when_given() {
        let req = client().build_page_task(Some("u 1"));
        assert_eq!(
            req.url,
            "http://localhost:3000/api/meicanTask/pageTask?pageNo=1&pageSize=100&accountName=u+1"
        );
        let req = client().build_page_task(None);
        assert_eq!(
            req.url,
            "http://localhost:3000/api/meicanTask/pageTask?pageNo=1&pageSize=100"
        );
    }

    #[test]
    fn build_remove_task_uses_delete() {
        let req = client().build_remove_task("t-9");
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.path(), "/api/meicanTask/removeTask");
        assert_eq!(req.query_param("taskId").as_deref(), Some("t-9"));
    }

    #[test]
    fn build_write_settings_produces_correct_request() {
        let input = SettingsWrite {
            account_name: Some("u1".to_string()),
            expire_date: Value::from("2099-01-01"),
            no_order_dishes: "Pork Rice,Tofu Soup".to_string(),
            likes: "spicy".to_string(),
            restrictions: String::new(),
        };
        let req = client().build_write_settings(&input).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:3000/api/meicanAccount/addAccountDishCheck");
        assert_eq!(
            req.headers,
            vec![("content-type".to_string(), "application/json".to_string())]
        );
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["accountName"], "u1");
        assert_eq!(body["expireDate"], "2099-01-01");
        assert_eq!(body["noOrderDishes"], "Pork Rice,Tofu Soup");
    }

    #[test]
    fn build_recommend_dish_uses_long_timeout() {
        let req = client().build_recommend_dish(Some("u1"), day(2024, 3, 7), "");
        assert_eq!(req.timeout, Duration::from_millis(30_000));
        assert_eq!(req.query_param("recentRecommend").as_deref(), Some(""));
        assert_eq!(req.query_param("orderDate").as_deref(), Some("2024-03-07"));
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = MeicanClient::new("http://localhost:3000/api/");
        assert_eq!(client.build_list_settings().url, "http://localhost:3000/api/meicanAccount/listAllCheck");
    }

    #[test]
    fn parse_list_settings_success() {
        let response = ok(r#"[{"accountName":"u1","noOrderDishes":"A,B","expireDate":"2099-01-01"}]"#);
        let records = client().parse_list_settings(response).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["accountName"], "u1");
    }

    #[test]
    fn parse_list_settings_tolerates_malformed_records() {
        let response = ok(r#"[{"accountName":null},{"accountName":"u2","expireDate":4070908800000},{"accountName":"u1"}]"#);
        let records = client().parse_list_settings(response).unwrap();
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn parse_menu_null_data_is_empty() {
        let menu = client().parse_restaurant_dish_list(ok("null")).unwrap();
        assert!(menu.is_empty());
    }

    #[test]
    fn rejected_envelope_carries_message() {
        let response = HttpResponse::new(200, r#"{"code":500,"msg":"account locked","data":null}"#);
        let err = client().parse_list_settings(response).unwrap_err();
        assert!(matches!(err, ApiError::Rejected { code: 500, ref message } if message == "account locked"));
    }

    #[test]
    fn rejected_envelope_without_message_gets_default() {
        let response = HttpResponse::new(200, r#"{"code":400}"#);
        let err = client().parse_ack(response).unwrap_err();
        assert_eq!(err.to_string(), DEFAULT_REJECTION_MESSAGE);
    }

    #[test]
    fn status_401_is_unauthorized() {
        let err = client().parse_page_task(HttpResponse::new(401, "")).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[test]
    fn other_error_status_keeps_body() {
        let err = client()
            .parse_page_task(HttpResponse::new(502, "bad gateway"))
            .unwrap_err();
        assert!(matches!(err, ApiError::HttpStatus { status: 502, ref body } if body == "bad gateway"));
    }

    #[test]
    fn parse_bad_json() {
        let err = client().parse_ack(HttpResponse::new(200, "not json")).unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }
}
