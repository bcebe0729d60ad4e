//! Asynchronous operations against the meican backend.
//!
//! # Design
//! `MeicanApi` pairs the stateless `MeicanClient` with a `Transport` and
//! runs each logical operation as a strictly sequential chain of round-trips:
//!
//! - Pass-throughs issue one request.
//! - `get_home_data` probes today's menu and, only when it is empty, makes
//!   one more request for the following day. Errors are not retried.
//! - Settings mutators read the current record and write the whole record
//!   back, because the backend has no partial update. Blacklist edits use
//!   the strict read (the record must exist and be active) for the
//!   expiration and the tolerant read for preferences; expiration and
//!   preference edits use only the tolerant read and so initialize a
//!   missing record.
//!
//! Nothing here is atomic. A concurrent writer between read and write is
//! overwritten. Timeouts are per request; there is no deadline across a
//! chain.
//!
//! Every failure is logged once at the operation boundary and returned. A
//! 401 from any request clears the configured `SessionStore` first.

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::client::MeicanClient;
use crate::clock::{Clock, SystemClock};
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::history;
use crate::http::{HttpRequest, HttpResponse};
use crate::menu::next_day;
use crate::session::{Session, SessionStore};
use crate::settings;
use crate::transport::Transport;
use crate::types::{
    Account, AccountRegistration, AccountSubmission, AutoOrderInfo, BlacklistDetail, MenuEntry, NewOrder,
    OrderRecord, SettingsRecord, SettingsWrite, TaskSubmission,
};

const UPDATE_EXPIRE_DATE_FAILED: &str = "failed to update the expiration date, please retry later";
const UPDATE_PREFERENCES_FAILED: &str = "failed to update preferences, please retry later";
const SUBMIT_ALL_FAILED: &str = "failed to save settings, please retry later";
const RECOMMEND_FAILED: &str = "failed to recommend a dish, please retry later";

pub struct MeicanApi<T> {
    client: MeicanClient,
    transport: T,
    clock: Arc<dyn Clock>,
    session_store: Option<Arc<dyn SessionStore>>,
}

impl<T: Transport> MeicanApi<T> {
    pub fn new(config: &ApiConfig, transport: T) -> Self {
        Self {
            client: MeicanClient::from_config(config),
            transport,
            clock: Arc::new(SystemClock),
            session_store: None,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Persist logins here and clear it when the backend answers 401.
    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    pub fn client(&self) -> &MeicanClient {
        &self.client
    }

    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    /// Log in as `username`. No backend call is made.
    pub fn login(&self, username: &str) -> Session {
        let session = Session::login(username);
        if let Some(store) = &self.session_store {
            if let Err(e) = store.save(&session) {
                warn!(error = %e, "failed to persist session");
            }
        }
        session
    }

    pub fn logout(&self) {
        if let Some(store) = &self.session_store {
            if let Err(e) = store.clear() {
                warn!(error = %e, "failed to clear session");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Menu
    // -----------------------------------------------------------------------

    /// Today's menu, or tomorrow's when today has none.
    ///
    /// The second request is made at most once and its result is returned
    /// even when it is empty too.
    #[instrument(skip(self, session), fields(account = session.account()))]
    pub async fn get_home_data(&self, session: &Session) -> Result<Vec<MenuEntry>, ApiError> {
        self.menu_with_fallback(session.account(), self.clock.today())
            .await
            .inspect_err(|e| error!(error = %e, "failed to fetch menu"))
    }

    async fn menu_with_fallback(&self, account: Option<&str>, today: NaiveDate) -> Result<Vec<MenuEntry>, ApiError> {
        let menu = self.fetch_menu(account, today).await?;
        if !menu.is_empty() {
            return Ok(menu);
        }
        let tomorrow = next_day(today);
        info!(%today, %tomorrow, "no menu for today, trying tomorrow");
        self.fetch_menu(account, tomorrow).await
    }

    #[instrument(skip(self, session), fields(account = session.account()))]
    pub async fn get_restaurant_dish_list(&self, session: &Session, date: NaiveDate) -> Result<Vec<MenuEntry>, ApiError> {
        self.fetch_menu(session.account(), date)
            .await
            .inspect_err(|e| error!(error = %e, "failed to fetch restaurant dish list"))
    }

    async fn fetch_menu(&self, account: Option<&str>, date: NaiveDate) -> Result<Vec<MenuEntry>, ApiError> {
        let request = self.client.build_restaurant_dish_list(account, date);
        self.call(request, MeicanClient::parse_restaurant_dish_list).await
    }

    // -----------------------------------------------------------------------
    // Accounts
    // -----------------------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn get_user_list(&self) -> Result<Vec<Account>, ApiError> {
        self.call(self.client.build_list_accounts(), MeicanClient::parse_list_accounts)
            .await
            .inspect_err(|e| error!(error = %e, "failed to list accounts"))
    }

    #[instrument(skip(self, registration), fields(account = %registration.username))]
    pub async fn add_account(&self, registration: &AccountRegistration) -> Result<Value, ApiError> {
        let request = self.client.build_add_account(&AccountSubmission::from(registration))?;
        self.call(request, MeicanClient::parse_ack)
            .await
            .inspect_err(|e| error!(error = %e, "failed to register account"))
    }

    // -----------------------------------------------------------------------
    // Orders
    // -----------------------------------------------------------------------

    /// First history page, filtered to the session's account when
    /// `for_current_user` is set.
    #[instrument(skip(self, session), fields(account = session.account()))]
    pub async fn get_order_history(&self, session: &Session, for_current_user: bool) -> Result<Vec<OrderRecord>, ApiError> {
        let account = if for_current_user { session.account() } else { None };
        let request = self.client.build_page_task(account);
        let page = self
            .call(request, MeicanClient::parse_page_task)
            .await
            .inspect_err(|e| error!(error = %e, "failed to fetch order history"))?;
        Ok(history::normalize(page.records))
    }

    #[instrument(skip(self))]
    pub async fn delete_order(&self, order_id: &str) -> Result<Value, ApiError> {
        self.call(self.client.build_remove_task(order_id), MeicanClient::parse_ack)
            .await
            .inspect_err(|e| error!(error = %e, "failed to delete order"))
    }

    /// Place an order for the session's account. An empty reason is not sent.
    #[instrument(skip(self, session, order), fields(account = session.account(), date = %order.order_date))]
    pub async fn submit_order(&self, session: &Session, order: &NewOrder) -> Result<Value, ApiError> {
        let submission = TaskSubmission {
            account_name: session.account().map(str::to_string),
            order_dish: order.order_dish.clone(),
            order_date: order.order_date,
            select_reason: order.select_reason.clone().filter(|r| !r.is_empty()),
        };
        let request = self.client.build_add_task(&submission)?;
        self.call(request, MeicanClient::parse_ack)
            .await
            .inspect_err(|e| error!(error = %e, "failed to submit order"))
    }

    #[instrument(skip(self, session), fields(account = session.account()))]
    pub async fn recommend_dish(
        &self,
        session: &Session,
        order_date: NaiveDate,
        recent_recommend: &str,
    ) -> Result<Value, ApiError> {
        let request = self
            .client
            .build_recommend_dish(session.account(), order_date, recent_recommend);
        self.call(request, MeicanClient::parse_recommend_dish)
            .await
            .map_err(|e| {
                error!(error = %e, "failed to fetch recommendation");
                ApiError::failed(RECOMMEND_FAILED, e)
            })
    }

    // -----------------------------------------------------------------------
    // Settings reads
    // -----------------------------------------------------------------------

    /// Dishes currently in force; empty when the record is missing or expired.
    #[instrument(skip(self, session), fields(account = session.account()))]
    pub async fn get_blacklist(&self, session: &Session) -> Result<Vec<String>, ApiError> {
        let record = self
            .read_record(session.account())
            .await
            .inspect_err(|e| error!(error = %e, "failed to fetch blacklist"))?;
        Ok(settings::active_blacklist(record.as_ref(), self.clock.today()))
    }

    /// Strict read: fails with `NotConfigured` or `Expired`.
    #[instrument(skip(self, session), fields(account = session.account()))]
    pub async fn get_blacklist_detail(&self, session: &Session) -> Result<BlacklistDetail, ApiError> {
        self.read_detail(session.account())
            .await
            .inspect_err(|e| error!(error = %e, "failed to fetch auto-order detail"))
    }

    /// Tolerant read: defaults when no record exists, stale data as-is.
    #[instrument(skip(self, session), fields(account = session.account()))]
    pub async fn get_auto_order_info(&self, session: &Session) -> Result<AutoOrderInfo, ApiError> {
        let record = self
            .read_record(session.account())
            .await
            .inspect_err(|e| error!(error = %e, "failed to fetch auto-order info"))?;
        Ok(settings::info(record.as_ref()))
    }

    async fn read_detail(&self, account: Option<&str>) -> Result<BlacklistDetail, ApiError> {
        let record = self.read_record(account).await?;
        settings::detail(record.as_ref(), account, self.clock.today())
    }

    async fn read_record(&self, account: Option<&str>) -> Result<Option<SettingsRecord>, ApiError> {
        let records = self
            .call(self.client.build_list_settings(), MeicanClient::parse_list_settings)
            .await?;
        settings::find_record(&records, account)
    }

    // -----------------------------------------------------------------------
    // Settings writes
    // -----------------------------------------------------------------------

    /// Append `dish` to `current` and write the whole record.
    ///
    /// Duplicates are not filtered. Requires an active settings record.
    #[instrument(skip(self, session, current), fields(account = session.account()))]
    pub async fn add_to_blacklist(&self, session: &Session, current: &[String], dish: &str) -> Result<Value, ApiError> {
        let dishes = settings::with_added(current, dish);
        self.write_blacklist(session, &dishes)
            .await
            .inspect_err(|e| error!(error = %e, "failed to add dish to blacklist"))
    }

    /// Remove `dish` from `current` and write the whole record, even when
    /// `dish` was not listed. Requires an active settings record.
    #[instrument(skip(self, session, current), fields(account = session.account()))]
    pub async fn remove_from_blacklist(&self, session: &Session, current: &[String], dish: &str) -> Result<Value, ApiError> {
        let dishes = settings::with_removed(current, dish);
        self.write_blacklist(session, &dishes)
            .await
            .inspect_err(|e| error!(error = %e, "failed to remove dish from blacklist"))
    }

    async fn write_blacklist(&self, session: &Session, dishes: &[String]) -> Result<Value, ApiError> {
        let account = session.account();
        let validated = self.read_record(account).await?;
        let (validated, _) = settings::active_record(validated.as_ref(), account, self.clock.today())?;
        let current = self.read_record(account).await?;
        let write = settings::compose_blacklist_write(account, dishes, validated, current.as_ref());
        self.write_settings(&write).await
    }

    /// Replace the expiration, creating the record when none exists.
    ///
    /// The dish string is re-serialized from the parsed list, so empty
    /// segments in the stored value are dropped.
    #[instrument(skip(self, session), fields(account = session.account()))]
    pub async fn update_expire_date(&self, session: &Session, expire_date: NaiveDate) -> Result<Value, ApiError> {
        self.write_expire_date(session.account(), expire_date).await.map_err(|e| {
            error!(error = %e, "failed to update expiration date");
            ApiError::failed(UPDATE_EXPIRE_DATE_FAILED, e)
        })
    }

    /// Replace likes and restrictions, creating the record when none exists.
    ///
    /// The stored `expireDate` is written back unchanged. The dish string is
    /// re-serialized from the parsed list, so a stored `"A,,B"` is written as
    /// `"A,B"`.
    #[instrument(skip(self, session, likes, restrictions), fields(account = session.account()))]
    pub async fn update_preferences(&self, session: &Session, likes: &str, restrictions: &str) -> Result<Value, ApiError> {
        self.write_preferences(session.account(), likes, restrictions)
            .await
            .map_err(|e| {
                error!(error = %e, "failed to update preferences");
                ApiError::failed(UPDATE_PREFERENCES_FAILED, e)
            })
    }

    /// Write a caller-assembled record as-is, without reading first.
    #[instrument(skip(self, record), fields(account = record.account_name.as_deref()))]
    pub async fn submit_all_changes(&self, record: &SettingsWrite) -> Result<Value, ApiError> {
        self.write_settings(record).await.map_err(|e| {
            error!(error = %e, "failed to save settings");
            ApiError::failed(SUBMIT_ALL_FAILED, e)
        })
    }

    async fn write_expire_date(&self, account: Option<&str>, expire_date: NaiveDate) -> Result<Value, ApiError> {
        let current = self.read_record(account).await?;
        self.write_settings(&settings::compose_expire_date_write(account, current.as_ref(), expire_date))
            .await
    }

    async fn write_preferences(&self, account: Option<&str>, likes: &str, restrictions: &str) -> Result<Value, ApiError> {
        let current = self.read_record(account).await?;
        self.write_settings(&settings::compose_preferences_write(account, current.as_ref(), likes, restrictions))
            .await
    }

    async fn write_settings(&self, write: &SettingsWrite) -> Result<Value, ApiError> {
        let request = self.client.build_write_settings(write)?;
        self.call(request, MeicanClient::parse_ack).await
    }

    // -----------------------------------------------------------------------
    // Round-trip
    // -----------------------------------------------------------------------

    async fn call<R>(
        &self,
        request: HttpRequest,
        parse: impl FnOnce(&MeicanClient, HttpResponse) -> Result<R, ApiError>,
    ) -> Result<R, ApiError> {
        let response = self.transport.execute(request).await?;
        let result = parse(&self.client, response);
        if let Err(ApiError::Unauthorized) = &result {
            warn!("backend rejected the session, logging out");
            self.logout();
        }
        result
    }
}
