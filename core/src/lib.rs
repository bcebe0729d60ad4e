//! Data-access layer for the meican auto-ordering backend.
//!
//! # Overview
//! Covers login, menu browsing, order placement and history, and the
//! per-account auto-order settings (dish blacklist, likes, restrictions and
//! an expiration date).
//!
//! # Design
//! - `MeicanClient` builds `HttpRequest` values and parses `HttpResponse`
//!   values without touching the network (host-does-IO pattern).
//! - `MeicanApi` runs operations over a `Transport`, including the
//!   today-then-tomorrow menu probe and the read-modify-write settings
//!   chains. The rules themselves live in `settings` and `history` as pure
//!   functions.
//! - The caller identity is an explicit `Session`, never global state.

pub mod api;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod history;
pub mod http;
pub mod menu;
pub mod session;
pub mod settings;
pub mod transport;
pub mod types;

pub use api::MeicanApi;
pub use client::MeicanClient;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::ApiConfig;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionError, SessionStore};
pub use transport::{ReqwestTransport, Transport};
pub use types::{
    Account, AccountRegistration, AutoOrderInfo, BlacklistDetail, MenuEntry, NewOrder, OrderItem, OrderRecord,
    SettingsRecord, SettingsWrite, TaskPage, TaskRecord,
};
