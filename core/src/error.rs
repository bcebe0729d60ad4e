//! Error types for the meican API client.
//!
//! # Design
//! Wire-level failures (`Transport`, `HttpStatus`, `Unauthorized`,
//! `Rejected`) are kept apart from the settings-record conditions
//! (`NotConfigured`, `Expired`) so callers can tell "the backend said no"
//! from "this account has no usable auto-order settings". Operations that
//! present a user-facing message wrap the underlying error in `Failed`
//! and keep it reachable through `source()`.

use chrono::NaiveDate;
use thiserror::Error;

/// Message used when a rejected envelope carries no `msg`.
pub const DEFAULT_REJECTION_MESSAGE: &str = "request failed";

/// Errors returned by `MeicanClient` parse methods and `MeicanApi` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (connection, DNS, timeout).
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The backend answered 401; the local session has been cleared.
    #[error("unauthorized, please log in again")]
    Unauthorized,

    /// The backend answered with a non-2xx status other than 401.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The envelope `code` was not 200.
    #[error("{message}")]
    Rejected { code: i64, message: String },

    /// No auto-order settings record exists for the account.
    #[error("no auto-order settings found for account {account}, configure them first")]
    NotConfigured { account: String },

    /// The settings record is past its validity date.
    #[error("auto-order settings for account {account} expired on {}", display_date(.expire_date))]
    Expired {
        account: String,
        expire_date: Option<NaiveDate>,
    },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A user-facing failure wrapping the underlying cause.
    #[error("{message}")]
    Failed {
        message: &'static str,
        #[source]
        source: Box<ApiError>,
    },
}

impl ApiError {
    pub(crate) fn failed(message: &'static str, source: ApiError) -> Self {
        ApiError::Failed {
            message,
            source: Box::new(source),
        }
    }

    /// The innermost non-wrapper error.
    pub fn root(&self) -> &ApiError {
        match self {
            ApiError::Failed { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.root(), ApiError::Unauthorized)
    }
}

fn display_date(date: &Option<NaiveDate>) -> String {
    date.map_or_else(|| "an unknown date".to_string(), |d| d.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_keeps_cause_as_source() {
        let err = ApiError::failed(
            "failed to update preferences, please retry later",
            ApiError::Rejected {
                code: 500,
                message: "db down".to_string(),
            },
        );
        assert_eq!(
            err.to_string(),
            "failed to update preferences, please retry later"
        );
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "db down");
        assert!(matches!(err.root(), ApiError::Rejected { code: 500, .. }));
    }

    #[test]
    fn expired_display_includes_date() {
        let err = ApiError::Expired {
            account: "u1".to_string(),
            expire_date: NaiveDate::from_ymd_opt(2020, 5, 1),
        };
        assert_eq!(
            err.to_string(),
            "auto-order settings for account u1 expired on 2020-05-01"
        );
    }

    #[test]
    fn unauthorized_is_detected_through_wrapper() {
        let err = ApiError::failed("failed to recommend a dish, please retry later", ApiError::Unauthorized);
        assert!(err.is_unauthorized());
    }
}
