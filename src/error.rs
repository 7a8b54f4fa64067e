//! ==============================================================================
//! error.rs - domain error taxonomy
//! ==============================================================================
//!
//! purpose:
//!     one error enum for everything the monitor can fail at below the
//!     binary edge. none of these are fatal: the store client turns them
//!     into empty results, the dispatcher into an unconfirmed send, the
//!     series preparer into a skipped point.
//!
//! relationships:
//!     - produced by: store.rs, dispatcher.rs, timezone.rs, domain.rs
//!     - anyhow is still used in main.rs / config.rs for startup errors
//!
//! ==============================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    /// request never produced a response (connect refused, timeout, dns)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// upstream answered with something other than a success status
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    /// body decoded but the expected json path was missing
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("invalid timestamp {raw:?}: {reason}")]
    TimestampParse { raw: String, reason: String },

    #[error("value {raw} is not a valid {expected}")]
    ValueCoercion { raw: String, expected: &'static str },

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T, E = MonitorError> = std::result::Result<T, E>;
