//! ==============================================================================
//! vinheria-monitor - environmental threshold monitor
//! ==============================================================================
//!
//! polls temperature / humidity / luminosity history from FIWARE STH-Comet,
//! checks the newest reading of each against an open threshold band, tells
//! the lamp (through Orion) which alarm to blink whenever that decision
//! changes, and serves the history as a dashboard.
//!
//! module map (leaf first):
//!     error       MonitorError
//!     domain      Signal, Sample, ThresholdBand, Command, RenderPayload
//!     timezone    utc receipt times → local zone
//!     series      raw history → sorted parallel arrays
//!     store       SampleStore trait + STH http client
//!     evaluator   bands + latest readings → violations + command
//!     dispatcher  AlertState + deduplicated Orion commands
//!     poll        the tick loop tying it all together
//!     server      axum dashboard / json api
//!     config      monitor.toml schema
//!
//! ==============================================================================

pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod error;
pub mod evaluator;
pub mod poll;
pub mod series;
pub mod server;
pub mod store;
pub mod timezone;

pub use error::MonitorError;
