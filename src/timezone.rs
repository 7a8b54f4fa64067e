//! ==============================================================================
//! timezone.rs - utc receipt times to the dashboard's local zone
//! ==============================================================================
//!
//! purpose:
//!     the store stamps every sample with an iso-8601 utc receipt time. the
//!     dashboard shows wall-clock time of the site (default São Paulo).
//!     everything here is pure: no clock reads, no shared state.
//!
//! accepted forms:
//!     - "2024-05-01T12:00:00Z", "2024-05-01T12:00:00.123Z"
//!     - "2024-05-01T12:00:00+00:00" (and any other rfc 3339 offset)
//!     - "2024-05-01T12:00:00.123" / "2024-05-01 12:00:00" (no offset, read as utc)
//!
//! ==============================================================================

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;

use crate::error::{MonitorError, Result};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// parse one receipt time into a utc instant
pub fn parse_utc(raw: &str) -> Result<DateTime<Utc>> {
    let trimmed = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(MonitorError::TimestampParse {
        raw: raw.to_string(),
        reason: "not an iso-8601 timestamp".to_string(),
    })
}

/// convert a single receipt time into `zone`
pub fn localize(raw: &str, zone: Tz) -> Result<DateTime<Tz>> {
    parse_utc(raw).map(|dt| dt.with_timezone(&zone))
}

/// convert a whole sequence, preserving order.
///
/// fails on the first malformed entry. callers that prefer to drop bad
/// points (the series preparer does) call [`parse_utc`] per item instead.
pub fn to_local_zone<S: AsRef<str>>(timestamps: &[S], zone: Tz) -> Result<Vec<DateTime<Tz>>> {
    timestamps.iter().map(|ts| localize(ts.as_ref(), zone)).collect()
}

/// parse an iana zone name from config
pub fn parse_zone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|e| MonitorError::Config(format!("unknown timezone {name:?}: {e}")))
}
