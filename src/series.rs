//! ==============================================================================
//! series.rs - raw history to plottable series
//! ==============================================================================
//!
//! purpose:
//!     the store returns history in whatever order it likes. the chart wants
//!     two parallel arrays sorted by time: localized timestamps and floats.
//!
//! data-quality policy:
//!     a point whose receipt time does not parse, or whose value is not
//!     a finite number, is dropped and counted in `skipped`. one bad row from the
//!     store must not blank the whole chart or abort the tick.
//!
//! relationships:
//!     - uses: timezone.rs (parse_utc)
//!     - used by: poll.rs (history half of every tick)
//!
//! ==============================================================================

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::domain::Sample;
use crate::timezone;

/// parallel timestamp / value arrays, `timestamps[i]` belongs to `values[i]`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PreparedSeries {
    pub timestamps: Vec<DateTime<Tz>>,
    pub values: Vec<f64>,
    /// points dropped because their time or value was unreadable
    pub skipped: usize,
}

impl PreparedSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// sort by receipt time and split into parallel sequences in `zone`.
///
/// sorting is on the parsed instant, not the raw string, so mixed offset
/// spellings still order correctly. the sort is stable: samples sharing a
/// receipt time keep their store order.
pub fn prepare(samples: &[Sample], zone: Tz) -> PreparedSeries {
    let mut skipped = 0;
    let mut points: Vec<(DateTime<Utc>, f64)> = Vec::with_capacity(samples.len());

    for sample in samples {
        let at = match timezone::parse_utc(&sample.received_at) {
            Ok(at) => at,
            Err(e) => {
                tracing::warn!("dropping history point: {}", e);
                skipped += 1;
                continue;
            }
        };
        match sample.as_f64() {
            Ok(value) if value.is_finite() => points.push((at, value)),
            Ok(value) => {
                tracing::warn!("dropping history point at {}: {} is not plottable", sample.received_at, value);
                skipped += 1;
            }
            Err(e) => {
                tracing::warn!("dropping history point at {}: {}", sample.received_at, e);
                skipped += 1;
            }
        }
    }

    points.sort_by_key(|(at, _)| *at);

    let (timestamps, values) = points
        .into_iter()
        .map(|(at, value)| (at.with_timezone(&zone), value))
        .unzip();

    PreparedSeries { timestamps, values, skipped }
}
