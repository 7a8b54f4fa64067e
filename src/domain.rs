//! ==============================================================================
//! domain.rs - core data model
//! ==============================================================================
//!
//! purpose:
//!     the vocabulary every other module speaks: which signals are watched,
//!     what a raw store sample looks like, the threshold band, the command
//!     set understood by the lamp, and the payload the dashboard renders.
//!
//! relationships:
//!     - used by: every other module
//!     - wire names of Command match the lamp's iot agent command handlers
//!
//! ==============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};
use crate::series::PreparedSeries;

// ==============================================================================
// signals
// ==============================================================================

/// one monitored physical quantity
///
/// declaration order is the alarm priority order: when several signals are
/// out of range at once, the earliest one owns the blink command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Temperature,
    Humidity,
    Luminosity,
}

impl Signal {
    pub const PRIORITY: [Signal; 3] = [Signal::Temperature, Signal::Humidity, Signal::Luminosity];

    /// attribute name of this signal on the store entity
    pub fn attribute(self) -> &'static str {
        match self {
            Signal::Temperature => "temperature",
            Signal::Humidity => "humidity",
            Signal::Luminosity => "luminosity",
        }
    }

    pub fn blink_command(self) -> Command {
        match self {
            Signal::Temperature => Command::BlinkTemperature,
            Signal::Humidity => Command::BlinkHumidity,
            Signal::Luminosity => Command::BlinkLuminosity,
        }
    }

    /// chart legend label
    pub fn label(self) -> &'static str {
        match self {
            Signal::Temperature => "Temperature (°C)",
            Signal::Humidity => "Humidity (%)",
            Signal::Luminosity => "Luminosity (%)",
        }
    }

    /// line colour used by the dashboard chart
    pub fn color(self) -> &'static str {
        match self {
            Signal::Temperature => "#FF5733",
            Signal::Humidity => "#33CFFF",
            Signal::Luminosity => "#F1C40F",
        }
    }

    /// coerce a raw store value into the numeric type this signal is
    /// evaluated as.
    ///
    /// temperature and humidity are floats. luminosity is an integer: json
    /// numbers are truncated toward zero, strings must be integer literals.
    pub fn coerce(self, raw: &serde_json::Value) -> Result<f64> {
        match self {
            Signal::Temperature | Signal::Humidity => coerce_float(raw),
            Signal::Luminosity => coerce_integer(raw).map(|v| v as f64),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.attribute())
    }
}

fn coerce_float(raw: &serde_json::Value) -> Result<f64> {
    let parsed = match raw {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| MonitorError::ValueCoercion { raw: raw.to_string(), expected: "float" })
}

fn coerce_integer(raw: &serde_json::Value) -> Result<i64> {
    let parsed = match raw {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|v| v.is_finite()).map(|v| v.trunc() as i64)),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| MonitorError::ValueCoercion { raw: raw.to_string(), expected: "integer" })
}

// ==============================================================================
// samples
// ==============================================================================

/// one raw entry of the store's `values` array
///
/// the store sends extra keys (`_id`, `attrType`); they are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// raw value, a json number or a numeric string
    #[serde(rename = "attrValue")]
    pub value: serde_json::Value,
    /// receipt time as an iso-8601 utc string
    #[serde(rename = "recvTime")]
    pub received_at: String,
}

impl Sample {
    pub fn new(value: impl Into<serde_json::Value>, received_at: impl Into<String>) -> Self {
        Self { value: value.into(), received_at: received_at.into() }
    }

    /// value as a float, used for charting every signal
    pub fn as_f64(&self) -> Result<f64> {
        coerce_float(&self.value)
    }
}

// ==============================================================================
// thresholds
// ==============================================================================

/// open interval `(min, max)` a signal must stay inside
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBand {
    pub min: f64,
    pub max: f64,
}

impl ThresholdBand {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// strictly inside the band; landing on a bound counts as a violation
    pub fn contains(&self, value: f64) -> bool {
        self.min < value && value < self.max
    }
}

/// one band per monitored signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub temperature: ThresholdBand,
    pub humidity: ThresholdBand,
    pub luminosity: ThresholdBand,
}

impl Thresholds {
    pub fn band(&self, signal: Signal) -> ThresholdBand {
        match signal {
            Signal::Temperature => self.temperature,
            Signal::Humidity => self.humidity,
            Signal::Luminosity => self.luminosity,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            temperature: ThresholdBand::new(10.0, 18.0),
            humidity: ThresholdBand::new(50.0, 80.0),
            luminosity: ThresholdBand::new(-1.0, 10.0),
        }
    }
}

// ==============================================================================
// commands
// ==============================================================================

/// what the lamp is told to do; the serde names are the iot agent's
/// command vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    #[serde(rename = "desligar")]
    TurnOff,
    #[serde(rename = "piscar_temp")]
    BlinkTemperature,
    #[serde(rename = "piscar_umid")]
    BlinkHumidity,
    #[serde(rename = "piscar_lum")]
    BlinkLuminosity,
}

impl Command {
    pub fn wire_name(self) -> &'static str {
        match self {
            Command::TurnOff => "desligar",
            Command::BlinkTemperature => "piscar_temp",
            Command::BlinkHumidity => "piscar_umid",
            Command::BlinkLuminosity => "piscar_lum",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

// ==============================================================================
// render payload
// ==============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    #[default]
    Nominal,
    Violation,
}

/// history of all three signals, ready to plot
#[derive(Debug, Clone, Default, Serialize)]
pub struct SeriesSet {
    pub temperature: PreparedSeries,
    pub humidity: PreparedSeries,
    pub luminosity: PreparedSeries,
}

impl SeriesSet {
    pub fn get(&self, signal: Signal) -> &PreparedSeries {
        match signal {
            Signal::Temperature => &self.temperature,
            Signal::Humidity => &self.humidity,
            Signal::Luminosity => &self.luminosity,
        }
    }
}

/// everything the dashboard needs for one tick. rebuilt, never patched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RenderPayload {
    pub series: SeriesSet,
    pub alert_text: Vec<String>,
    pub alert_severity: AlertSeverity,
    /// false when the tick skipped evaluation because a signal was missing
    pub evaluated: bool,
}

/// state shared between the poll loop (writer) and the web server (readers)
#[derive(Debug, Clone, Default, Serialize)]
pub struct AppState {
    pub payload: RenderPayload,
    /// unix timestamp (ms) of the last completed tick
    pub last_update: u64,
    pub ticks: u64,
}
