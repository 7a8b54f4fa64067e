//! ==============================================================================
//! evaluator.rs - threshold evaluation with priority tie-break
//! ==============================================================================
//!
//! purpose:
//!     turn the latest reading of each signal into (a) the list of
//!     violations to show and (b) the single command the lamp should run.
//!
//! rules:
//!     - all three signals must have a usable latest reading, otherwise the
//!       tick is skipped and the lamp keeps whatever it was last told
//!     - a reading is nominal only strictly inside (min, max)
//!     - signals are checked temperature → humidity → luminosity; the first
//!       violation claims the blink command, later ones only add messages
//!
//! ==============================================================================

use std::fmt;

use crate::domain::{Command, Sample, Signal, Thresholds};

/// latest sample per signal, `None` when the store had nothing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatestReadings {
    pub temperature: Option<Sample>,
    pub humidity: Option<Sample>,
    pub luminosity: Option<Sample>,
}

impl LatestReadings {
    pub fn get(&self, signal: Signal) -> Option<&Sample> {
        match signal {
            Signal::Temperature => self.temperature.as_ref(),
            Signal::Humidity => self.humidity.as_ref(),
            Signal::Luminosity => self.luminosity.as_ref(),
        }
    }

    pub fn set(&mut self, signal: Signal, sample: Option<Sample>) {
        match signal {
            Signal::Temperature => self.temperature = sample,
            Signal::Humidity => self.humidity = sample,
            Signal::Luminosity => self.luminosity = sample,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Violation {
    pub signal: Signal,
    pub value: f64,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} out of range ({})", self.signal, self.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// at least one signal had no usable reading; nothing was decided
    Skipped { missing: Vec<Signal> },
    Evaluated { violations: Vec<Violation>, command: Command },
}

impl Evaluation {
    pub fn command(&self) -> Option<Command> {
        match self {
            Evaluation::Skipped { .. } => None,
            Evaluation::Evaluated { command, .. } => Some(*command),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        match self {
            Evaluation::Skipped { .. } => Vec::new(),
            Evaluation::Evaluated { violations, .. } => {
                violations.iter().map(ToString::to_string).collect()
            }
        }
    }
}

pub fn evaluate(latest: &LatestReadings, bands: &Thresholds) -> Evaluation {
    let mut values = Vec::with_capacity(Signal::PRIORITY.len());
    let mut missing = Vec::new();

    for signal in Signal::PRIORITY {
        let coerced = latest.get(signal).map(|sample| signal.coerce(&sample.value));
        match coerced {
            Some(Ok(value)) => values.push((signal, value)),
            Some(Err(e)) => {
                tracing::warn!("latest {} unusable: {}", signal, e);
                missing.push(signal);
            }
            None => missing.push(signal),
        }
    }

    if !missing.is_empty() {
        return Evaluation::Skipped { missing };
    }

    let mut command = Command::TurnOff;
    let mut violations = Vec::new();

    for (signal, value) in values {
        if bands.band(signal).contains(value) {
            continue;
        }
        violations.push(Violation { signal, value });
        if command == Command::TurnOff {
            command = signal.blink_command();
        }
    }

    Evaluation::Evaluated { violations, command }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ThresholdBand;

    fn readings(temp: &str, hum: &str, lum: &str) -> LatestReadings {
        let at = "2024-05-01T12:00:00Z";
        LatestReadings {
            temperature: Some(Sample::new(temp, at)),
            humidity: Some(Sample::new(hum, at)),
            luminosity: Some(Sample::new(lum, at)),
        }
    }

    #[test]
    fn all_nominal_turns_off() {
        let eval = evaluate(&readings("15", "65", "5"), &Thresholds::default());
        assert_eq!(eval, Evaluation::Evaluated { violations: vec![], command: Command::TurnOff });
        assert!(eval.messages().is_empty());
    }

    #[test]
    fn hot_reading_blinks_temperature() {
        let eval = evaluate(&readings("19.5", "65", "5"), &Thresholds::default());
        assert_eq!(eval.command(), Some(Command::BlinkTemperature));
        assert_eq!(eval.messages(), vec!["temperature out of range (19.5)".to_string()]);
    }

    #[test]
    fn temperature_outranks_humidity() {
        let eval = evaluate(&readings("25", "90", "5"), &Thresholds::default());
        assert_eq!(eval.command(), Some(Command::BlinkTemperature));
        assert_eq!(
            eval.messages(),
            vec!["temperature out of range (25)", "humidity out of range (90)"]
        );
    }

    #[test]
    fn humidity_outranks_luminosity() {
        let eval = evaluate(&readings("15", "40", "12"), &Thresholds::default());
        assert_eq!(eval.command(), Some(Command::BlinkHumidity));
        assert_eq!(eval.messages().len(), 2);
    }

    #[test]
    fn luminosity_alone_blinks_luminosity() {
        let eval = evaluate(&readings("15", "65", "10"), &Thresholds::default());
        assert_eq!(eval.command(), Some(Command::BlinkLuminosity));
        assert_eq!(eval.messages(), vec!["luminosity out of range (10)"]);
    }

    #[test]
    fn bounds_are_violations() {
        let bands = Thresholds::default();
        for temp in ["10", "18"] {
            let eval = evaluate(&readings(temp, "65", "5"), &bands);
            assert_eq!(eval.command(), Some(Command::BlinkTemperature), "temp {temp}");
        }
        let eval = evaluate(&readings("10.01", "65", "5"), &bands);
        assert_eq!(eval.command(), Some(Command::TurnOff));
    }

    #[test]
    fn absent_luminosity_skips_even_when_temperature_is_out() {
        let mut latest = readings("40", "65", "5");
        latest.luminosity = None;
        let eval = evaluate(&latest, &Thresholds::default());
        assert_eq!(eval, Evaluation::Skipped { missing: vec![Signal::Luminosity] });
        assert_eq!(eval.command(), None);
        assert!(eval.messages().is_empty());
    }

    #[test]
    fn unparseable_reading_counts_as_missing() {
        let eval = evaluate(&readings("15", "wet", "5"), &Thresholds::default());
        assert_eq!(eval, Evaluation::Skipped { missing: vec![Signal::Humidity] });
    }

    #[test]
    fn nan_reading_is_a_violation_not_an_absence() {
        let eval = evaluate(&readings("NaN", "65", "5"), &Thresholds::default());
        assert_eq!(eval.command(), Some(Command::BlinkTemperature));
        assert_eq!(eval.messages(), vec!["temperature out of range (NaN)"]);

        let eval = evaluate(&readings("15", "NaN", "5"), &Thresholds::default());
        assert_eq!(eval.command(), Some(Command::BlinkHumidity));
    }

    #[test]
    fn custom_bands_are_respected() {
        let bands = Thresholds {
            temperature: ThresholdBand::new(0.0, 100.0),
            ..Thresholds::default()
        };
        let eval = evaluate(&readings("40", "65", "5"), &bands);
        assert_eq!(eval.command(), Some(Command::TurnOff));
    }
}
