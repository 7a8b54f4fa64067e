//! ==============================================================================
//! poll.rs - the sampling / evaluation / dispatch loop
//! ==============================================================================
//!
//! purpose:
//!     one tick, on a fixed wall-clock interval:
//!
//! ```text
//!   fetch latest (lastN=1) ──▶ evaluate ──▶ dispatch (only on change)
//!   fetch history (lastN=50) ──▶ prepare series ──▶ publish RenderPayload
//! ```
//!
//! the actuator and the dashboard are independent sinks of the same tick.
//!
//! scheduling:
//!     tokio interval with MissedTickBehavior::Skip. a tick always runs to
//!     completion before the next one starts; a slow tick makes the loop drop
//!     the missed slots instead of bursting to catch up.
//!
//! relationships:
//!     - uses: store.rs, evaluator.rs, dispatcher.rs, series.rs
//!     - writes: AppState (read by server.rs)
//!
//! ==============================================================================

use std::future::Future;
use std::sync::Arc;

use chrono_tz::Tz;
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;

use crate::config::PollingConfig;
use crate::dispatcher::{Actuator, CommandDispatcher, DispatchOutcome};
use crate::domain::{AlertSeverity, AppState, RenderPayload, Sample, SeriesSet, Signal, Thresholds};
use crate::evaluator::{self, Evaluation, LatestReadings};
use crate::series;
use crate::store::SampleStore;
use crate::timezone;

/// what one tick did, for logging and tests
#[derive(Debug, Clone)]
pub struct TickReport {
    pub evaluation: Evaluation,
    /// None when evaluation was skipped and nothing was dispatched
    pub dispatch: Option<DispatchOutcome>,
    pub payload: RenderPayload,
}

pub struct PollLoop<S, A> {
    store: S,
    dispatcher: CommandDispatcher<A>,
    thresholds: Thresholds,
    polling: PollingConfig,
    zone: Tz,
    show_sensor_data: bool,
    state: Arc<RwLock<AppState>>,
}

impl<S: SampleStore, A: Actuator> PollLoop<S, A> {
    pub fn new(
        store: S,
        dispatcher: CommandDispatcher<A>,
        thresholds: Thresholds,
        polling: PollingConfig,
        zone: Tz,
        state: Arc<RwLock<AppState>>,
    ) -> Self {
        Self { store, dispatcher, thresholds, polling, zone, show_sensor_data: false, state }
    }

    pub fn show_sensor_data(mut self, show: bool) -> Self {
        self.show_sensor_data = show;
        self
    }

    pub fn dispatcher(&self) -> &CommandDispatcher<A> {
        &self.dispatcher
    }

    /// tick forever on the configured interval until `shutdown` resolves
    pub async fn run_until<F: Future<Output = ()>>(&mut self, shutdown: F) {
        let mut interval = tokio::time::interval(self.polling.interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        tracing::info!("[RUNTIME] Starting sensor polling ({}s interval)", self.polling.interval_seconds);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("[RUNTIME] Poll loop stopping");
                    return;
                }
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    /// one full fetch → evaluate → dispatch → render cycle
    pub async fn tick(&mut self) -> TickReport {
        let latest = self.fetch_latest().await;
        if self.show_sensor_data {
            log_readings(&latest);
        }

        let evaluation = evaluator::evaluate(&latest, &self.thresholds);
        let dispatch = match evaluation.command() {
            Some(command) => Some(self.dispatcher.dispatch(command).await),
            None => {
                if let Evaluation::Skipped { missing } = &evaluation {
                    tracing::info!("[EVAL] Skipped, no reading for {:?}", missing);
                }
                None
            }
        };

        let alert_text = evaluation.messages();
        for message in &alert_text {
            tracing::warn!("[ALERT] {}", message);
        }
        let alert_severity = if alert_text.is_empty() {
            AlertSeverity::Nominal
        } else {
            AlertSeverity::Violation
        };

        let payload = RenderPayload {
            series: self.fetch_history().await,
            alert_text,
            alert_severity,
            evaluated: matches!(evaluation, Evaluation::Evaluated { .. }),
        };

        self.publish(&payload).await;

        TickReport { evaluation, dispatch, payload }
    }

    async fn fetch_latest(&self) -> LatestReadings {
        let count = self.polling.latest_count;
        let (temperature, humidity, luminosity) = tokio::join!(
            self.store.fetch_latest(Signal::Temperature, count),
            self.store.fetch_latest(Signal::Humidity, count),
            self.store.fetch_latest(Signal::Luminosity, count),
        );

        let mut latest = LatestReadings::default();
        latest.set(Signal::Temperature, pick_latest(temperature));
        latest.set(Signal::Humidity, pick_latest(humidity));
        latest.set(Signal::Luminosity, pick_latest(luminosity));
        latest
    }

    async fn fetch_history(&self) -> SeriesSet {
        let count = self.polling.history_size;
        let (temperature, humidity, luminosity) = tokio::join!(
            self.store.fetch_latest(Signal::Temperature, count),
            self.store.fetch_latest(Signal::Humidity, count),
            self.store.fetch_latest(Signal::Luminosity, count),
        );

        SeriesSet {
            temperature: series::prepare(&temperature, self.zone),
            humidity: series::prepare(&humidity, self.zone),
            luminosity: series::prepare(&luminosity, self.zone),
        }
    }

    async fn publish(&self, payload: &RenderPayload) {
        let mut guard = self.state.write().await;
        guard.payload = payload.clone();
        guard.last_update = chrono::Utc::now().timestamp_millis().max(0) as u64;
        guard.ticks += 1;
    }
}

/// most recent sample by receipt time. with lastN=1 that is the only one;
/// unparseable times lose to parseable ones, and the first entry wins ties.
pub fn pick_latest(samples: Vec<Sample>) -> Option<Sample> {
    let mut best: Option<(Option<chrono::DateTime<chrono::Utc>>, Sample)> = None;

    for sample in samples {
        let at = timezone::parse_utc(&sample.received_at).ok();
        let newer = match &best {
            None => true,
            Some((best_at, _)) => at > *best_at,
        };
        if newer {
            best = Some((at, sample));
        }
    }

    best.map(|(_, sample)| sample)
}

fn log_readings(latest: &LatestReadings) {
    let show = |signal: Signal| {
        latest
            .get(signal)
            .map(|s| s.value.to_string())
            .unwrap_or_else(|| "-".to_string())
    };
    tracing::info!(
        "[STH] Temp: {} | Humidity: {} | Luminosity: {}",
        show(Signal::Temperature),
        show(Signal::Humidity),
        show(Signal::Luminosity)
    );
}
