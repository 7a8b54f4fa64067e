//! Test doubles for the store and the lamp.
//!
//! `MockStore` behaves like STH `lastN`: it keeps a full series per signal
//! and hands back the newest `count` entries. `RecordingActuator` records
//! every command that reached the "device" so tests can count sends.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono_tz::America::Sao_Paulo;
use tokio::sync::RwLock;

use vinheria_monitor::config::PollingConfig;
use vinheria_monitor::dispatcher::{Actuator, AlertState, CommandDispatcher};
use vinheria_monitor::domain::{AppState, Command, Sample, Signal, Thresholds};
use vinheria_monitor::error::{MonitorError, Result};
use vinheria_monitor::poll::PollLoop;
use vinheria_monitor::store::SampleStore;

// ── MockStore ─────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockStore {
    series: Arc<Mutex<HashMap<Signal, Vec<Sample>>>>,
    pub fetches: Arc<AtomicUsize>,
}

impl MockStore {
    pub fn set(&self, signal: Signal, samples: Vec<Sample>) {
        self.series.lock().unwrap().insert(signal, samples);
    }

    pub fn clear(&self, signal: Signal) {
        self.series.lock().unwrap().remove(&signal);
    }

    /// one reading per signal, all at the same instant
    pub fn set_readings(&self, temp: &str, hum: &str, lum: &str, at: &str) {
        self.set(Signal::Temperature, vec![Sample::new(temp, at)]);
        self.set(Signal::Humidity, vec![Sample::new(hum, at)]);
        self.set(Signal::Luminosity, vec![Sample::new(lum, at)]);
    }
}

impl SampleStore for MockStore {
    async fn fetch_latest(&self, signal: Signal, count: u32) -> Vec<Sample> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let guard = self.series.lock().unwrap();
        let all = guard.get(&signal).cloned().unwrap_or_default();
        let skip = all.len().saturating_sub(count as usize);
        all.into_iter().skip(skip).collect()
    }
}

// ── RecordingActuator ─────────────────────────────────────────

#[derive(Clone, Default)]
pub struct RecordingActuator {
    pub sent: Arc<Mutex<Vec<Command>>>,
    pub attempts: Arc<AtomicUsize>,
    pub fail: Arc<AtomicBool>,
}

impl RecordingActuator {
    pub fn sent(&self) -> Vec<Command> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }
}

impl Actuator for RecordingActuator {
    async fn send(&self, command: Command) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(MonitorError::Status { status: 503, url: "mock://orion".into() });
        }
        self.sent.lock().unwrap().push(command);
        Ok(())
    }
}

// ── harness ───────────────────────────────────────────────────

pub struct Harness {
    pub store: MockStore,
    pub actuator: RecordingActuator,
    pub state: Arc<RwLock<AppState>>,
    pub poll: PollLoop<MockStore, RecordingActuator>,
}

pub fn harness() -> Harness {
    harness_with(Thresholds::default())
}

pub fn harness_with(thresholds: Thresholds) -> Harness {
    let store = MockStore::default();
    let actuator = RecordingActuator::default();
    let state = Arc::new(RwLock::new(AppState::default()));
    let poll = PollLoop::new(
        store.clone(),
        CommandDispatcher::new(actuator.clone(), AlertState::new()),
        thresholds,
        PollingConfig::default(),
        Sao_Paulo,
        state.clone(),
    );
    Harness { store, actuator, state, poll }
}
