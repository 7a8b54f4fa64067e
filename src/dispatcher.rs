//! ==============================================================================
//! dispatcher.rs - deduplicated lamp commands
//! ==============================================================================
//!
//! purpose:
//!     send the evaluated command to the lamp through Orion, but only when it
//!     differs from the last command that was confirmed. the lamp never gets
//!     the same command twice in a row, however often the loop ticks.
//!
//! state:
//!     AlertState is an explicit object handed to the dispatcher at
//!     construction. it starts empty (nothing sent yet), moves only after a
//!     confirmed send, and is never reset. a failed send leaves it alone so
//!     the next tick tries again.
//!
//! concurrency:
//!     dispatch takes &mut self. whoever owns the dispatcher owns the
//!     ordering of dispatch decisions; two ticks cannot interleave.
//!
//! ==============================================================================

use std::future::Future;

use serde_json::json;

use crate::config::{DeviceConfig, StoreConfig};
use crate::domain::Command;
use crate::error::{MonitorError, Result};

/// anything that can deliver a command to the device
pub trait Actuator: Send + Sync {
    /// Ok only when delivery is confirmed
    fn send(&self, command: Command) -> impl Future<Output = Result<()>> + Send;
}

/// last command the device is known to have received
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertState {
    last_sent: Option<Command>,
}

impl AlertState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_sent(&self) -> Option<Command> {
        self.last_sent
    }

    fn record(&mut self, command: Command) {
        self.last_sent = Some(command);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// same as last confirmed command, nothing sent
    Unchanged,
    Sent,
    /// send attempted and not confirmed; state untouched
    Failed,
}

pub struct CommandDispatcher<A> {
    actuator: A,
    state: AlertState,
}

impl<A: Actuator> CommandDispatcher<A> {
    pub fn new(actuator: A, state: AlertState) -> Self {
        Self { actuator, state }
    }

    pub fn state(&self) -> &AlertState {
        &self.state
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub async fn dispatch(&mut self, command: Command) -> DispatchOutcome {
        if self.state.last_sent() == Some(command) {
            return DispatchOutcome::Unchanged;
        }

        match self.actuator.send(command).await {
            Ok(()) => {
                tracing::info!("[LAMP] ✓ Command '{}' sent", command);
                self.state.record(command);
                DispatchOutcome::Sent
            }
            Err(e) => {
                tracing::warn!("[LAMP] ⚠ Command '{}' not confirmed: {}", command, e);
                DispatchOutcome::Failed
            }
        }
    }
}

// ==============================================================================
// orion implementation
// ==============================================================================

/// PATCH /v2/entities/{id}/attrs on the context broker
#[derive(Clone)]
pub struct OrionActuator {
    http: reqwest::Client,
    store: StoreConfig,
    device: DeviceConfig,
}

impl OrionActuator {
    pub fn new(http: reqwest::Client, store: StoreConfig, device: DeviceConfig) -> Self {
        Self { http, store, device }
    }

    pub fn attrs_url(&self) -> String {
        format!(
            "{}/v2/entities/{}/attrs",
            self.store.orion_url.trim_end_matches('/'),
            self.device.entity_id
        )
    }

    /// `{ "<attr>": { "type": "command", "value": "<wire name>" } }`
    pub fn payload(&self, command: Command) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        body.insert(
            self.device.command_attribute.clone(),
            json!({ "type": "command", "value": command }),
        );
        serde_json::Value::Object(body)
    }
}

impl Actuator for OrionActuator {
    async fn send(&self, command: Command) -> Result<()> {
        let url = self.attrs_url();
        let response = self
            .http
            .patch(&url)
            .header("fiware-service", &self.store.fiware_service)
            .header("fiware-servicepath", &self.store.fiware_service_path)
            .json(&self.payload(command))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MonitorError::Status { status: status.as_u16(), url });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<Command>>,
        fail: AtomicBool,
    }

    impl Actuator for Recorder {
        async fn send(&self, command: Command) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(MonitorError::MalformedResponse("link down".into()));
            }
            self.sent.lock().unwrap().push(command);
            Ok(())
        }
    }

    #[tokio::test]
    async fn first_command_is_always_sent() {
        let mut d = CommandDispatcher::new(Recorder::default(), AlertState::new());
        assert_eq!(d.state().last_sent(), None);
        assert_eq!(d.dispatch(Command::TurnOff).await, DispatchOutcome::Sent);
        assert_eq!(d.state().last_sent(), Some(Command::TurnOff));
    }

    #[tokio::test]
    async fn repeated_command_is_suppressed() {
        let mut d = CommandDispatcher::new(Recorder::default(), AlertState::new());
        d.dispatch(Command::BlinkTemperature).await;
        assert_eq!(d.dispatch(Command::BlinkTemperature).await, DispatchOutcome::Unchanged);
        assert_eq!(d.dispatch(Command::TurnOff).await, DispatchOutcome::Sent);
        assert_eq!(
            *d.actuator().sent.lock().unwrap(),
            vec![Command::BlinkTemperature, Command::TurnOff]
        );
    }

    #[tokio::test]
    async fn failed_send_keeps_state_and_retries() {
        let mut d = CommandDispatcher::new(Recorder::default(), AlertState::new());
        d.dispatch(Command::TurnOff).await;

        d.actuator().fail.store(true, Ordering::SeqCst);
        assert_eq!(d.dispatch(Command::BlinkHumidity).await, DispatchOutcome::Failed);
        assert_eq!(d.state().last_sent(), Some(Command::TurnOff));

        d.actuator().fail.store(false, Ordering::SeqCst);
        assert_eq!(d.dispatch(Command::BlinkHumidity).await, DispatchOutcome::Sent);
        assert_eq!(d.state().last_sent(), Some(Command::BlinkHumidity));
    }

    #[test]
    fn orion_payload_uses_command_attribute() {
        let orion = OrionActuator::new(
            reqwest::Client::new(),
            StoreConfig { orion_url: "http://orion:1026".to_string(), ..StoreConfig::default() },
            DeviceConfig::default(),
        );
        assert_eq!(
            orion.payload(Command::BlinkTemperature),
            json!({ "led": { "type": "command", "value": "piscar_temp" } })
        );
        assert_eq!(orion.attrs_url(), "http://orion:1026/v2/entities/urn:ngsi-ld:Lamp:EDGE4/attrs");
    }
}
