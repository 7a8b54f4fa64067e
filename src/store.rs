//! ==============================================================================
//! store.rs - STH-Comet history client
//! ==============================================================================
//!
//! purpose:
//!     fetch the last N raw samples of one attribute of the monitored entity.
//!
//! fail-soft contract:
//!     callers always get a Vec. transport errors, timeouts, non-200 answers
//!     and bodies without the expected json path all come back empty and are
//!     logged. a store outage degrades the dashboard, it never stops the
//!     poll loop. no retries here: the next tick is the retry.
//!
//! wire format (GET .../attributes/{attr}?lastN=N):
//!
//! ```text
//! { "contextResponses": [ { "contextElement": { "attributes": [
//!     { "name": "temperature", "values": [
//!         { "recvTime": "2024-05-01T12:00:00.000Z", "attrValue": "21.3" } ] } ] } } ] }
//! ```
//!
//! relationships:
//!     - used by: poll.rs (latest + history fetches)
//!     - seam: SampleStore trait, so tests swap in an in-memory store
//!
//! ==============================================================================

use std::future::Future;

use serde::Deserialize;

use crate::config::{DeviceConfig, StoreConfig};
use crate::domain::{Sample, Signal};
use crate::error::{MonitorError, Result};

/// anything that can hand back raw samples for a signal
pub trait SampleStore: Send + Sync {
    /// up to `count` most recent samples, in store order. empty on failure.
    fn fetch_latest(&self, signal: Signal, count: u32) -> impl Future<Output = Vec<Sample>> + Send;
}

/// one http client for the whole process; both the store and the actuator
/// share its connection pool and timeout
pub fn build_http_client(store: &StoreConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder().timeout(store.timeout()).build()?;
    Ok(client)
}

// ==============================================================================
// response schema
// ==============================================================================

#[derive(Debug, Deserialize)]
struct SthResponse {
    #[serde(rename = "contextResponses")]
    context_responses: Vec<ContextResponse>,
}

#[derive(Debug, Deserialize)]
struct ContextResponse {
    #[serde(rename = "contextElement")]
    context_element: ContextElement,
}

#[derive(Debug, Deserialize)]
struct ContextElement {
    attributes: Vec<AttributeHistory>,
}

#[derive(Debug, Deserialize)]
struct AttributeHistory {
    values: Vec<Sample>,
}

/// pull `contextResponses[0].contextElement.attributes[0].values` out of a body
pub fn parse_history(body: &str) -> Result<Vec<Sample>> {
    let response: SthResponse = serde_json::from_str(body)
        .map_err(|e| MonitorError::MalformedResponse(e.to_string()))?;

    response
        .context_responses
        .into_iter()
        .next()
        .and_then(|r| r.context_element.attributes.into_iter().next())
        .map(|a| a.values)
        .ok_or_else(|| MonitorError::MalformedResponse("no attribute history in response".into()))
}

// ==============================================================================
// http implementation
// ==============================================================================

#[derive(Clone)]
pub struct StoreClient {
    http: reqwest::Client,
    store: StoreConfig,
    device: DeviceConfig,
}

impl StoreClient {
    pub fn new(http: reqwest::Client, store: StoreConfig, device: DeviceConfig) -> Self {
        Self { http, store, device }
    }

    pub fn attribute_url(&self, signal: Signal) -> String {
        format!(
            "{}/STH/v1/contextEntities/type/{}/id/{}/attributes/{}",
            self.store.sth_url.trim_end_matches('/'),
            self.device.entity_type,
            self.device.entity_id,
            signal.attribute()
        )
    }

    async fn try_fetch(&self, signal: Signal, count: u32) -> Result<Vec<Sample>> {
        let url = self.attribute_url(signal);
        let response = self
            .http
            .get(&url)
            .query(&[("lastN", count)])
            .header("fiware-service", &self.store.fiware_service)
            .header("fiware-servicepath", &self.store.fiware_service_path)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(MonitorError::Status { status: status.as_u16(), url });
        }

        let body = response.text().await?;
        parse_history(&body)
    }
}

impl SampleStore for StoreClient {
    async fn fetch_latest(&self, signal: Signal, count: u32) -> Vec<Sample> {
        match self.try_fetch(signal, count).await {
            Ok(samples) => {
                tracing::debug!("[STH] {} lastN={} -> {} samples", signal, count, samples.len());
                samples
            }
            Err(e) => {
                tracing::warn!("[STH] ⚠ {} fetch failed: {}", signal, e);
                Vec::new()
            }
        }
    }
}
