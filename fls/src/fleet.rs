//! Fleet view aggregation over the shared load-balanced endpoint.
//!
//! No instance can be addressed directly: every request goes to the one
//! logical URL and lands on whichever backend the balancer picks. The view
//! converges by merging poll responses keyed on instance identity.

use std::collections::BTreeMap;
use std::time::Duration;

use fls_common::types::{
    InstanceId, InstancesResponse, StartRequest, StartResponse, StopResponse, StressStatus,
};
use thiserror::Error;
use tracing::debug;

/// Errors from fleet endpoint requests.
#[derive(Error, Debug)]
pub enum FleetError {
    #[error("request to fleet endpoint failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("fleet endpoint rejected the request: {0}")]
    Rejected(String),
}

/// Last-observed status per instance.
///
/// The key set only grows: an instance that stops answering keeps its last
/// known row until the console session ends. Entries are overwritten in
/// arrival order, not by timestamp. Both are deliberate trade-offs of the
/// registry-free design.
#[derive(Debug, Default)]
pub struct FleetView {
    entries: BTreeMap<InstanceId, StressStatus>,
}

impl FleetView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest status for its instance, replacing any previous
    /// entry.
    pub fn observe(&mut self, status: StressStatus) {
        self.entries.insert(status.instance_id.clone(), status);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rows in stable (instance id) order.
    pub fn entries(&self) -> impl Iterator<Item = &StressStatus> {
        self.entries.values()
    }
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Issues status bursts and operator actions against the fleet endpoint.
pub struct FleetPoller {
    client: reqwest::Client,
    endpoint: String,
    burst: usize,
}

impl FleetPoller {
    pub fn new(endpoint: &str, burst: usize) -> Result<Self, FleetError> {
        // A fresh connection per request, so the balancer is free to route
        // every poll to a different backend.
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            burst,
        })
    }

    /// Issue one burst of independent polls and merge the answers into the
    /// view.
    ///
    /// Returns how many polls produced a mergeable status; failed polls are
    /// skipped rather than surfaced.
    pub async fn poll_burst(&self, view: &mut FleetView) -> usize {
        let polls = (0..self.burst).map(|_| self.fetch_status());
        let results = futures::future::join_all(polls).await;

        let mut merged = 0;
        for result in results {
            match result {
                Ok(status) => {
                    view.observe(status);
                    merged += 1;
                }
                Err(e) => debug!("poll skipped: {}", e),
            }
        }
        merged
    }

    async fn fetch_status(&self) -> Result<StressStatus, FleetError> {
        let status = self
            .client
            .get(format!("{}/stress/status", self.endpoint))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(status)
    }

    /// Start the pool on whichever instance answers this request — not
    /// necessarily the one shown in any particular table row.
    pub async fn start(&self, workers: Option<u32>) -> Result<StartResponse, FleetError> {
        let response = self
            .client
            .post(format!("{}/stress/start", self.endpoint))
            .json(&StartRequest { workers })
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::BAD_REQUEST {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let reason = body["error"].as_str().unwrap_or("bad request").to_string();
            return Err(FleetError::Rejected(reason));
        }
        Ok(response.error_for_status()?.json().await?)
    }

    /// Stop the pool on whichever instance answers this request.
    pub async fn stop(&self) -> Result<StopResponse, FleetError> {
        let response = self
            .client
            .post(format!("{}/stress/stop", self.endpoint))
            .send()
            .await?;
        Ok(response.error_for_status()?.json().await?)
    }

    /// Fetch the best-effort discovery listing.
    pub async fn instances(&self) -> Result<InstancesResponse, FleetError> {
        let response = self
            .client
            .get(format!("{}/stress/instances", self.endpoint))
            .send()
            .await?;
        Ok(response.error_for_status()?.json().await?)
    }
}
