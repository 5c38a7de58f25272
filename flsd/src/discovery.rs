//! Best-effort fleet discovery through the cloud inventory API.
//!
//! Discovery is advisory and independent of the status polling path:
//! callers render whatever comes back and treat failures as "no data".

use std::time::Duration;

use aws_sdk_ec2::types::Filter;
use fls_common::config::DiscoveryConfig;
use fls_common::types::{DiscoveredInstance, InstanceId};
use thiserror::Error;
use tracing::debug;

/// Errors from an inventory query.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("inventory query failed: {0}")]
    Query(String),

    #[error("inventory query timed out after {0:?}")]
    Timeout(Duration),
}

/// Queries the inventory API for instances carrying the fleet tag.
pub struct FleetDiscovery {
    client: aws_sdk_ec2::Client,
    tag_key: String,
    tag_value: String,
    timeout: Duration,
}

impl FleetDiscovery {
    /// Build a discovery client from the ambient AWS environment
    /// (credentials and region come from the standard SDK chain).
    pub async fn new(config: &DiscoveryConfig) -> Self {
        let aws_config = aws_config::load_from_env().await;
        Self {
            client: aws_sdk_ec2::Client::new(&aws_config),
            tag_key: config.tag_key.clone(),
            tag_value: config.tag_value.clone(),
            timeout: config.timeout(),
        }
    }

    /// List running instances tagged as part of the fleet.
    pub async fn discover(&self) -> Result<Vec<DiscoveredInstance>, DiscoveryError> {
        let request = self
            .client
            .describe_instances()
            .filters(
                Filter::builder()
                    .name(format!("tag:{}", self.tag_key))
                    .values(&self.tag_value)
                    .build(),
            )
            .filters(
                Filter::builder()
                    .name("instance-state-name")
                    .values("running")
                    .build(),
            )
            .send();

        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| DiscoveryError::Timeout(self.timeout))?
            .map_err(|e| DiscoveryError::Query(e.to_string()))?;

        let mut instances = Vec::new();
        for reservation in response.reservations() {
            for instance in reservation.instances() {
                let Some(id) = instance.instance_id() else {
                    continue;
                };
                instances.push(DiscoveredInstance {
                    instance_id: InstanceId::new(id),
                    private_address: instance.private_ip_address().map(str::to_string),
                    public_address: instance.public_ip_address().map(str::to_string),
                    state: instance
                        .state()
                        .and_then(|s| s.name())
                        .map(|name| name.as_str().to_string())
                        .unwrap_or_else(|| "unknown".to_string()),
                });
            }
        }

        debug!(
            instances = instances.len(),
            tag_key = %self.tag_key,
            tag_value = %self.tag_value,
            "fleet discovery completed"
        );
        Ok(instances)
    }
}
