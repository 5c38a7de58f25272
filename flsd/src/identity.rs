//! Instance identity resolution via the cloud metadata service.
//!
//! IMDSv2 two-step: fetch a short-lived token, then the instance id, each
//! with a one second timeout. The first outcome, success or sentinel
//! fallback, is cached for the life of the process and never retried.

use std::time::Duration;

use fls_common::types::{InstanceId, LOCAL_SENTINEL_ID};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

const METADATA_BASE_URL: &str = "http://169.254.169.254";
const METADATA_TIMEOUT: Duration = Duration::from_secs(1);
const TOKEN_TTL_SECONDS: &str = "21600";

/// Errors that can occur during identity resolution.
#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("metadata request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("metadata service returned an empty instance id")]
    EmptyId,
}

/// Resolves and caches this instance's cloud identity.
pub struct IdentityResolver {
    client: reqwest::Client,
    base_url: String,
    cached: OnceCell<InstanceId>,
}

impl IdentityResolver {
    /// Resolver against the real metadata endpoint.
    pub fn new() -> Result<Self, IdentityError> {
        Self::with_base_url(METADATA_BASE_URL)
    }

    /// Resolver against an alternate endpoint (tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(METADATA_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            cached: OnceCell::new(),
        })
    }

    /// Resolve this instance's identity.
    ///
    /// The first call performs the metadata round-trip; every later call,
    /// and every concurrent call during the first, reuses its outcome. A
    /// failed resolution caches the sentinel: recovery is a process
    /// restart, not a retry.
    pub async fn resolve(&self) -> InstanceId {
        self.cached
            .get_or_init(|| async {
                match self.fetch().await {
                    Ok(id) => {
                        debug!(instance_id = %id, "instance identity resolved");
                        id
                    }
                    Err(e) => {
                        warn!("instance identity unavailable, using sentinel: {}", e);
                        InstanceId::new(LOCAL_SENTINEL_ID)
                    }
                }
            })
            .await
            .clone()
    }

    async fn fetch(&self) -> Result<InstanceId, IdentityError> {
        let token = self
            .client
            .put(format!("{}/latest/api/token", self.base_url))
            .header("X-aws-ec2-metadata-token-ttl-seconds", TOKEN_TTL_SECONDS)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let id = self
            .client
            .get(format!("{}/latest/meta-data/instance-id", self.base_url))
            .header("X-aws-ec2-metadata-token", token.trim())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let id = id.trim();
        if id.is_empty() {
            return Err(IdentityError::EmptyId);
        }
        Ok(InstanceId::new(id))
    }
}
