//! Shared types and configuration for Fleet Load Stress.

pub mod config;
pub mod types;

pub use config::{ConfigError, FlsConfig};
pub use types::{
    DiscoveredInstance, InstanceId, InstancesResponse, LOCAL_SENTINEL_ID, StartRequest,
    StartResponse, StopResponse, StressStatus,
};
