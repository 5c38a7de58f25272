//! Common types used across FLS components.

use serde::{Deserialize, Serialize};

/// Identity of one service instance in the fleet.
///
/// Resolved once per process lifetime from the cloud metadata service and
/// cached; the [`LOCAL_SENTINEL_ID`] sentinel stands in when no metadata
/// service is reachable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub String);

impl InstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fallback identity used when metadata resolution fails or times out.
pub const LOCAL_SENTINEL_ID: &str = "local-dev";

/// Point-in-time status of one instance, as served by `GET /stress/status`.
///
/// Always recomputed at request time; `running` is exactly `workers > 0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressStatus {
    pub instance_id: InstanceId,
    pub running: bool,
    pub workers: usize,
    /// Instantaneous CPU utilization percentage, within [0, 100].
    pub cpu: f64,
    /// Logical core count of the host.
    pub cores: u32,
}

/// Body of `POST /stress/start`. The body itself is optional on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartRequest {
    /// Worker count to spawn. Absent means the instance's core count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<u32>,
}

/// Response of `POST /stress/start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResponse {
    pub message: String,
    pub workers: usize,
}

/// Response of `POST /stress/stop`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopResponse {
    pub message: String,
}

/// One instance found by tag-based fleet discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredInstance {
    pub instance_id: InstanceId,
    pub private_address: Option<String>,
    pub public_address: Option<String>,
    pub state: String,
}

/// Response of `GET /stress/instances`.
///
/// Discovery is advisory: an API failure is reported through `error` with an
/// empty instance list rather than a failed request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstancesResponse {
    pub instances: Vec<DiscoveredInstance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_id_display_and_accessors() {
        let id = InstanceId::new("i-0abc123");
        assert_eq!(id.as_str(), "i-0abc123");
        assert_eq!(id.to_string(), "i-0abc123");
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let status = StressStatus {
            instance_id: InstanceId::new("i-0abc123"),
            running: true,
            workers: 4,
            cpu: 87.0,
            cores: 8,
        };

        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["instanceId"], "i-0abc123");
        assert_eq!(value["running"], true);
        assert_eq!(value["workers"], 4);
        assert_eq!(value["cpu"], 87.0);
        assert_eq!(value["cores"], 8);
    }

    #[test]
    fn test_start_request_empty_body() {
        let request: StartRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.workers, None);

        let request: StartRequest = serde_json::from_str(r#"{"workers":4}"#).unwrap();
        assert_eq!(request.workers, Some(4));
    }

    #[test]
    fn test_instances_response_error_shape() {
        let response = InstancesResponse {
            instances: vec![],
            error: Some("inventory query failed".to_string()),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["error"], "inventory query failed");
        assert!(value["instances"].as_array().unwrap().is_empty());

        // The error key is omitted entirely on success.
        let ok = InstancesResponse::default();
        let value = serde_json::to_value(&ok).unwrap();
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_discovered_instance_camel_case() {
        let instance = DiscoveredInstance {
            instance_id: InstanceId::new("i-0abc123"),
            private_address: Some("10.0.0.5".to_string()),
            public_address: None,
            state: "running".to_string(),
        };
        let value = serde_json::to_value(&instance).unwrap();
        assert_eq!(value["instanceId"], "i-0abc123");
        assert_eq!(value["privateAddress"], "10.0.0.5");
        assert!(value["publicAddress"].is_null());
        assert_eq!(value["state"], "running");
    }
}
