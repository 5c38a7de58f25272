//! Status composition for `GET /stress/status`.

use std::sync::Arc;

use fls_common::types::StressStatus;
use fls_telemetry::CpuSample;

use crate::identity::IdentityResolver;
use crate::stress::StressPool;

/// Builds the point-in-time status record served to the console.
pub struct StatusReporter {
    pool: Arc<StressPool>,
    identity: Arc<IdentityResolver>,
}

impl StatusReporter {
    pub fn new(pool: Arc<StressPool>, identity: Arc<IdentityResolver>) -> Self {
        Self { pool, identity }
    }

    /// Compose a fresh status record.
    ///
    /// The CPU sample is taken anew on every call; the pool count is a
    /// lock-free read; the identity round-trip happens at most once per
    /// process.
    pub async fn report(&self) -> StressStatus {
        let cpu = CpuSample::collect();
        let instance_id = self.identity.resolve().await;
        let workers = self.pool.worker_count();

        StressStatus {
            instance_id,
            running: workers > 0,
            workers,
            cpu: cpu.utilization_percent,
            cores: cpu.cores,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fls_common::types::LOCAL_SENTINEL_ID;
    use std::time::Duration;

    fn test_reporter() -> (Arc<StressPool>, StatusReporter) {
        let pool = Arc::new(StressPool::new(Duration::from_millis(500)));
        // Unreachable metadata endpoint: identity degrades to the sentinel.
        let identity = Arc::new(IdentityResolver::with_base_url("http://127.0.0.1:9").unwrap());
        (pool.clone(), StatusReporter::new(pool, identity))
    }

    #[tokio::test]
    async fn test_report_on_idle_pool() {
        let (_pool, reporter) = test_reporter();

        let status = reporter.report().await;
        assert_eq!(status.instance_id.as_str(), LOCAL_SENTINEL_ID);
        assert!(!status.running);
        assert_eq!(status.workers, 0);
        assert!(status.cpu >= 0.0 && status.cpu <= 100.0);
        assert!(status.cores >= 1);
    }

    #[tokio::test]
    async fn test_report_tracks_pool_state() {
        let (pool, reporter) = test_reporter();

        pool.start(3).await.unwrap();
        let status = reporter.report().await;
        assert!(status.running);
        assert_eq!(status.workers, 3);

        pool.stop().await;
        let status = reporter.report().await;
        assert!(!status.running);
        assert_eq!(status.workers, 0);
    }
}
