//! CPU sampling from /proc/stat.
//!
//! Reads the kernel's cumulative per-core tick counters to estimate
//! instantaneous utilization for stress status reports.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while reading CPU counters.
#[derive(Error, Debug)]
pub enum CpuError {
    #[error("failed to read /proc/stat: {0}")]
    ReadStat(#[from] std::io::Error),

    #[error("failed to parse /proc/stat: {0}")]
    Parse(String),
}

/// Per-state tick counters for one logical core.
///
/// All values are in jiffies (typically 1/100 second) since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuStats {
    /// Time spent in user mode.
    pub user: u64,
    /// Time spent in user mode with low priority (nice).
    pub nice: u64,
    /// Time spent in system mode.
    pub system: u64,
    /// Time spent idle.
    pub idle: u64,
    /// Time waiting for I/O to complete.
    pub iowait: u64,
    /// Time spent servicing hardware interrupts.
    pub irq: u64,
    /// Time spent servicing software interrupts.
    pub softirq: u64,
    /// Time stolen by other operating systems (virtualization).
    pub steal: u64,
}

impl CpuStats {
    /// Parse a single `cpuN` line from /proc/stat.
    ///
    /// Format: `cpuN user nice system idle iowait irq softirq steal ...`
    fn parse_cpu_line(line: &str) -> Result<Self, CpuError> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        // Minimum required fields: cpuN user nice system idle
        if parts.len() < 5 {
            return Err(CpuError::Parse(format!(
                "cpu line too short: expected at least 5 fields, got {}",
                parts.len()
            )));
        }

        let parse_field =
            |idx: usize| -> u64 { parts.get(idx).and_then(|s| s.parse().ok()).unwrap_or(0) };

        Ok(Self {
            user: parse_field(1),
            nice: parse_field(2),
            system: parse_field(3),
            idle: parse_field(4),
            iowait: parse_field(5),
            irq: parse_field(6),
            softirq: parse_field(7),
            steal: parse_field(8),
        })
    }

    /// Total time across all states.
    pub fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }
}

/// Parse the per-core `cpuN` lines of /proc/stat, sorted by core id.
pub fn parse_per_core(content: &str) -> Result<Vec<CpuStats>, CpuError> {
    let mut cores = Vec::new();

    for line in content.lines() {
        // Per-core lines are "cpu0 ...", "cpu1 ..."; skip the aggregate "cpu " line.
        if line.starts_with("cpu") && !line.starts_with("cpu ") {
            let prefix = line.split_whitespace().next().unwrap_or("");
            if let Some(id_str) = prefix.strip_prefix("cpu") {
                if let Ok(core_id) = id_str.parse::<u32>() {
                    let stats = CpuStats::parse_cpu_line(line)?;
                    cores.push((core_id, stats));
                }
            }
        }
    }

    cores.sort_by_key(|(core_id, _)| *core_id);
    Ok(cores.into_iter().map(|(_, stats)| stats).collect())
}

/// A point-in-time CPU utilization sample.
///
/// Derived from cumulative counters since boot, not a windowed rate. No
/// prior counter state is retained, so callers recompute on every request
/// instead of diffing between calls.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CpuSample {
    /// Utilization percentage, clamped to [0, 100].
    pub utilization_percent: f64,
    /// Number of logical cores observed.
    pub cores: u32,
}

impl CpuSample {
    /// Take a sample.
    ///
    /// Never fails: unreadable or unparsable counters degrade to zero
    /// utilization and the scheduler-reported core count.
    pub fn collect() -> Self {
        match read_proc_stat().and_then(|content| Self::from_proc_stat(&content)) {
            Ok(sample) => sample,
            Err(e) => {
                debug!("cpu sample degraded: {}", e);
                Self {
                    utilization_percent: 0.0,
                    cores: fallback_cores(),
                }
            }
        }
    }

    /// Compute a sample from /proc/stat content.
    ///
    /// Utilization is `100 - trunc(100 * idle / total)` over the per-core
    /// averages; the core-count divisors cancel, so the raw sums are used.
    pub fn from_proc_stat(content: &str) -> Result<Self, CpuError> {
        let cores = parse_per_core(content)?;
        if cores.is_empty() {
            return Err(CpuError::Parse("no per-core cpu lines".to_string()));
        }

        let mut idle_ticks = 0u64;
        let mut total_ticks = 0u64;
        for core in &cores {
            idle_ticks += core.idle;
            total_ticks += core.total();
        }
        if total_ticks == 0 {
            return Err(CpuError::Parse("zero total ticks".to_string()));
        }

        let usage = 100.0 - (100.0 * idle_ticks as f64 / total_ticks as f64).trunc();
        Ok(Self {
            utilization_percent: usage.clamp(0.0, 100.0),
            cores: cores.len() as u32,
        })
    }
}

/// Number of logical cores, from /proc/stat when available.
pub fn num_cores() -> u32 {
    match read_proc_stat().and_then(|content| parse_per_core(&content)) {
        Ok(cores) if !cores.is_empty() => cores.len() as u32,
        _ => fallback_cores(),
    }
}

fn read_proc_stat() -> Result<String, CpuError> {
    Ok(std::fs::read_to_string("/proc/stat")?)
}

fn fallback_cores() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::info;
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    fn init_test_logging() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_test_writer())
            .with(filter)
            .try_init();
    }

    const FOUR_CORE_SAMPLE: &str = r#"cpu  10132153 290696 3084719 46828483 16683 0 25195 0 0 0
cpu0 2503691 72712 771085 11706116 4178 0 6285 0 0 0
cpu1 2536866 73245 770462 11710849 4144 0 6252 0 0 0
cpu2 2530153 72258 771687 11705695 4139 0 6314 0 0 0
cpu3 2561443 72481 771485 11705823 4222 0 6344 0 0 0
intr 4287231 0 0 0
ctxt 1234567
btime 1234567890"#;

    #[test]
    fn test_parse_per_core() {
        init_test_logging();

        let cores = parse_per_core(FOUR_CORE_SAMPLE).expect("parsing should succeed");
        assert_eq!(cores.len(), 4);
        assert_eq!(cores[0].user, 2503691);
        assert_eq!(cores[0].idle, 11706116);
        assert_eq!(cores[3].user, 2561443);
    }

    #[test]
    fn test_parse_skips_aggregate_line() {
        let content = "cpu  100 0 0 100 0 0 0 0\ncpu0 100 0 0 100 0 0 0 0";
        let cores = parse_per_core(content).unwrap();
        assert_eq!(cores.len(), 1);
    }

    #[test]
    fn test_parse_minimal_fields() {
        // Old kernels may expose only the first five columns.
        let cores = parse_per_core("cpu0 100 50 30 500").unwrap();
        assert_eq!(cores.len(), 1);
        assert_eq!(cores[0].idle, 500);
        assert_eq!(cores[0].iowait, 0);
        assert_eq!(cores[0].total(), 680);
    }

    #[test]
    fn test_sample_from_synthetic_counters() {
        init_test_logging();

        // One core: idle 750 of 1000 total -> usage 100 - trunc(75.0) = 25.
        let sample = CpuSample::from_proc_stat("cpu0 150 0 100 750 0 0 0 0").unwrap();
        info!(
            utilization = sample.utilization_percent,
            cores = sample.cores,
            "sample from synthetic counters"
        );
        assert_eq!(sample.cores, 1);
        assert!((sample.utilization_percent - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_sample_truncates_toward_zero() {
        // idle/total = 1/3: 100 * 1/3 = 33.33 truncates to 33, usage 67.
        let sample = CpuSample::from_proc_stat("cpu0 2 0 0 1 0 0 0 0").unwrap();
        assert!((sample.utilization_percent - 67.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_sample_range_extremes() {
        // All idle -> 0%.
        let idle = CpuSample::from_proc_stat("cpu0 0 0 0 1000 0 0 0 0").unwrap();
        assert_eq!(idle.utilization_percent, 0.0);

        // No idle -> 100%.
        let busy = CpuSample::from_proc_stat("cpu0 1000 0 0 0 0 0 0 0").unwrap();
        assert_eq!(busy.utilization_percent, 100.0);
    }

    #[test]
    fn test_sample_counts_cores() {
        let sample = CpuSample::from_proc_stat(FOUR_CORE_SAMPLE).unwrap();
        assert_eq!(sample.cores, 4);
        assert!(sample.utilization_percent >= 0.0);
        assert!(sample.utilization_percent <= 100.0);
    }

    #[test]
    fn test_sample_rejects_empty_content() {
        assert!(CpuSample::from_proc_stat("intr 0\nctxt 0").is_err());
        assert!(CpuSample::from_proc_stat("").is_err());
    }

    #[test]
    fn test_sample_rejects_zero_ticks() {
        assert!(CpuSample::from_proc_stat("cpu0 0 0 0 0 0 0 0 0").is_err());
    }

    #[test]
    fn test_collect_never_fails() {
        init_test_logging();

        // Valid on Linux (real /proc/stat) and elsewhere (degraded fallback).
        let sample = CpuSample::collect();
        info!(
            utilization = sample.utilization_percent,
            cores = sample.cores,
            "collected live sample"
        );
        assert!(sample.utilization_percent >= 0.0);
        assert!(sample.utilization_percent <= 100.0);
        assert!(sample.cores >= 1);
    }

    #[test]
    fn test_num_cores_positive() {
        assert!(num_cores() >= 1);
    }
}
