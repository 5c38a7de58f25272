//! OS-level telemetry collectors for FLS instances.

pub mod collect;

pub use collect::cpu::{CpuSample, CpuStats, num_cores};
