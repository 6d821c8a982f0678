pub mod cpu;
pub mod database;
pub mod dependencies;
pub mod disk;
pub mod memory;

pub use cpu::CpuProbe;
pub use database::DatabaseProbe;
pub use dependencies::{DependenciesProbe, EnvIntegrations};
pub use disk::DiskProbe;
pub use memory::MemoryProbe;

use telemon_common::types::HealthStatus;

pub const DATABASE: &str = "database";
pub const MEMORY: &str = "memory";
pub const CPU: &str = "cpu";
pub const DISK: &str = "disk";
pub const DEPENDENCIES: &str = "dependencies";

/// Grade a usage percent: critical above `threshold`, warning above
/// `threshold * warning_ratio`.
pub fn grade_usage(value: f64, threshold: f64, warning_ratio: f64) -> HealthStatus {
    if value > threshold {
        HealthStatus::Critical
    } else if value > threshold * warning_ratio {
        HealthStatus::Warning
    } else {
        HealthStatus::Healthy
    }
}
