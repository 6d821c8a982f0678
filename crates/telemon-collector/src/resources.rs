use crate::memory::usage_percent;
use anyhow::Result;
use parking_lot::Mutex;
use serde::Serialize;
use sysinfo::System;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

/// Point-in-time resource usage of the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceSnapshot {
    pub memory_used_bytes: u64,
    pub memory_total_bytes: u64,
    pub memory_percent: f64,
    pub cpu_percent: f64,
    pub cpu_count: usize,
    pub load_average: LoadAverage,
    pub uptime_secs: u64,
}

/// Source of memory, CPU and load readings for health probes.
pub trait ResourceSource: Send + Sync {
    fn snapshot(&self) -> Result<ResourceSnapshot>;
}

/// [`ResourceSource`] backed by `sysinfo`.
pub struct SystemResources {
    system: Mutex<System>,
}

impl SystemResources {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_all();
        Self {
            system: Mutex::new(system),
        }
    }
}

impl Default for SystemResources {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceSource for SystemResources {
    fn snapshot(&self) -> Result<ResourceSnapshot> {
        let mut system = self.system.lock();
        system.refresh_memory();
        system.refresh_cpu_all();

        let total = system.total_memory();
        let used = system.used_memory();
        let load = System::load_average();

        Ok(ResourceSnapshot {
            memory_used_bytes: used,
            memory_total_bytes: total,
            memory_percent: usage_percent(used, total),
            cpu_percent: f64::from(system.global_cpu_usage()).clamp(0.0, 100.0),
            cpu_count: system.cpus().len(),
            load_average: LoadAverage {
                one: load.one,
                five: load.five,
                fifteen: load.fifteen,
            },
            uptime_secs: System::uptime(),
        })
    }
}
