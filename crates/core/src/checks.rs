//! Advisory preflight and health checks.
//!
//! Nothing in this module ever changes supervisor state: reachability and
//! resource results are logged by the callers and otherwise ignored.

use std::time::Duration;
use sysinfo::{Disks, System};
use tokio::net::TcpStream;

/// Attempt a TCP connection to `host:port` within `limit`.
///
/// The connection is closed immediately on success; reaching the peer is
/// the only information of interest.
pub async fn probe_peer(host: &str, port: u16, limit: Duration) -> std::io::Result<()> {
    let addr = format!("{host}:{port}");
    match tokio::time::timeout(limit, TcpStream::connect(&addr)).await {
        Ok(Ok(_stream)) => Ok(()),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            format!("connect to {addr} timed out after {}s", limit.as_secs()),
        )),
    }
}

/// One snapshot of system resource usage, all values in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceSample {
    pub cpu_pct: f32,
    pub memory_pct: f32,
    pub disk_pct: f32,
}

impl ResourceSample {
    /// The resources whose usage exceeds `threshold`, with their values.
    pub fn exceeding(&self, threshold: f32) -> Vec<(&'static str, f32)> {
        let mut over = Vec::new();
        if self.cpu_pct > threshold {
            over.push(("cpu", self.cpu_pct));
        }
        if self.memory_pct > threshold {
            over.push(("memory", self.memory_pct));
        }
        if self.disk_pct > threshold {
            over.push(("disk", self.disk_pct));
        }
        over
    }
}

/// Sample CPU, memory, and disk usage.
///
/// CPU usage needs two refreshes a minimum interval apart, so this call
/// sleeps briefly in between. Disk usage reports the fullest mounted disk.
pub async fn sample_resources() -> ResourceSample {
    let mut system = System::new();

    system.refresh_cpu_usage();
    tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
    system.refresh_cpu_usage();
    let cpu_pct = system.global_cpu_usage();

    system.refresh_memory();
    let total = system.total_memory();
    let memory_pct = if total == 0 {
        0.0
    } else {
        (system.used_memory() as f32 / total as f32) * 100.0
    };

    let disks = Disks::new_with_refreshed_list();
    let disk_pct = disks
        .iter()
        .filter(|disk| disk.total_space() > 0)
        .map(|disk| {
            let total = disk.total_space() as f32;
            ((total - disk.available_space() as f32) / total) * 100.0
        })
        .fold(0.0_f32, f32::max);

    ResourceSample {
        cpu_pct,
        memory_pct,
        disk_pct,
    }
}
