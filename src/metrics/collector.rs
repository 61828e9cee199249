//! Platform metrics sources using sysinfo and direct /proc access.

use crate::error::{HealthError, Result};
use crate::metrics::data::{self, Capabilities, RawCpuSample, RawNetworkSample};
use crate::metrics::procfs;
use crate::metrics::traits::MetricsSource;
use std::path::{Path, PathBuf};
use sysinfo::{Disks, System};
use tracing::debug;

/// Mount point whose usage is reported as disk usage.
pub const ROOT_MOUNT_POINT: &str = "/";

/// Synthetic ticks credited per CPU read on platforms without tick counters.
const SYNTHETIC_TICKS_PER_READ: u64 = 1000;

/// Select the metrics source for the host platform.
///
/// Called once at startup; the sampler keeps the returned source for the
/// process lifetime.
pub fn platform_source() -> Box<dyn MetricsSource> {
    #[cfg(target_os = "linux")]
    {
        Box::new(LinuxCollector::new())
    }

    #[cfg(not(target_os = "linux"))]
    {
        Box::new(PortableCollector::new())
    }
}

/// Memory and filesystem tables shared by every source.
struct HostTables {
    system: System,
    disks: Disks,
}

impl HostTables {
    fn new() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        Self {
            system,
            disks: Disks::new_with_refreshed_list(),
        }
    }

    fn memory_percent(&mut self) -> f64 {
        self.system.refresh_memory();
        data::memory_percent(self.system.total_memory(), self.system.available_memory())
    }

    fn disk_percent(&mut self, mount_point: &Path) -> Result<f64> {
        self.disks.refresh();
        if let Some(percent) = self.find_disk(mount_point) {
            return Ok(percent);
        }

        // The filesystem may have been mounted after startup
        self.disks.refresh_list();
        self.find_disk(mount_point)
            .ok_or_else(|| HealthError::filesystem_not_found(mount_point.display().to_string()))
    }

    fn find_disk(&self, mount_point: &Path) -> Option<f64> {
        self.disks
            .list()
            .iter()
            .find(|disk| disk.mount_point() == mount_point)
            .map(|disk| data::disk_percent(disk.total_space(), disk.available_space()))
    }
}

/// Linux source: CPU ticks from `/proc/stat`, network counters from
/// `/proc/net/dev`, memory and disk through sysinfo.
pub struct LinuxCollector {
    tables: HostTables,
    stat_path: PathBuf,
    net_dev_path: PathBuf,
    mount_point: PathBuf,
}

impl LinuxCollector {
    /// Create a collector reading the live procfs tables.
    pub fn new() -> Self {
        Self::with_paths(procfs::PROC_STAT, procfs::PROC_NET_DEV)
    }

    /// Create a collector reading counter tables from custom paths.
    pub fn with_paths(stat_path: impl Into<PathBuf>, net_dev_path: impl Into<PathBuf>) -> Self {
        Self {
            tables: HostTables::new(),
            stat_path: stat_path.into(),
            net_dev_path: net_dev_path.into(),
            mount_point: PathBuf::from(ROOT_MOUNT_POINT),
        }
    }
}

impl Default for LinuxCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSource for LinuxCollector {
    fn name(&self) -> &'static str {
        "linux-procfs"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            disk: true,
            network: true,
        }
    }

    fn read_cpu_ticks(&mut self) -> RawCpuSample {
        procfs::read_cpu_ticks(&self.stat_path).unwrap_or_else(|err| {
            debug!("Failed to read {}: {}", self.stat_path.display(), err);
            RawCpuSample::default()
        })
    }

    fn read_memory_percent(&mut self) -> f64 {
        self.tables.memory_percent()
    }

    fn read_disk_percent(&mut self) -> Result<f64> {
        self.tables.disk_percent(&self.mount_point)
    }

    fn read_network_bytes(&mut self) -> Result<RawNetworkSample> {
        procfs::read_network_bytes(&self.net_dev_path)
    }
}

/// Source for platforms without a readable tick table or interface byte
/// counters.
///
/// CPU usage comes from sysinfo and is converted into synthetic tick counts
/// so the sampler's delta arithmetic applies unchanged. Interface byte
/// counters are a permanent capability gap. Disk usage is unsupported on
/// Windows and reported as `0`.
pub struct PortableCollector {
    tables: HostTables,
    synthetic: RawCpuSample,
    disk_supported: bool,
    mount_point: PathBuf,
}

impl PortableCollector {
    pub fn new() -> Self {
        let mut tables = HostTables::new();
        tables.system.refresh_cpu_usage();
        Self {
            tables,
            synthetic: RawCpuSample::default(),
            disk_supported: !cfg!(windows),
            mount_point: PathBuf::from(ROOT_MOUNT_POINT),
        }
    }
}

impl Default for PortableCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSource for PortableCollector {
    fn name(&self) -> &'static str {
        "sysinfo"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            disk: self.disk_supported,
            network: false,
        }
    }

    fn read_cpu_ticks(&mut self) -> RawCpuSample {
        self.tables.system.refresh_cpu_usage();
        let usage = f64::from(self.tables.system.global_cpu_usage()).clamp(0.0, 100.0);
        let idle = ((100.0 - usage) / 100.0 * SYNTHETIC_TICKS_PER_READ as f64).round() as u64;

        self.synthetic.total_ticks = self
            .synthetic
            .total_ticks
            .wrapping_add(SYNTHETIC_TICKS_PER_READ);
        self.synthetic.idle_ticks = self.synthetic.idle_ticks.wrapping_add(idle);
        self.synthetic
    }

    fn read_memory_percent(&mut self) -> f64 {
        self.tables.memory_percent()
    }

    fn read_disk_percent(&mut self) -> Result<f64> {
        if !self.disk_supported {
            return Ok(0.0);
        }
        self.tables.disk_percent(&self.mount_point)
    }

    fn read_network_bytes(&mut self) -> Result<RawNetworkSample> {
        Err(HealthError::Unsupported("network byte counters"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn table_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_linux_collector_reads_custom_tables() {
        let stat = table_file("cpu 10 0 10 80 0 0 0 0 0 0\n");
        let net = table_file(
            "h1\nh2\n    lo: 99 0 0 0 0 0 0 0 99 0 0 0 0 0 0 0\n  eth0: 10 0 0 0 0 0 0 0 20 0 0 0 0 0 0 0\n",
        );

        let mut collector = LinuxCollector::with_paths(stat.path(), net.path());
        assert_eq!(
            collector.read_cpu_ticks(),
            RawCpuSample {
                idle_ticks: 80,
                total_ticks: 100
            }
        );
        assert_eq!(
            collector.read_network_bytes().unwrap(),
            RawNetworkSample {
                received_bytes: 10,
                transmitted_bytes: 20
            }
        );
    }

    #[test]
    fn test_linux_collector_missing_tables() {
        let mut collector =
            LinuxCollector::with_paths("/nonexistent/host_pulse/stat", "/nonexistent/host_pulse/dev");
        assert_eq!(collector.read_cpu_ticks(), RawCpuSample::default());
        assert!(matches!(
            collector.read_network_bytes(),
            Err(HealthError::Io(_))
        ));
    }

    #[test]
    fn test_memory_percent_in_range() {
        let mut collector = platform_source();
        let memory = collector.read_memory_percent();
        assert!((0.0..=100.0).contains(&memory));
    }

    #[test]
    fn test_portable_collector_has_no_network() {
        let mut collector = PortableCollector::new();
        assert!(!collector.capabilities().network);
        let err = collector.read_network_bytes().unwrap_err();
        assert!(err.is_permanent());
    }

    #[test]
    fn test_portable_collector_ticks_advance() {
        let mut collector = PortableCollector::new();
        let first = collector.read_cpu_ticks();
        let second = collector.read_cpu_ticks();
        assert_eq!(second.total_ticks - first.total_ticks, SYNTHETIC_TICKS_PER_READ);
        assert!(second.idle_ticks - first.idle_ticks <= SYNTHETIC_TICKS_PER_READ);
    }
}
