//! Parsers for the Linux procfs counter tables.
//!
//! The parsers take the file contents as text so they can be exercised
//! without a live `/proc`.

use crate::error::{HealthError, Result};
use crate::metrics::data::{RawCpuSample, RawNetworkSample};
use std::fs;
use std::path::Path;

/// Path of the aggregate CPU counter table.
pub const PROC_STAT: &str = "/proc/stat";

/// Path of the per-interface network counter table.
pub const PROC_NET_DEV: &str = "/proc/net/dev";

/// Name of the loopback interface, excluded from network totals.
pub const LOOPBACK_INTERFACE: &str = "lo";

/// Index of the idle column on a `cpu` line (after the label).
const IDLE_COLUMN: usize = 3;

/// user, nice, system, idle, iowait, irq, softirq, steal. The trailing guest
/// columns are already accounted for in user and nice.
const COUNTED_COLUMNS: usize = 8;

/// Receive bytes is the first column after the interface name, transmit
/// bytes the ninth.
const RX_BYTES_COLUMN: usize = 0;
const TX_BYTES_COLUMN: usize = 8;

/// Parse the aggregate `cpu` line of `/proc/stat`.
pub fn parse_proc_stat(contents: &str) -> Result<RawCpuSample> {
    let line = contents
        .lines()
        .find(|line| line.split_whitespace().next() == Some("cpu"))
        .ok_or_else(|| HealthError::parse_error("no aggregate cpu line in /proc/stat"))?;

    let columns = line
        .split_whitespace()
        .skip(1)
        .take(COUNTED_COLUMNS)
        .map(|value| {
            value
                .parse::<u64>()
                .map_err(|e| HealthError::parse_error(format!("bad cpu column {value:?}: {e}")))
        })
        .collect::<Result<Vec<u64>>>()?;

    if columns.len() <= IDLE_COLUMN {
        return Err(HealthError::parse_error(format!(
            "cpu line has {} columns, expected at least {}",
            columns.len(),
            IDLE_COLUMN + 1
        )));
    }

    Ok(RawCpuSample {
        idle_ticks: columns[IDLE_COLUMN],
        total_ticks: columns.iter().fold(0u64, |acc, v| acc.saturating_add(*v)),
    })
}

/// Parse `/proc/net/dev`, summing receive and transmit bytes over every
/// interface except loopback.
///
/// The first two lines are column headers. Rows that do not have the
/// `name: counters...` shape are skipped.
pub fn parse_net_dev(contents: &str) -> Result<RawNetworkSample> {
    let mut lines = contents.lines();
    if lines.next().is_none() || lines.next().is_none() {
        return Err(HealthError::parse_error("/proc/net/dev header missing"));
    }

    let mut sample = RawNetworkSample::default();
    for line in lines {
        let Some((name, counters)) = line.split_once(':') else {
            continue;
        };
        if name.trim() == LOOPBACK_INTERFACE {
            continue;
        }

        let fields: Vec<&str> = counters.split_whitespace().collect();
        let (Some(rx), Some(tx)) = (
            fields.get(RX_BYTES_COLUMN).and_then(|v| v.parse::<u64>().ok()),
            fields.get(TX_BYTES_COLUMN).and_then(|v| v.parse::<u64>().ok()),
        ) else {
            continue;
        };

        sample.received_bytes = sample.received_bytes.saturating_add(rx);
        sample.transmitted_bytes = sample.transmitted_bytes.saturating_add(tx);
    }

    Ok(sample)
}

/// Read and parse a `/proc/stat` style file.
pub fn read_cpu_ticks(path: impl AsRef<Path>) -> Result<RawCpuSample> {
    parse_proc_stat(&fs::read_to_string(path)?)
}

/// Read and parse a `/proc/net/dev` style file.
pub fn read_network_bytes(path: impl AsRef<Path>) -> Result<RawNetworkSample> {
    parse_net_dev(&fs::read_to_string(path)?)
}
