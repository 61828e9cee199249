use host_pulse::{
    error::HealthError,
    metrics::{
        data::{self, *},
        procfs,
    },
    WebConfig,
};
use std::time::Duration;

/// Seed {idle:100,total:1000} then {idle:150,total:1500} gives 90% usage
#[test]
fn test_cpu_usage_scenario() {
    let seed = RawCpuSample {
        idle_ticks: 100,
        total_ticks: 1000,
    };
    let next = RawCpuSample {
        idle_ticks: 150,
        total_ticks: 1500,
    };
    assert_eq!(data::cpu_usage_between(seed, next), Some(90.0));
}

/// Usage stays inside [0, 100] for any pair of samples that advance total
#[test]
fn test_cpu_usage_always_clamped() {
    let values = [0u64, 1, 7, 500, 1_000, 123_456, u64::MAX / 2, u64::MAX];
    for &prev_idle in &values {
        for &prev_total in &values {
            for &idle in &values {
                for &total in &values {
                    let prev = RawCpuSample {
                        idle_ticks: prev_idle,
                        total_ticks: prev_total,
                    };
                    let curr = RawCpuSample {
                        idle_ticks: idle,
                        total_ticks: total,
                    };
                    match data::cpu_usage_between(prev, curr) {
                        Some(usage) => {
                            assert!(total > prev_total);
                            assert!(
                                (0.0..=100.0).contains(&usage),
                                "usage {} out of range for {:?} -> {:?}",
                                usage,
                                prev,
                                curr
                            );
                        }
                        None => assert!(total <= prev_total),
                    }
                }
            }
        }
    }
}

/// Memory usage is deterministic given total and free bytes
#[test]
fn test_memory_percent_values() {
    assert_eq!(data::memory_percent(1000, 400), 60.0);
    assert_eq!(data::memory_percent(8_000_000_000, 2_000_000_000), 75.0);
    assert_eq!(data::memory_percent(0, 123), 0.0);
    assert_eq!(data::memory_percent(1000, 1000), 0.0);
}

/// Disk usage guards against a zero-sized filesystem
#[test]
fn test_disk_percent_guard() {
    assert_eq!(data::disk_percent(0, 0), 0.0);
    assert_eq!(data::disk_percent(1_000_000, 250_000), 75.0);
}

/// Loopback counters never reach the network totals
#[test]
fn test_net_dev_loopback_excluded() {
    let table = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
  eth0: 4000      40    0    0    0     0          0         0     3000      30    0    0    0     0       0          0
    lo: 777777    99    0    0    0     0          0         0   777777      99    0    0    0     0       0          0
docker0: 100       1    0    0    0     0          0         0      200       2    0    0    0     0       0          0
";
    let sample = procfs::parse_net_dev(table).expect("Should parse counter table");
    assert_eq!(sample.received_bytes, 4100);
    assert_eq!(sample.transmitted_bytes, 3200);
}

/// Network rate converts bytes per interval into megabits per second
#[test]
fn test_network_rate_conversion() {
    let prev = RawNetworkSample::default();
    let curr = RawNetworkSample {
        received_bytes: 2_500_000,
        transmitted_bytes: 0,
    };
    assert_eq!(
        data::network_rate_mbps(prev, curr, Duration::from_secs(2)),
        Some(10.0)
    );
    assert_eq!(data::network_rate_mbps(prev, curr, Duration::ZERO), None);
}

/// The wire form always carries exactly four numeric fields
#[test]
fn test_report_json_schema() {
    let report = HealthMetrics::default().report();
    let json = serde_json::to_value(report).expect("Should serialize");
    let object = json.as_object().expect("Should be an object");

    assert_eq!(object.len(), 4);
    for key in ["cpu", "memory", "disk", "network"] {
        assert!(object[key].is_number(), "{} should be a number", key);
        assert_eq!(object[key], 0.0);
    }
}

/// A computed network rate is reported as-is
#[test]
fn test_report_with_network_rate() {
    let metrics = HealthMetrics {
        cpu_percent: 3.4,
        memory_percent: 55.1,
        disk_percent: 70.0,
        network_mbps: Some(12.5),
    };
    let report: HealthReport = metrics.into();
    assert_eq!(report.network, 12.5);
    assert_eq!(report.memory, 55.1);
}

/// Test HealthError creation and formatting
#[test]
fn test_health_error_types() {
    let parse_error = HealthError::parse_error("Failed to parse data");
    assert!(format!("{}", parse_error).contains("Failed to parse data"));
    assert!(!parse_error.is_permanent());

    let missing = HealthError::filesystem_not_found("/");
    assert!(format!("{}", missing).contains("/"));

    let web_error = HealthError::web_server_error("Server startup failed");
    assert!(format!("{}", web_error).contains("Server startup failed"));

    let config_error = HealthError::config_error("Invalid configuration");
    assert!(format!("{}", config_error).contains("Invalid configuration"));

    let unsupported = HealthError::Unsupported("network byte counters");
    assert!(unsupported.is_permanent());
}

/// Test WebConfig builder pattern
#[test]
fn test_web_config() {
    let config = WebConfig::default()
        .with_host("127.0.0.1")
        .with_port(9090)
        .with_cors(false)
        .with_max_websocket_connections(50);

    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.port, 9090);
    assert!(!config.enable_cors);
    assert_eq!(config.max_websocket_connections, 50);
    assert_eq!(config.bind_address(), "127.0.0.1:9090");
}
