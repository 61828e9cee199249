use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use host_pulse::{
    metrics::{data, procfs},
    platform_source, HealthMetrics, MetricsStore, RawCpuSample, Sampler,
};

fn net_dev_table(interfaces: usize) -> String {
    let mut table = String::from(
        "Inter-|   Receive                                                |  Transmit\n \
         face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed\n",
    );
    table.push_str("    lo: 9000 10 0 0 0 0 0 0 9000 10 0 0 0 0 0 0\n");
    for i in 0..interfaces {
        table.push_str(&format!(
            "  eth{i}: {} 10 0 0 0 0 0 0 {} 10 0 0 0 0 0 0\n",
            1_000 + i,
            2_000 + i
        ));
    }
    table
}

/// Benchmark /proc/net/dev parsing with growing interface counts
fn bench_net_dev_parsing(c: &mut Criterion) {
    for interfaces in [1usize, 8, 64].iter() {
        let table = net_dev_table(*interfaces);
        c.bench_with_input(
            BenchmarkId::new("parse_net_dev", interfaces),
            &table,
            |b, table| b.iter(|| procfs::parse_net_dev(black_box(table)).expect("Should parse")),
        );
    }
}

/// Benchmark /proc/stat parsing
fn bench_proc_stat_parsing(c: &mut Criterion) {
    let mut stat = String::from("cpu  4705 356 584 3699176 23060 0 277 0 0 0\n");
    for core in 0..16 {
        stat.push_str(&format!("cpu{core} 294 22 36 231198 1441 0 17 0 0 0\n"));
    }
    stat.push_str("intr 114930548 113199788 3 0 5 263 0 4\nctxt 1990473\n");

    c.bench_function("parse_proc_stat", |b| {
        b.iter(|| procfs::parse_proc_stat(black_box(&stat)).expect("Should parse"))
    });
}

/// Benchmark the CPU delta computation
fn bench_cpu_delta(c: &mut Criterion) {
    let prev = RawCpuSample {
        idle_ticks: 3_699_176,
        total_ticks: 3_728_258,
    };
    let curr = RawCpuSample {
        idle_ticks: 3_699_976,
        total_ticks: 3_729_258,
    };
    c.bench_function("cpu_usage_between", |b| {
        b.iter(|| data::cpu_usage_between(black_box(prev), black_box(curr)))
    });
}

/// Benchmark one full tick against the live platform source
fn bench_live_tick(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Should create tokio runtime");
    let (_store, writer) = MetricsStore::new();
    let sampler = Sampler::new(platform_source(), writer);
    rt.block_on(sampler.seed());

    c.bench_function("sampler_tick", |b| b.to_async(&rt).iter(|| sampler.tick()));
}

/// Benchmark pull-side reads and JSON encoding of the wire form
fn bench_report_serialization(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Should create tokio runtime");
    let (store, writer) = MetricsStore::new();
    rt.block_on(writer.commit(HealthMetrics {
        cpu_percent: 12.3,
        memory_percent: 45.6,
        disk_percent: 78.9,
        network_mbps: Some(1.5),
    }));

    c.bench_function("store_report", |b| b.to_async(&rt).iter(|| store.report()));

    let report = rt.block_on(store.report());
    c.bench_function("report_json_serialization", |b| {
        b.iter(|| serde_json::to_string(black_box(&report)).expect("Should serialize"))
    });
}

criterion_group!(
    benches,
    bench_net_dev_parsing,
    bench_proc_stat_parsing,
    bench_cpu_delta,
    bench_live_tick,
    bench_report_serialization
);
criterion_main!(benches);
