use cg_buffer::{BufferConfig, DecayPolicy, GraphBuffer, RollingWindowConfig};
use cg_core::CoOccurrence;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn synthetic_groups(count: usize, vocabulary: usize) -> Vec<CoOccurrence> {
    (0..count)
        .map(|i| {
            let names = (0..4).map(|k| format!("tag{}", (i * 31 + k * 17) % vocabulary));
            CoOccurrence::new(i as i64, names)
        })
        .collect()
}

fn benchmark_ingest_with_eviction(c: &mut Criterion) {
    let groups = synthetic_groups(10_000, 5_000);
    let mut bench = c.benchmark_group("ingest_uniform");

    for capacity in [100usize, 500, 2000].iter() {
        bench.throughput(Throughput::Elements(groups.len() as u64));
        bench.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            capacity,
            |b, &capacity| {
                b.iter(|| {
                    let mut buffer = GraphBuffer::with_capacity(capacity).unwrap();
                    for (i, g) in groups.iter().enumerate() {
                        buffer.add_group(g).unwrap();
                        if i % 100 == 99 {
                            buffer.end_frame().unwrap();
                        }
                    }
                    buffer.node_count()
                });
            },
        );
    }
    bench.finish();
}

fn benchmark_rolling_rebuild(c: &mut Criterion) {
    let groups = synthetic_groups(5_000, 1_000);
    let config = BufferConfig {
        capacity: 500,
        decay: DecayPolicy::RollingWindow(RollingWindowConfig {
            window: 1_000,
            ..Default::default()
        }),
        ..Default::default()
    };
    let mut buffer = GraphBuffer::new(config).unwrap();
    for g in &groups {
        buffer.add_group(g).unwrap();
    }

    c.bench_function("rolling window rebuild", |b| {
        b.iter(|| buffer.end_frame().unwrap());
    });
}

criterion_group!(benches, benchmark_ingest_with_eviction, benchmark_rolling_rebuild);
criterion_main!(benches);
