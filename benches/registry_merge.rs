use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use uidaudit::config::IdPolicy;
use uidaudit::core::{parse_host, AccountObservation, AccountRegistry, IdKind};

/// Synthetic fleet: every host reports the same accounts, and every tenth
/// account drifts on every seventh host.
fn fleet(hosts: usize, accounts: usize) -> Vec<Vec<AccountObservation>> {
    (0..hosts)
        .map(|h| {
            let host = format!("host{:04}", h);
            let lines: Vec<String> = (0..accounts)
                .map(|a| {
                    let uid = if a % 10 == 0 && h % 7 == 0 { 5000 + a } else { 1000 + a };
                    format!("user{}:{}:{}", a, uid, 100)
                })
                .collect();
            parse_host(&host, &lines, IdPolicy::Opaque).observations
        })
        .collect()
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_merge");

    for hosts in [10usize, 100, 500] {
        let observations = fleet(hosts, 200);
        let total: usize = observations.iter().map(Vec::len).sum();
        group.throughput(Throughput::Elements(total as u64));

        group.bench_with_input(BenchmarkId::new("merge", hosts), &observations, |b, batches| {
            b.iter(|| {
                let mut registry = AccountRegistry::new();
                for batch in batches {
                    registry.merge_all(batch);
                }
                black_box(registry.drifting_accounts(IdKind::Uid).len())
            });
        });
    }

    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let lines: Vec<String> = (0..2000)
        .map(|a| format!("user{}:{}:{}:x", a, 1000 + a, 100))
        .collect();

    c.bench_function("parse_host_2000_lines", |b| {
        b.iter(|| black_box(parse_host("host0001", &lines, IdPolicy::Numeric)))
    });
}

criterion_group!(benches, bench_merge, bench_parse);
criterion_main!(benches);
