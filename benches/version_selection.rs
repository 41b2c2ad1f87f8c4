//! Benchmark for update target selection over large version lists

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gardener_api::apis::core::v1beta1::{ExpirableVersion, VersionClassification};
use gardener_api::versioning::{
    auto_update_target, classify_all, force_update_target, resolve_partial, UpdateScope, Version,
};

/// `minors` minor lines with `patches` patches each. Older minors are
/// deprecated with an expiration in the past, the newest minor is supported.
fn versions(minors: u64, patches: u64) -> Vec<ExpirableVersion> {
    let expired = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut out = Vec::with_capacity((minors * patches) as usize);
    for minor in 0..minors {
        for patch in 0..patches {
            let classification = if minor + 1 == minors {
                VersionClassification::Supported
            } else {
                VersionClassification::Deprecated
            };
            let mut v = ExpirableVersion::classified(&format!("1.{}.{}", minor, patch), classification);
            if minor + 2 < minors {
                v.expiration_date = Some(expired - Duration::days(minor as i64));
            }
            out.push(v);
        }
    }
    out
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("version_selection");
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

    for size in [10u64, 50, 200] {
        let offered = versions(size, 10);
        group.throughput(Throughput::Elements(offered.len() as u64));
        group.bench_with_input(BenchmarkId::new("classify_all", offered.len()), &offered, |b, offered| {
            b.iter(|| classify_all(black_box(offered), now));
        });
    }

    group.finish();
}

fn bench_targets(c: &mut Criterion) {
    let mut group = c.benchmark_group("version_selection");
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let offered = versions(50, 10);
    let current = Version::parse("1.2.3").unwrap();
    let partial = Version::parse("1.48").unwrap();

    group.bench_function("auto_update_target_minor", |b| {
        b.iter(|| auto_update_target(black_box(&offered), &current, UpdateScope::Minor, now));
    });

    group.bench_function("force_update_target", |b| {
        b.iter(|| force_update_target(black_box(&offered), &current, now));
    });

    group.bench_function("resolve_partial", |b| {
        b.iter(|| resolve_partial(black_box(&offered), &partial, now));
    });

    group.finish();
}

criterion_group!(benches, bench_classify, bench_targets);
criterion_main!(benches);
