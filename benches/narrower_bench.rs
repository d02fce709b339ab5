use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kong_member_since::progress::NoopProgress;
use kong_member_since::{
    interpolate, CrossSnapshotDeducer, DateFetcher, FetchError, MemoryCheckpointStore, NarrowerConfig,
    NarrowingState, RangeNarrower, User,
};
use std::sync::Arc;

const USERS_PER_DAY: u64 = 700;

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2008, 1, 1).unwrap()
}

fn date_for(id: u64) -> NaiveDate {
    epoch() + Duration::days((id / USERS_PER_DAY) as i64)
}

/// Answers from the id embedded in the username, no I/O
struct SyntheticFetcher;

#[async_trait]
impl DateFetcher for SyntheticFetcher {
    async fn fetch_member_since(&self, username: &str) -> Result<Option<NaiveDate>, FetchError> {
        let id: u64 = username.trim_start_matches("user").parse().unwrap_or(0);
        Ok(Some(date_for(id)))
    }
}

fn population(size: u64) -> Vec<User> {
    (0..size).map(|id| User::new(id, format!("user{}", id))).collect()
}

fn bench_narrowing(c: &mut Criterion) {
    let mut group = c.benchmark_group("narrow");
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let narrower = RangeNarrower::new(Arc::new(SyntheticFetcher), NarrowerConfig { checkpoint_every: 0 });

    for size in [10_000u64, 100_000] {
        let users = population(size);
        group.bench_with_input(BenchmarkId::new("full_run", size), &users, |b, users| {
            b.iter(|| {
                let mut state = NarrowingState::fresh(users.clone(), 1 << 12);
                let mut store = MemoryCheckpointStore::new();
                let report = runtime
                    .block_on(narrower.run("bench.csv", &mut state, &mut store))
                    .unwrap();
                black_box(report.fetches)
            });
        });
    }

    group.finish();
}

fn bench_interpolation(c: &mut Criterion) {
    let mut group = c.benchmark_group("interpolate");

    for size in [10_000u64, 100_000] {
        // Every 16th user dated, the rest wait for their neighbors
        let users: Vec<User> = (0..size)
            .map(|id| {
                if id % 16 == 0 {
                    User::with_date(id, format!("user{}", id), date_for(id))
                } else {
                    User::new(id, format!("user{}", id))
                }
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("sparse", size), &users, |b, users| {
            b.iter(|| {
                let mut users = users.clone();
                black_box(interpolate(&mut users, &NoopProgress))
            });
        });
    }

    group.finish();
}

fn bench_deduction(c: &mut Criterion) {
    let size = 100_000u64;
    let current: Vec<User> = (0..size)
        .map(|id| {
            if id % 3 == 0 {
                User::new(id, format!("user{}", id))
            } else {
                User::with_date(id, format!("user{}", id), date_for(id))
            }
        })
        .collect();
    let lookahead: Vec<User> = (size..size * 2)
        .map(|id| User::with_date(id, format!("user{}", id), date_for(id)))
        .collect();

    c.bench_function("deduce_with_lookahead", |b| {
        b.iter(|| {
            let mut users = current.clone();
            let mut deducer = CrossSnapshotDeducer::new();
            black_box(deducer.deduce(&mut users, Some(&lookahead), &NoopProgress))
        });
    });
}

criterion_group!(benches, bench_narrowing, bench_interpolation, bench_deduction);
criterion_main!(benches);
