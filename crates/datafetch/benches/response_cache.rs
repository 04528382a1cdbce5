use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use datafetch::{KeyParams, ResponseCache};
use std::time::Duration;

fn key(i: usize) -> String {
    format!("https://data.example.com/pbp/play_by_play_{i}.csv")
}

fn bench_get_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("response_cache_get");

    for size in [16usize, 256, 4096].iter() {
        group.bench_with_input(BenchmarkId::new("hit", size), size, |b, &size| {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let _guard = rt.enter();
            let mut cache = ResponseCache::new(size, Duration::from_secs(3600));
            for i in 0..size {
                cache.set(key(i), vec![0u8; 64], None, None, None);
            }

            b.iter(|| {
                for i in 0..size {
                    black_box(cache.get(&key(i)));
                }
            });
        });
    }

    group.finish();
}

fn bench_set_with_eviction(c: &mut Criterion) {
    let mut group = c.benchmark_group("response_cache_set");

    for size in [16usize, 256, 4096].iter() {
        group.bench_with_input(BenchmarkId::new("evicting", size), size, |b, &size| {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let _guard = rt.enter();
            let mut cache = ResponseCache::new(size, Duration::from_secs(3600));

            b.iter(|| {
                // Twice the capacity: the second half evicts on every insert.
                for i in 0..size * 2 {
                    cache.set(key(i), vec![0u8; 64], None, None, None);
                }
                black_box(cache.len());
            });
        });
    }

    group.finish();
}

fn bench_generate_key(c: &mut Criterion) {
    let params = KeyParams::new()
        .param("season", 2023)
        .param("team", "KC")
        .param("week", 14);

    c.bench_function("response_cache_generate_key", |b| {
        b.iter(|| {
            black_box(ResponseCache::<Vec<u8>>::generate_key(
                black_box("https://data.example.com/pbp.csv"),
                Some(&params),
            ))
        });
    });
}

criterion_group!(
    name = response_cache_benches;
    config = Criterion::default().sample_size(20);
    targets = bench_get_hit, bench_set_with_eviction, bench_generate_key
);

criterion_main!(response_cache_benches);
