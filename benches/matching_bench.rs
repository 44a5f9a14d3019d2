use criterion::{Criterion, black_box, criterion_group, criterion_main};
use psmatch::{Algorithm, Matcher, MatchingConfig, SubjectRecord};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn subjects(n: usize, groups: usize) -> Vec<SubjectRecord> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..n)
        .map(|i| {
            let scores = (0..groups - 1).map(|_| rng.random::<f64>()).collect();
            SubjectRecord::new(format!("s{i}"), format!("{}", i % groups), scores)
        })
        .collect()
}

fn bench_two_group(c: &mut Criterion, name: &str, algorithm: Algorithm) {
    let data = subjects(5_000, 2);
    let matcher = Matcher::new(
        MatchingConfig::builder()
            .algorithm(algorithm)
            .treatment_group("1")
            .match_ratio(2)
            .build(),
    );
    c.bench_function(name, |b| {
        b.iter(|| matcher.perform_matching(black_box(data.clone())))
    });
}

fn bench_nearest_neighbor(c: &mut Criterion) {
    bench_two_group(c, "nearest_neighbor_5k", Algorithm::NearestNeighbor);
}

fn bench_digit_greedy(c: &mut Criterion) {
    bench_two_group(c, "digit_greedy_5k", Algorithm::DigitGreedy);
}

fn bench_n_way(c: &mut Criterion) {
    let data = subjects(3_000, 3);
    let matcher = Matcher::new(
        MatchingConfig::builder()
            .algorithm(Algorithm::NWay)
            .num_groups(3)
            .workers(4)
            .build(),
    );
    c.bench_function("n_way_3k", |b| {
        b.iter(|| matcher.perform_matching(black_box(data.clone())))
    });
}

fn bench_three_way(c: &mut Criterion) {
    let data = subjects(3_000, 3);
    let matcher = Matcher::new(
        MatchingConfig::builder()
            .algorithm(Algorithm::ThreeWay)
            .num_groups(3)
            .build(),
    );
    c.bench_function("three_way_3k", |b| {
        b.iter(|| matcher.perform_matching(black_box(data.clone())))
    });
}

criterion_group!(
    benches,
    bench_nearest_neighbor,
    bench_digit_greedy,
    bench_n_way,
    bench_three_way,
);
criterion_main!(benches);
