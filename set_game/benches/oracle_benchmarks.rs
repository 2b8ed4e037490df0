use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use set_game::{Card, FeatureOracle, SetOracle};
use std::hint::black_box;

fn classic() -> FeatureOracle {
    FeatureOracle::new(3, 4)
}

/// Twelve cards holding no set at all, the worst case for an existence probe
fn cap_of_twelve() -> Vec<Card> {
    let oracle = classic();
    let mut cap: Vec<Card> = Vec::new();
    for card in (0..81).map(Card) {
        let completes = cap.iter().enumerate().any(|(i, &a)| {
            cap[i + 1..]
                .iter()
                .any(|&b| oracle.is_legal_set(&[a, b, card]))
        });
        if !completes {
            cap.push(card);
        }
        if cap.len() == 12 {
            break;
        }
    }
    cap
}

/// Benchmark a single legality check
fn bench_is_legal_set(c: &mut Criterion) {
    let oracle = classic();
    let cards = [Card(0), Card(40), Card(80)];

    c.bench_function("is_legal_set", |b| {
        b.iter(|| oracle.is_legal_set(black_box(&cards)));
    });
}

/// Benchmark the existence probe the dealer runs every loop in stopwatch mode
fn bench_find_first_set(c: &mut Criterion) {
    let oracle = classic();
    let mut group = c.benchmark_group("find_first_set");

    for size in [12, 15, 21] {
        let pool: Vec<Card> = (0..size).map(|i| Card(i * 3 % 81)).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &pool, |b, pool| {
            b.iter(|| oracle.find_sets(black_box(pool), 1));
        });
    }

    group.finish();
}

/// Benchmark a full scan of a grid without sets
fn bench_find_sets_no_match(c: &mut Criterion) {
    let oracle = classic();
    let cap = cap_of_twelve();

    c.bench_function("find_sets_cap_of_twelve", |b| {
        b.iter(|| oracle.find_sets(black_box(&cap), usize::MAX));
    });
}

/// Benchmark scanning the whole deck
fn bench_find_sets_full_deck(c: &mut Criterion) {
    let oracle = classic();
    let deck: Vec<Card> = (0..81).map(Card).collect();

    c.bench_function("find_first_set_full_deck", |b| {
        b.iter(|| oracle.find_sets(black_box(&deck), 1));
    });
}

criterion_group!(
    benches,
    bench_is_legal_set,
    bench_find_first_set,
    bench_find_sets_no_match,
    bench_find_sets_full_deck
);
criterion_main!(benches);
