use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use reviewdash_core::aggregate::{
    compute_mention_frequency, compute_priority_ranking, compute_sentiment_percentage,
    compute_weighted_score,
};
use reviewdash_core::model::{Category, Polarity, Review, Sentiment};

const TIERS: [(&str, usize, usize); 3] = [("small", 200, 5), ("medium", 5_000, 40), ("large", 50_000, 250)];

/// Deterministic corpus: `rows` reviews spread over `locations` addresses.
fn corpus(rows: usize, locations: usize) -> Vec<Review> {
    let mut state = 0x5EED_u64;
    let mut next = move || {
        state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        state >> 33
    };

    (0..rows)
        .map(|_| {
            let location = usize::try_from(next()).unwrap_or_default() % locations;
            Category::ALL.into_iter().fold(
                Review::new(format!("{location} Main St, Town {location}")),
                |review, category| {
                    let sentiment = match next() % 3 {
                        0 => Sentiment::Positive,
                        1 => Sentiment::Negative,
                        _ => Sentiment::Neutral,
                    };
                    #[allow(clippy::cast_precision_loss)]
                    let intensity = (next() % 6) as f64;
                    review.with_mention(category, sentiment, intensity)
                },
            )
        })
        .collect()
}

fn bench_aggregators(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");

    for (name, rows, locations) in TIERS {
        let reviews = corpus(rows, locations);
        group.throughput(Throughput::Elements(rows as u64));

        group.bench_with_input(BenchmarkId::new("weighted_score", name), &reviews, |b, r| {
            b.iter(|| black_box(compute_weighted_score(r, Polarity::Negative)));
        });
        group.bench_with_input(BenchmarkId::new("sentiment_percentage", name), &reviews, |b, r| {
            b.iter(|| black_box(compute_sentiment_percentage(r, Polarity::Positive)));
        });
        group.bench_with_input(BenchmarkId::new("mention_frequency", name), &reviews, |b, r| {
            b.iter(|| black_box(compute_mention_frequency(r)));
        });
        group.bench_with_input(BenchmarkId::new("priority_ranking", name), &reviews, |b, r| {
            b.iter(|| black_box(compute_priority_ranking(r)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_aggregators);
criterion_main!(benches);
