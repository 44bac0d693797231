//! Property tests for the aggregators: shape, range and determinism of every
//! derived matrix over arbitrary review corpora.

use proptest::prelude::*;
use reviewdash_core::aggregate::{
    compute_mention_frequency, compute_priority_ranking, compute_review_counts,
    compute_sentiment_percentage, compute_weighted_score,
};
use reviewdash_core::model::{Category, Polarity, Review};
use std::collections::HashSet;

use generators::*;

fn distinct_addresses(reviews: &[Review]) -> usize {
    reviews
        .iter()
        .map(Review::address)
        .collect::<HashSet<_>>()
        .len()
}

fn in_percent_range(value: f64) -> bool {
    value.is_finite() && (0.0..=100.0 + 1e-9).contains(&value)
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(512))]

    #[test]
    fn mention_frequency_is_a_percentage(reviews in arb_reviews()) {
        let matrix = compute_mention_frequency(&reviews);
        for (_, _, value) in matrix.cells() {
            prop_assert!(in_percent_range(value), "out of range: {}", value);
        }
    }

    #[test]
    fn every_matrix_has_one_row_per_address(reviews in arb_reviews()) {
        let expected_rows = distinct_addresses(&reviews);
        let matrices = [
            compute_weighted_score(&reviews, Polarity::Positive),
            compute_weighted_score(&reviews, Polarity::Negative),
            compute_sentiment_percentage(&reviews, Polarity::Positive),
            compute_sentiment_percentage(&reviews, Polarity::Negative),
            compute_mention_frequency(&reviews),
        ];
        for matrix in &matrices {
            prop_assert_eq!(matrix.rows(), expected_rows);
            prop_assert_eq!(matrix.location_names.len(), expected_rows);
            prop_assert!(matrix.data.iter().all(|row| row.len() == Category::COUNT));
        }
    }

    #[test]
    fn weighted_and_sentiment_scores_never_nan(reviews in arb_reviews()) {
        for polarity in Polarity::ALL {
            for (_, _, value) in compute_weighted_score(&reviews, polarity).cells() {
                prop_assert!(in_percent_range(value));
            }
            for (_, _, value) in compute_sentiment_percentage(&reviews, polarity).cells() {
                prop_assert!(in_percent_range(value));
            }
        }
    }

    #[test]
    fn positive_and_negative_shares_cover_all_mentions(reviews in arb_reviews()) {
        let positive = compute_sentiment_percentage(&reviews, Polarity::Positive);
        let negative = compute_sentiment_percentage(&reviews, Polarity::Negative);
        let frequency = compute_mention_frequency(&reviews);

        for row in 0..frequency.rows() {
            for category in Category::ALL {
                let sum = positive.cell(row, category).unwrap_or_default()
                    + negative.cell(row, category).unwrap_or_default();
                if frequency.cell(row, category).unwrap_or_default() > 0.0 {
                    prop_assert!((sum - 100.0).abs() < 1e-9);
                } else {
                    prop_assert!(sum.abs() < f64::EPSILON);
                }
            }
        }
    }

    #[test]
    fn aggregation_is_deterministic(reviews in arb_reviews()) {
        let first = compute_weighted_score(&reviews, Polarity::Negative);
        let second = compute_weighted_score(&reviews, Polarity::Negative);
        let first_bits: Vec<u64> = first.cells().map(|(_, _, v)| v.to_bits()).collect();
        let second_bits: Vec<u64> = second.cells().map(|(_, _, v)| v.to_bits()).collect();
        prop_assert_eq!(first_bits, second_bits);
        prop_assert_eq!(first.location_names, second.location_names);

        prop_assert_eq!(compute_priority_ranking(&reviews), compute_priority_ranking(&reviews));
    }

    #[test]
    fn priority_ranking_covers_catalog(reviews in arb_reviews()) {
        let ranking = compute_priority_ranking(&reviews);
        if reviews.is_empty() {
            prop_assert!(ranking.is_empty());
        } else {
            let order: Vec<Category> = ranking.categories.iter().map(|c| c.category).collect();
            prop_assert_eq!(order, Category::ALL.to_vec());
            for entry in &ranking.categories {
                prop_assert!(in_percent_range(entry.frequency));
                prop_assert!(in_percent_range(entry.negative_pct));
                prop_assert!(entry.negative_count <= entry.mention_count);
                prop_assert!(entry.mention_count <= reviews.len());
            }
        }
    }

    #[test]
    fn review_counts_sum_to_input_length(reviews in arb_reviews()) {
        let counts = compute_review_counts(&reviews);
        prop_assert_eq!(counts.iter().map(|c| c.count).sum::<usize>(), reviews.len());
        prop_assert!(counts.windows(2).all(|pair| pair[0].count >= pair[1].count));
    }
}
