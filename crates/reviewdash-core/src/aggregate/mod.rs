//! Sentiment aggregation over a file's review rows.
//!
//! Every function here is pure: it takes the review slice (plus a polarity or
//! category where relevant) and recomputes its result from scratch. Nothing is
//! cached, so the same input slice always yields bit-identical output.
//!
//! # Matrix shape
//!
//! Per-location aggregators return a [`DerivedMatrix`]:
//!
//! - one row per distinct address, in first-seen order of the input;
//! - exactly [`Category::COUNT`] columns, in [`Category::ALL`] order;
//! - categories with no mentions at a location yield `0.0`, never a gap.
//!
//! Empty input yields an empty matrix (zero rows), which renderers treat as
//! "nothing to draw".

pub mod counts;
pub mod priority;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{Category, Polarity, Review};

pub use counts::{LocationCount, SentimentCounts, compute_review_counts, compute_sentiment_counts};
pub use priority::{CategoryPriority, PriorityRanking, PriorityThresholds, compute_priority_ranking};

/// Intensities are scored on a 0–5 scale.
pub const INTENSITY_SCALE: f64 = 5.0;

/// Location × category table of percentages or scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMatrix {
    /// Display label per row; `location_names[i]` labels `data[i]`.
    pub location_names: Vec<String>,
    /// One row per location, one column per category.
    pub data: Vec<[f64; Category::COUNT]>,
}

impl DerivedMatrix {
    /// A matrix with zero locations.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            location_names: Vec::new(),
            data: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of location rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.data.len()
    }

    /// Value at `row` for `category`, if the row exists.
    #[must_use]
    pub fn cell(&self, row: usize, category: Category) -> Option<f64> {
        self.data.get(row).map(|values| values[category.index()])
    }

    /// Iterate `(location, category, value)` in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (&str, Category, f64)> + '_ {
        self.location_names
            .iter()
            .zip(&self.data)
            .flat_map(|(location, values)| {
                Category::ALL
                    .into_iter()
                    .map(move |category| (location.as_str(), category, values[category.index()]))
            })
    }
}

/// Reviews sharing one full address string.
pub(crate) struct LocationGroup<'a> {
    pub(crate) label: String,
    pub(crate) reviews: Vec<&'a Review>,
}

/// Group reviews by full address, preserving first-seen order.
pub(crate) fn group_by_location(reviews: &[Review]) -> Vec<LocationGroup<'_>> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<LocationGroup<'_>> = Vec::new();

    for review in reviews {
        let slot = *slots.entry(review.address()).or_insert_with(|| {
            groups.push(LocationGroup {
                label: review.location_label(),
                reviews: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].reviews.push(review);
    }

    groups
}

/// `numerator / denominator × 100`, or 0 when the denominator is zero.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn percentage(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64 * 100.0
}

fn per_location(
    reviews: &[Review],
    cell: impl Fn(&[&Review], Category) -> f64,
) -> DerivedMatrix {
    let groups = group_by_location(reviews);
    let mut matrix = DerivedMatrix {
        location_names: Vec::with_capacity(groups.len()),
        data: Vec::with_capacity(groups.len()),
    };

    for group in groups {
        let mut row = [0.0; Category::COUNT];
        for category in Category::ALL {
            row[category.index()] = cell(&group.reviews, category);
        }
        matrix.location_names.push(group.label);
        matrix.data.push(row);
    }

    matrix
}

/// Prevalence × severity of one polarity per location and category.
///
/// For the reviews at a location whose sentiment matches `polarity`:
///
/// `score = (matching / total_at_location × 100) × (mean_intensity / 5)`
///
/// A location with no matching reviews scores `0.0`.
#[must_use]
pub fn compute_weighted_score(reviews: &[Review], polarity: Polarity) -> DerivedMatrix {
    let wanted = polarity.as_sentiment();
    per_location(reviews, |group, category| {
        let intensities: Vec<f64> = group
            .iter()
            .filter(|review| review.sentiment(category) == wanted)
            .map(|review| review.intensity(category))
            .collect();

        if intensities.is_empty() {
            return 0.0;
        }

        #[allow(clippy::cast_precision_loss)]
        let mean_intensity = intensities.iter().sum::<f64>() / intensities.len() as f64;
        percentage(intensities.len(), group.len()) * (mean_intensity / INTENSITY_SCALE)
    })
}

/// Share of mentions at a location that carry `polarity`.
///
/// `pct = matching / non_neutral × 100`, or `0.0` with no mentions.
#[must_use]
pub fn compute_sentiment_percentage(reviews: &[Review], polarity: Polarity) -> DerivedMatrix {
    let wanted = polarity.as_sentiment();
    per_location(reviews, |group, category| {
        let mentions = group
            .iter()
            .filter(|review| review.sentiment(category).is_mention())
            .count();
        let matching = group
            .iter()
            .filter(|review| review.sentiment(category) == wanted)
            .count();
        percentage(matching, mentions)
    })
}

/// Share of reviews at a location that mention each category at all.
#[must_use]
pub fn compute_mention_frequency(reviews: &[Review]) -> DerivedMatrix {
    per_location(reviews, |group, category| {
        let mentions = group
            .iter()
            .filter(|review| review.sentiment(category).is_mention())
            .count();
        percentage(mentions, group.len())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sentiment;

    fn assert_approx_eq(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    fn springfield_pair() -> Vec<Review> {
        vec![
            Review::new("123 Main St, Springfield").with_mention(
                Category::Cleanliness,
                Sentiment::Negative,
                4.0,
            ),
            Review::new("123 Main St, Springfield").with_mention(
                Category::Cleanliness,
                Sentiment::Neutral,
                0.0,
            ),
        ]
    }

    #[test]
    fn weighted_score_worked_example() {
        let matrix = compute_weighted_score(&springfield_pair(), Polarity::Negative);
        assert_eq!(matrix.location_names, ["Springfield"]);
        assert_eq!(matrix.rows(), 1);
        assert_approx_eq(matrix.data[0][Category::Cleanliness.index()], 40.0);
        for category in Category::ALL.into_iter().skip(1) {
            assert_approx_eq(matrix.data[0][category.index()], 0.0);
        }
    }

    #[test]
    fn weighted_score_without_matching_polarity_is_zero_not_nan() {
        let matrix = compute_weighted_score(&springfield_pair(), Polarity::Positive);
        for (_, _, value) in matrix.cells() {
            assert!(value.is_finite());
            assert_approx_eq(value, 0.0);
        }
    }

    #[test]
    fn weighted_score_averages_intensity() {
        let reviews = vec![
            Review::new("A, Town").with_mention(Category::Price, Sentiment::Positive, 5.0),
            Review::new("A, Town").with_mention(Category::Price, Sentiment::Positive, 3.0),
            Review::new("A, Town"),
            Review::new("A, Town"),
        ];
        // 2 of 4 reviews (50%) at mean intensity 4 → 50 × 0.8 = 40
        let matrix = compute_weighted_score(&reviews, Polarity::Positive);
        assert_approx_eq(matrix.data[0][Category::Price.index()], 40.0);
    }

    #[test]
    fn sentiment_percentage_ignores_neutral() {
        let reviews = vec![
            Review::new("A, Town").with_mention(Category::Crowding, Sentiment::Negative, 2.0),
            Review::new("A, Town").with_mention(Category::Crowding, Sentiment::Positive, 2.0),
            Review::new("A, Town").with_mention(Category::Crowding, Sentiment::Negative, 1.0),
            Review::new("A, Town"),
        ];
        let negative = compute_sentiment_percentage(&reviews, Polarity::Negative);
        let positive = compute_sentiment_percentage(&reviews, Polarity::Positive);
        assert_approx_eq(negative.data[0][Category::Crowding.index()], 200.0 / 3.0);
        assert_approx_eq(positive.data[0][Category::Crowding.index()], 100.0 / 3.0);
        // No mentions at all → 0, not NaN.
        assert_approx_eq(negative.data[0][Category::Price.index()], 0.0);
    }

    #[test]
    fn mention_frequency_counts_non_neutral() {
        let reviews = vec![
            Review::new("A, Town").with_mention(Category::Price, Sentiment::Negative, 2.0),
            Review::new("A, Town").with_mention(Category::Price, Sentiment::Positive, 2.0),
            Review::new("A, Town"),
            Review::new("A, Town"),
        ];
        let matrix = compute_mention_frequency(&reviews);
        assert_approx_eq(matrix.data[0][Category::Price.index()], 50.0);
        assert_approx_eq(matrix.data[0][Category::Cleanliness.index()], 0.0);
    }

    #[test]
    fn unclassified_cells_count_as_mentions_of_neither_polarity() {
        let reviews = vec![
            Review::new("A, Town").with_mention(Category::Price, Sentiment::Unclassified, 0.0),
            Review::new("A, Town").with_mention(Category::Price, Sentiment::Negative, 4.0),
        ];
        let frequency = compute_mention_frequency(&reviews);
        let negative = compute_sentiment_percentage(&reviews, Polarity::Negative);
        let positive = compute_sentiment_percentage(&reviews, Polarity::Positive);
        assert_approx_eq(frequency.data[0][Category::Price.index()], 100.0);
        assert_approx_eq(negative.data[0][Category::Price.index()], 50.0);
        assert_approx_eq(positive.data[0][Category::Price.index()], 0.0);
    }

    #[test]
    fn locations_keep_first_seen_order() {
        let reviews = vec![
            Review::new("9 Oak, Zeta"),
            Review::new("1 Elm, Alpha"),
            Review::new("9 Oak, Zeta"),
            Review::new("5 Pine, Mid"),
        ];
        let matrix = compute_mention_frequency(&reviews);
        assert_eq!(matrix.location_names, ["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn distinct_addresses_with_same_label_stay_separate_rows() {
        let reviews = vec![
            Review::new("1 Elm, Springfield")
                .with_mention(Category::Price, Sentiment::Negative, 5.0),
            Review::new("2 Oak, Springfield"),
        ];
        let matrix = compute_mention_frequency(&reviews);
        assert_eq!(matrix.location_names, ["Springfield", "Springfield"]);
        assert_approx_eq(matrix.data[0][Category::Price.index()], 100.0);
        assert_approx_eq(matrix.data[1][Category::Price.index()], 0.0);
    }

    #[test]
    fn empty_input_yields_empty_matrices() {
        assert!(compute_weighted_score(&[], Polarity::Negative).is_empty());
        assert!(compute_sentiment_percentage(&[], Polarity::Positive).is_empty());
        assert!(compute_mention_frequency(&[]).is_empty());
        assert_eq!(compute_mention_frequency(&[]), DerivedMatrix::empty());
    }

    #[test]
    fn cells_iterate_row_major_in_category_order() {
        let matrix = compute_mention_frequency(&[Review::new("A, One"), Review::new("B, Two")]);
        let cells: Vec<(&str, Category)> = matrix.cells().map(|(l, c, _)| (l, c)).collect();
        assert_eq!(cells.len(), 2 * Category::COUNT);
        assert_eq!(cells[0], ("One", Category::Cleanliness));
        assert_eq!(cells[6], ("One", Category::StaffAttitude));
        assert_eq!(cells[7], ("Two", Category::Cleanliness));
    }

    #[test]
    fn matrix_serializes_with_camel_case_keys() {
        let matrix = compute_mention_frequency(&[Review::new("A, One")]);
        let value = serde_json::to_value(&matrix).expect("serialize");
        assert_eq!(value["locationNames"][0], "One");
        assert_eq!(value["data"][0].as_array().map(Vec::len), Some(7));
    }
}
