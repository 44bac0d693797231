//! Raw review and mention counts per location.

use serde::{Deserialize, Serialize};

use super::group_by_location;
use crate::model::{Category, Review, Sentiment};

/// Number of reviews carrying one location label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationCount {
    pub location: String,
    pub count: usize,
}

/// Positive and negative mention counts of one category at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCounts {
    pub location: String,
    pub positive: usize,
    pub negative: usize,
}

/// Reviews per location label, most-reviewed first.
///
/// Unlike the matrices this groups by *label*, so two addresses in the same
/// town are counted together. Ties keep first-seen order.
#[must_use]
pub fn compute_review_counts(reviews: &[Review]) -> Vec<LocationCount> {
    let mut counts: Vec<LocationCount> = Vec::new();
    for review in reviews {
        let label = review.location_label();
        match counts.iter_mut().find(|entry| entry.location == label) {
            Some(entry) => entry.count += 1,
            None => counts.push(LocationCount {
                location: label,
                count: 1,
            }),
        }
    }
    // Stable sort keeps first-seen order among equal counts.
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

/// Positive/negative mention counts for `category`, one entry per address in
/// first-seen order.
#[must_use]
pub fn compute_sentiment_counts(reviews: &[Review], category: Category) -> Vec<SentimentCounts> {
    group_by_location(reviews)
        .into_iter()
        .map(|group| {
            let count_of = |sentiment: Sentiment| {
                group
                    .reviews
                    .iter()
                    .filter(|review| review.sentiment(category) == sentiment)
                    .count()
            };
            SentimentCounts {
                positive: count_of(Sentiment::Positive),
                negative: count_of(Sentiment::Negative),
                location: group.label,
            }
        })
        .collect()
}
