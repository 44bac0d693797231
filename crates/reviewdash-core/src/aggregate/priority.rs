use serde::{Deserialize, Serialize};

use super::percentage;
use crate::model::{Category, Review, Sentiment};

/// Fixed cut-offs for flagging a category as high priority.
///
/// A category is high priority when its mention frequency **and** its
/// negative share both strictly exceed the thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorityThresholds {
    /// Minimum mention frequency, in percent.
    pub frequency: f64,
    /// Minimum share of mentions that are negative, in percent.
    pub negative_pct: f64,
}

impl Default for PriorityThresholds {
    fn default() -> Self {
        Self {
            frequency: 40.0,
            negative_pct: 60.0,
        }
    }
}

/// Global (all-location) statistics for one category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryPriority {
    pub category: Category,
    /// Mentions / total reviews × 100.
    pub frequency: f64,
    /// Negative mentions / mentions × 100; 0 with no mentions.
    pub negative_pct: f64,
    /// Raw negative mention count; bubble-size weight in the priority matrix.
    pub negative_count: usize,
    pub mention_count: usize,
}

impl CategoryPriority {
    #[must_use]
    pub fn is_high_priority(&self, thresholds: &PriorityThresholds) -> bool {
        self.frequency > thresholds.frequency && self.negative_pct > thresholds.negative_pct
    }

    /// Frequency and negativity blended into a single `[0, 100]` value.
    #[must_use]
    pub fn severity(&self) -> f64 {
        self.frequency * self.negative_pct / 100.0
    }
}

/// Per-category priority statistics in [`Category::ALL`] order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PriorityRanking {
    pub categories: Vec<CategoryPriority>,
}

impl PriorityRanking {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Statistics for one category, if the ranking is non-empty.
    #[must_use]
    pub fn get(&self, category: Category) -> Option<&CategoryPriority> {
        self.categories.iter().find(|entry| entry.category == category)
    }

    /// Categories exceeding both thresholds, in catalog order.
    #[must_use]
    pub fn high_priority(&self, thresholds: &PriorityThresholds) -> Vec<&CategoryPriority> {
        self.categories
            .iter()
            .filter(|entry| entry.is_high_priority(thresholds))
            .collect()
    }

    /// Categories ordered by descending [`CategoryPriority::severity`]; ties
    /// keep catalog order.
    #[must_use]
    pub fn ranked(&self) -> Vec<&CategoryPriority> {
        let mut ranked: Vec<&CategoryPriority> = self.categories.iter().collect();
        ranked.sort_by(|a, b| b.severity().total_cmp(&a.severity()));
        ranked
    }
}

/// Rank categories across the whole input, ignoring location.
///
/// Empty input yields an empty ranking.
#[must_use]
pub fn compute_priority_ranking(reviews: &[Review]) -> PriorityRanking {
    if reviews.is_empty() {
        return PriorityRanking::default();
    }

    let categories = Category::ALL
        .into_iter()
        .map(|category| {
            let mention_count = reviews
                .iter()
                .filter(|review| review.sentiment(category).is_mention())
                .count();
            let negative_count = reviews
                .iter()
                .filter(|review| review.sentiment(category) == Sentiment::Negative)
                .count();

            CategoryPriority {
                category,
                frequency: percentage(mention_count, reviews.len()),
                negative_pct: percentage(negative_count, mention_count),
                negative_count,
                mention_count,
            }
        })
        .collect();

    PriorityRanking { categories }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_approx_eq(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    fn sample() -> Vec<Review> {
        vec![
            Review::new("1 Elm, Alpha")
                .with_mention(Category::Price, Sentiment::Negative, 4.0)
                .with_mention(Category::Crowding, Sentiment::Positive, 2.0),
            Review::new("2 Oak, Beta").with_mention(Category::Price, Sentiment::Negative, 3.0),
            Review::new("2 Oak, Beta").with_mention(Category::Price, Sentiment::Positive, 1.0),
            Review::new("1 Elm, Alpha"),
        ]
    }

    #[test]
    fn ranking_is_global_across_locations() {
        let ranking = compute_priority_ranking(&sample());
        assert_eq!(ranking.categories.len(), Category::COUNT);

        let price = ranking.get(Category::Price).expect("price present");
        assert_eq!(price.mention_count, 3);
        assert_eq!(price.negative_count, 2);
        assert_approx_eq(price.frequency, 75.0);
        assert_approx_eq(price.negative_pct, 200.0 / 3.0);

        let cleanliness = ranking.get(Category::Cleanliness).expect("present");
        assert_eq!(cleanliness.mention_count, 0);
        assert_approx_eq(cleanliness.negative_pct, 0.0);
    }

    #[test]
    fn categories_are_in_catalog_order() {
        let ranking = compute_priority_ranking(&sample());
        let order: Vec<Category> = ranking.categories.iter().map(|c| c.category).collect();
        assert_eq!(order, Category::ALL);
    }

    #[test]
    fn high_priority_uses_strict_thresholds() {
        let ranking = compute_priority_ranking(&sample());
        let flagged = ranking.high_priority(&PriorityThresholds::default());
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].category, Category::Price);

        let at_boundary = CategoryPriority {
            category: Category::Price,
            frequency: 40.0,
            negative_pct: 90.0,
            negative_count: 4,
            mention_count: 4,
        };
        assert!(!at_boundary.is_high_priority(&PriorityThresholds::default()));
    }

    #[test]
    fn ranked_orders_by_severity() {
        let ranking = compute_priority_ranking(&sample());
        let ranked = ranking.ranked();
        assert_eq!(ranked[0].category, Category::Price);
        // Zero-severity categories keep catalog order after the leaders.
        assert_eq!(ranked.last().map(|c| c.category), Some(Category::StaffAttitude));
    }

    #[test]
    fn empty_input_yields_empty_ranking() {
        let ranking = compute_priority_ranking(&[]);
        assert!(ranking.is_empty());
        assert!(ranking.high_priority(&PriorityThresholds::default()).is_empty());
    }
}
