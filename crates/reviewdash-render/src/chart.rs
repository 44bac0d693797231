//! Vega-Lite chart specifications.
//!
//! Every builder maps an aggregator result onto a fixed Vega-Lite shape. Axis
//! order is always explicit: categories in [`Category::ALL`] order, locations
//! in the first-seen order the aggregator returned, so re-rendering the same
//! data yields the same picture.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use reviewdash_core::aggregate::{
    DerivedMatrix, PriorityThresholds, compute_mention_frequency, compute_priority_ranking,
    compute_review_counts, compute_sentiment_counts, compute_sentiment_percentage,
    compute_weighted_score,
};
use reviewdash_core::model::{Category, Polarity, Review};
use serde::Serialize;
use serde_json::{Map, Value, json};

pub const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v6.json";

/// Default chart title prefix.
pub const DEFAULT_BRAND: &str = "Bandon Fitness";

/// Categories with a dedicated grouped bar chart, in report order.
pub const GROUPED_CATEGORIES: [Category; 3] = [
    Category::MembershipBilling,
    Category::EquipmentQuality,
    Category::CustomerService,
];

// ---------------------------------------------------------------------------
// Chart spec
// ---------------------------------------------------------------------------

/// A complete Vega-Lite document, treated as opaque JSON by consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ChartSpec(Value);

impl ChartSpec {
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Title text, whether given as a string or a `{text, subtitle}` object.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        let title = self.0.get("title")?;
        title
            .as_str()
            .or_else(|| title.get("text").and_then(Value::as_str))
    }

    /// Inline data rows.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        self.0
            .pointer("/data/values")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// `true` when there is nothing to draw.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }

    /// Pretty-printed JSON document.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json` error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Chart kinds
// ---------------------------------------------------------------------------

/// Every chart the dashboard can draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    /// Positive and negative weighted scores side by side.
    Weighted,
    Sentiment(Polarity),
    Mentions,
    Grouped(Category),
    Priority,
    ReviewCounts,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Weighted => f.write_str("weighted"),
            Self::Sentiment(polarity) => f.write_str(polarity.as_str()),
            Self::Mentions => f.write_str("mentions"),
            Self::Grouped(category) => write!(f, "grouped-{category}"),
            Self::Priority => f.write_str("priority"),
            Self::ReviewCounts => f.write_str("counts"),
        }
    }
}

/// Error returned when parsing a chart kind name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown chart kind '{raw}'")]
pub struct UnknownChartKind {
    pub raw: String,
}

impl FromStr for ChartKind {
    type Err = UnknownChartKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownChartKind { raw: s.to_string() };
        let normalized = s.trim().to_ascii_lowercase();
        if let Some(category) = normalized.strip_prefix("grouped-") {
            return category
                .parse::<Category>()
                .map(Self::Grouped)
                .map_err(|_| unknown());
        }
        match normalized.as_str() {
            "weighted" => Ok(Self::Weighted),
            "positive" => Ok(Self::Sentiment(Polarity::Positive)),
            "negative" => Ok(Self::Sentiment(Polarity::Negative)),
            "mentions" => Ok(Self::Mentions),
            "priority" => Ok(Self::Priority),
            "counts" => Ok(Self::ReviewCounts),
            _ => Err(unknown()),
        }
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Chart builder over one file's review rows.
#[derive(Debug, Clone)]
pub struct Charts<'a> {
    reviews: &'a [Review],
    brand: String,
    thresholds: PriorityThresholds,
}

impl<'a> Charts<'a> {
    #[must_use]
    pub fn new(reviews: &'a [Review]) -> Self {
        Self {
            reviews,
            brand: DEFAULT_BRAND.to_string(),
            thresholds: PriorityThresholds::default(),
        }
    }

    #[must_use]
    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = brand.into();
        self
    }

    #[must_use]
    pub const fn with_thresholds(mut self, thresholds: PriorityThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    #[must_use]
    pub fn build(&self, kind: ChartKind) -> ChartSpec {
        match kind {
            ChartKind::Weighted => self.weighted_heatmap(),
            ChartKind::Sentiment(polarity) => self.sentiment_heatmap(polarity),
            ChartKind::Mentions => self.mention_heatmap(),
            ChartKind::Grouped(category) => self.grouped_bars(category),
            ChartKind::Priority => self.priority_matrix(),
            ChartKind::ReviewCounts => self.review_counts(),
        }
    }

    /// Positive and negative weighted scores as two offset heatmap layers.
    #[must_use]
    pub fn weighted_heatmap(&self) -> ChartSpec {
        let positive = compute_weighted_score(self.reviews, Polarity::Positive);
        let negative = compute_weighted_score(self.reviews, Polarity::Negative);

        let mut values = Vec::with_capacity(positive.rows() * Category::COUNT * 2);
        for (row, location) in positive.location_names.iter().enumerate() {
            for category in Category::ALL {
                for (polarity, matrix) in [(Polarity::Positive, &positive), (Polarity::Negative, &negative)] {
                    values.push(json!({
                        "location": location,
                        "category": category.as_str(),
                        "sentiment": polarity.label(),
                        "intensity": matrix.cell(row, category).unwrap_or_default(),
                    }));
                }
            }
        }

        let score_layer = |polarity: Polarity, scheme: &str| {
            json!({
                "mark": "rect",
                "transform": [{ "filter": format!("datum.sentiment === '{}'", polarity.label()) }],
                "encoding": {
                    "color": {
                        "aggregate": "mean",
                        "field": "intensity",
                        "type": "quantitative",
                        "scale": { "domain": [0, 100], "scheme": scheme },
                        "legend": { "title": format!("{} Score", polarity.label()) }
                    },
                    "tooltip": [
                        { "field": "location", "title": "Location" },
                        { "field": "category", "title": "Category" },
                        { "field": "sentiment", "title": "Sentiment" },
                        { "aggregate": "mean", "field": "intensity", "title": "Score", "format": ".1f" },
                        { "aggregate": "count", "title": "# Reviews" }
                    ]
                }
            })
        };

        ChartSpec(json!({
            "$schema": VEGA_LITE_SCHEMA,
            "data": { "values": values },
            "encoding": {
                "x": category_axis(-90),
                "y": location_axis(&positive),
                "xOffset": { "field": "sentiment", "type": "nominal", "sort": ["Positive", "Negative"] }
            },
            "layer": [
                score_layer(Polarity::Positive, "greens"),
                score_layer(Polarity::Negative, "reds"),
                {
                    "mark": { "type": "text", "color": "black", "fontSize": 9 },
                    "encoding": { "text": mean_label() }
                }
            ],
            "width": 800,
            "height": 120,
            "title": format!("{} - Weighted Positive vs Negative Score (% × Intensity)", self.brand),
            "resolve": { "scale": { "color": "independent" } },
            "config": { "axis": { "grid": true, "tickBand": "extent" } }
        }))
    }

    /// Share of mentions carrying `polarity`.
    #[must_use]
    pub fn sentiment_heatmap(&self, polarity: Polarity) -> ChartSpec {
        let matrix = compute_sentiment_percentage(self.reviews, polarity);
        let scheme = match polarity {
            Polarity::Positive => "greens",
            Polarity::Negative => "reds",
        };
        let legend = format!("{} %", polarity.label());
        heatmap(
            &matrix,
            scheme,
            &legend,
            (500, 120),
            -90,
            &format!(
                "{} - % {} Sentiment by Location & Category",
                self.brand,
                polarity.label()
            ),
        )
    }

    /// Share of reviews mentioning each category.
    #[must_use]
    pub fn mention_heatmap(&self) -> ChartSpec {
        let matrix = compute_mention_frequency(self.reviews);
        heatmap(
            &matrix,
            "blues",
            "Mention %",
            (600, 400),
            -45,
            &format!("{} - % Reviews Mentioning Each Category", self.brand),
        )
    }

    /// Positive vs negative mention counts of one category per location.
    #[must_use]
    pub fn grouped_bars(&self, category: Category) -> ChartSpec {
        let counts = compute_sentiment_counts(self.reviews, category);
        let mut values = Vec::with_capacity(counts.len() * 2);
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        for entry in &counts {
            if seen.insert(entry.location.as_str()) {
                order.push(entry.location.clone());
            }
            values.push(json!({ "location": entry.location, "sentiment": "Positive", "count": entry.positive }));
            values.push(json!({ "location": entry.location, "sentiment": "Negative", "count": entry.negative }));
        }

        ChartSpec(json!({
            "$schema": VEGA_LITE_SCHEMA,
            "data": { "values": values },
            "mark": "bar",
            "width": 300,
            "height": 200,
            "title": format!("{} - Sentiment by Location", category.label()),
            "encoding": {
                "x": {
                    "field": "location",
                    "type": "nominal",
                    "sort": order,
                    "axis": { "title": "Location", "labelAngle": -45 }
                },
                "y": {
                    "field": "count",
                    "type": "quantitative",
                    "axis": { "title": "Number of Mentions" }
                },
                "color": {
                    "field": "sentiment",
                    "type": "nominal",
                    "scale": { "domain": ["Positive", "Negative"], "range": ["#2ecc71", "#e74c3c"] },
                    "legend": { "title": "Sentiment" }
                },
                "xOffset": { "field": "sentiment", "sort": ["Positive", "Negative"] },
                "tooltip": [
                    { "field": "location", "title": "Location" },
                    { "field": "sentiment", "title": "Sentiment" },
                    { "field": "count", "title": "Count" }
                ]
            },
            "config": { "axis": { "grid": true } }
        }))
    }

    /// Frequency × negativity bubble chart with the high-priority quadrant
    /// marked at the configured thresholds.
    #[must_use]
    pub fn priority_matrix(&self) -> ChartSpec {
        let ranking = compute_priority_ranking(self.reviews);
        let values: Vec<Value> = ranking
            .categories
            .iter()
            .map(|entry| {
                json!({
                    "category": entry.category.label(),
                    "frequency": entry.frequency,
                    "negative_pct": entry.negative_pct,
                    "negative_count": entry.negative_count,
                    "high_priority": entry.is_high_priority(&self.thresholds),
                })
            })
            .collect();

        let threshold_rule = |channel: &str, at: f64| {
            let mut encoding = Map::new();
            encoding.insert(channel.to_string(), json!({ "datum": at }));
            json!({
                "mark": { "type": "rule", "strokeDash": [4, 4], "color": "#999", "size": 1 },
                "encoding": encoding
            })
        };

        ChartSpec(json!({
            "$schema": VEGA_LITE_SCHEMA,
            "data": { "values": values },
            "width": 700,
            "height": 500,
            "title": {
                "text": "Priority Matrix: Issue Frequency vs Negative Sentiment",
                "subtitle": "(Bubble size = # of negative mentions)",
                "fontSize": 16
            },
            "layer": [
                threshold_rule("x", self.thresholds.frequency),
                threshold_rule("y", self.thresholds.negative_pct),
                {
                    "mark": { "type": "circle", "opacity": 0.7, "stroke": "#333", "strokeWidth": 0.5 },
                    "encoding": {
                        "x": {
                            "field": "frequency",
                            "type": "quantitative",
                            "scale": { "domain": [0, 100] },
                            "axis": { "title": "Frequency of Mentions (%)", "grid": true }
                        },
                        "y": {
                            "field": "negative_pct",
                            "type": "quantitative",
                            "scale": { "domain": [0, 110] },
                            "axis": { "title": "% Negative When Mentioned", "grid": true }
                        },
                        "size": {
                            "field": "negative_count",
                            "type": "quantitative",
                            "scale": { "type": "sqrt", "range": [1000, 8000] },
                            "legend": null
                        },
                        "color": {
                            "field": "negative_pct",
                            "type": "quantitative",
                            "scale": {
                                "type": "linear",
                                "domain": [0, 50, 100],
                                "range": ["#4caf50", "#ffeb3b", "#c62828"]
                            },
                            "legend": { "title": "% Negative", "orient": "right", "gradientLength": 200 }
                        },
                        "tooltip": [
                            { "field": "category", "title": "Category" },
                            { "field": "frequency", "title": "Frequency %", "format": ".1f" },
                            { "field": "negative_pct", "title": "% Negative", "format": ".1f" },
                            { "field": "negative_count", "title": "# Negative Mentions" }
                        ]
                    }
                },
                {
                    "mark": { "type": "text", "dy": -20, "fontSize": 10, "fontWeight": "bold" },
                    "encoding": {
                        "x": { "field": "frequency", "type": "quantitative" },
                        "y": { "field": "negative_pct", "type": "quantitative" },
                        "text": { "field": "category", "type": "nominal" }
                    }
                },
                {
                    "mark": { "type": "rect", "fill": "white", "stroke": "#c62828", "strokeWidth": 1 },
                    "encoding": {
                        "x": { "datum": 86 },
                        "x2": { "datum": 100 },
                        "y": { "datum": 100 },
                        "y2": { "datum": 105 }
                    }
                },
                {
                    "mark": {
                        "type": "text",
                        "text": "HIGH PRIORITY",
                        "fontSize": 12,
                        "fontWeight": "bold",
                        "color": "#c62828",
                        "align": "right",
                        "baseline": "bottom",
                        "dx": -5,
                        "dy": -3
                    },
                    "encoding": { "x": { "datum": 100 }, "y": { "datum": 100 } }
                }
            ],
            "config": {
                "view": { "stroke": "#ddd", "strokeWidth": 1 },
                "background": "#fafafa"
            }
        }))
    }

    /// Reviews per location label, most-reviewed first.
    #[must_use]
    pub fn review_counts(&self) -> ChartSpec {
        let counts = compute_review_counts(self.reviews);
        ChartSpec(json!({
            "$schema": VEGA_LITE_SCHEMA,
            "data": { "values": counts },
            "mark": { "type": "bar", "color": "#4682b4" },
            "width": 600,
            "height": 400,
            "title": "Number of Reviews by Location",
            "encoding": {
                "x": {
                    "field": "location",
                    "type": "ordinal",
                    "axis": { "title": "Location", "labelAngle": -45 },
                    "sort": "-y"
                },
                "y": {
                    "field": "count",
                    "type": "quantitative",
                    "axis": { "title": "Number of Reviews" }
                },
                "tooltip": [
                    { "field": "location", "title": "Location" },
                    { "field": "count", "title": "Number of Reviews" }
                ]
            },
            "config": { "axis": { "grid": true } }
        }))
    }
}

fn heatmap(
    matrix: &DerivedMatrix,
    scheme: &str,
    legend: &str,
    (width, height): (u32, u32),
    label_angle: i32,
    title: &str,
) -> ChartSpec {
    let values: Vec<Value> = matrix
        .cells()
        .map(|(location, category, value)| {
            json!({
                "location": location,
                "category": category.as_str(),
                "intensity": value,
            })
        })
        .collect();

    ChartSpec(json!({
        "$schema": VEGA_LITE_SCHEMA,
        "data": { "values": values },
        "layer": [
            {
                "mark": "rect",
                "encoding": {
                    "x": category_axis(label_angle),
                    "y": location_axis(matrix),
                    "color": {
                        "aggregate": "mean",
                        "field": "intensity",
                        "type": "quantitative",
                        "scale": { "domain": [0, 100], "scheme": scheme },
                        "legend": { "title": legend }
                    },
                    "tooltip": [
                        { "field": "location", "title": "Location" },
                        { "field": "category", "title": "Category" },
                        { "aggregate": "mean", "field": "intensity", "title": legend, "format": ".1f" },
                        { "aggregate": "count", "title": "# Reviews" }
                    ]
                }
            },
            {
                "mark": { "type": "text", "color": "black" },
                "encoding": {
                    "x": { "field": "category", "type": "ordinal", "sort": category_sort() },
                    "y": { "field": "location", "type": "ordinal", "sort": location_sort(matrix) },
                    "text": mean_label()
                }
            }
        ],
        "width": width,
        "height": height,
        "title": title,
        "config": { "axis": { "grid": true, "tickBand": "extent" } }
    }))
}

fn category_sort() -> Vec<&'static str> {
    Category::ALL.into_iter().map(Category::as_str).collect()
}

/// Distinct location labels in first-seen order.
fn location_sort(matrix: &DerivedMatrix) -> Vec<&str> {
    let mut seen = HashSet::new();
    matrix
        .location_names
        .iter()
        .map(String::as_str)
        .filter(|name| seen.insert(*name))
        .collect()
}

fn category_axis(label_angle: i32) -> Value {
    json!({
        "field": "category",
        "type": "ordinal",
        "sort": category_sort(),
        "axis": { "title": "Category", "labelAngle": label_angle }
    })
}

fn location_axis(matrix: &DerivedMatrix) -> Value {
    json!({
        "field": "location",
        "type": "ordinal",
        "sort": location_sort(matrix),
        "axis": { "title": "Location" }
    })
}

fn mean_label() -> Value {
    json!({ "aggregate": "mean", "field": "intensity", "type": "quantitative", "format": ".1f" })
}
