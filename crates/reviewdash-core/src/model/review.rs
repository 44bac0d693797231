//! Raw review rows as produced by the server-side sentiment pipeline.
//!
//! A row is a flat JSON object keyed by spreadsheet column names:
//!
//! ```text
//! { "PLACE ADDRESS": "123 Main St, Springfield, IL",
//!   "cleanliness_sentiment": "negative", "cleanliness_intensity": 4, ... }
//! ```
//!
//! Rows are decoded once at ingest into [`Review`], which stores exactly one
//! [`CategoryMention`] per [`Category`] in catalog order. Everything
//! downstream indexes by [`Category::index`].

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::ErrorCode;

/// Preferred address column.
pub const ADDRESS_FIELD: &str = "PLACE ADDRESS";

/// Tolerated alias for [`ADDRESS_FIELD`].
pub const ADDRESS_FIELD_ALIAS: &str = "PLACE_ADDRESS";

/// Labels fall back to this many characters when the address has no comma.
pub const LOCATION_LABEL_MAX_CHARS: usize = 30;

/// The seven review topics, in the ordinal order used for every matrix
/// column and every chart axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Cleanliness,
    Crowding,
    CustomerService,
    EquipmentQuality,
    MembershipBilling,
    Price,
    StaffAttitude,
}

/// Error returned when parsing an unknown category name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "unknown category '{raw}': expected one of cleanliness, crowding, customer_service, \
     equipment_quality, membership_billing, price, staff_attitude"
)]
pub struct UnknownCategory {
    /// The unrecognised input string.
    pub raw: String,
}

impl Category {
    /// Number of categories; the column count of every derived matrix.
    pub const COUNT: usize = 7;

    /// All categories in catalog order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Cleanliness,
        Self::Crowding,
        Self::CustomerService,
        Self::EquipmentQuality,
        Self::MembershipBilling,
        Self::Price,
        Self::StaffAttitude,
    ];

    /// Snake-case field stem, e.g. `customer_service`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cleanliness => "cleanliness",
            Self::Crowding => "crowding",
            Self::CustomerService => "customer_service",
            Self::EquipmentQuality => "equipment_quality",
            Self::MembershipBilling => "membership_billing",
            Self::Price => "price",
            Self::StaffAttitude => "staff_attitude",
        }
    }

    /// Title-case display label, e.g. `Customer Service`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cleanliness => "Cleanliness",
            Self::Crowding => "Crowding",
            Self::CustomerService => "Customer Service",
            Self::EquipmentQuality => "Equipment Quality",
            Self::MembershipBilling => "Membership Billing",
            Self::Price => "Price",
            Self::StaffAttitude => "Staff Attitude",
        }
    }

    /// Column position of this category in every derived matrix.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Name of the `<category>_sentiment` column.
    #[must_use]
    pub fn sentiment_field(self) -> String {
        format!("{}_sentiment", self.as_str())
    }

    /// Name of the `<category>_intensity` column.
    #[must_use]
    pub fn intensity_field(self) -> String {
        format!("{}_intensity", self.as_str())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the field stem (`membership_billing`) or the display label
/// (`Membership Billing`), case-insensitively.
impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .ok_or_else(|| UnknownCategory { raw: s.to_string() })
    }
}

impl Serialize for Category {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Classified sentiment of one category within one review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    /// The classifier produced no usable verdict (the server writes `"error"`).
    /// Counts as a mention but matches neither polarity.
    #[serde(rename = "error", alias = "unclassified")]
    Unclassified,
}

/// Error returned when parsing a sentiment name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sentiment '{raw}': expected positive, negative, neutral or error")]
pub struct UnknownSentiment {
    pub raw: String,
}

impl Sentiment {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
            Self::Unclassified => "error",
        }
    }

    /// A review mentions a category when its sentiment is not neutral.
    #[must_use]
    pub const fn is_mention(self) -> bool {
        !matches!(self, Self::Neutral)
    }

    /// Lenient decoding of one sentiment cell.
    ///
    /// Missing and null cells are neutral; anything unrecognised is
    /// [`Sentiment::Unclassified`], so one bad cell never rejects a row.
    #[must_use]
    pub fn from_cell(cell: Option<&Value>) -> Self {
        match cell {
            None | Some(Value::Null) => Self::Neutral,
            Some(Value::String(raw)) => raw.parse().unwrap_or(Self::Unclassified),
            Some(_) => Self::Unclassified,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = UnknownSentiment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            "neutral" => Ok(Self::Neutral),
            "error" | "unclassified" => Ok(Self::Unclassified),
            _ => Err(UnknownSentiment { raw: s.to_string() }),
        }
    }
}

/// Which non-neutral subset an aggregator computes over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Negative,
}

impl Polarity {
    pub const ALL: [Self; 2] = [Self::Positive, Self::Negative];

    #[must_use]
    pub const fn as_sentiment(self) -> Sentiment {
        match self {
            Self::Positive => Sentiment::Positive,
            Self::Negative => Sentiment::Negative,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
        }
    }

    /// Title-case label used in legends and tooltips.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Negative => "Negative",
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a polarity name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown polarity '{raw}': expected positive or negative")]
pub struct UnknownPolarity {
    pub raw: String,
}

impl FromStr for Polarity {
    type Err = UnknownPolarity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            _ => Err(UnknownPolarity { raw: s.to_string() }),
        }
    }
}

/// Sentiment and intensity for one category of one review.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryMention {
    pub sentiment: Sentiment,
    /// Severity on a 0–5 scale. Missing or non-finite input is stored as 0.
    pub intensity: f64,
}

impl Default for CategoryMention {
    fn default() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            intensity: 0.0,
        }
    }
}

/// Errors raised while decoding a review row.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReviewError {
    /// The row is not a JSON object.
    #[error("review row must be a JSON object, found {0}")]
    NotAnObject(String),
}

impl ReviewError {
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        ErrorCode::InvalidReviewRow
    }
}

/// One customer review, immutable once ingested.
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    address: String,
    mentions: [CategoryMention; Category::COUNT],
}

impl Review {
    /// A review at `address` with every category neutral.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            mentions: [CategoryMention::default(); Category::COUNT],
        }
    }

    /// Set one category's sentiment and intensity.
    #[must_use]
    pub fn with_mention(mut self, category: Category, sentiment: Sentiment, intensity: f64) -> Self {
        self.mentions[category.index()] = CategoryMention {
            sentiment,
            intensity: sanitize_intensity(Some(intensity)),
        };
        self
    }

    /// Full address string; the grouping key for every per-location matrix.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    #[must_use]
    pub const fn mention(&self, category: Category) -> CategoryMention {
        self.mentions[category.index()]
    }

    #[must_use]
    pub const fn sentiment(&self, category: Category) -> Sentiment {
        self.mentions[category.index()].sentiment
    }

    #[must_use]
    pub const fn intensity(&self, category: Category) -> f64 {
        self.mentions[category.index()].intensity
    }

    /// Short display label derived from the address; see [`location_label`].
    #[must_use]
    pub fn location_label(&self) -> String {
        location_label(&self.address)
    }

    /// Decode a flat JSON row.
    ///
    /// Never fails on cell contents: sentiments go through
    /// [`Sentiment::from_cell`] and bad intensities become 0.
    #[must_use]
    pub fn from_row(row: &Map<String, Value>) -> Self {
        let address = [ADDRESS_FIELD, ADDRESS_FIELD_ALIAS]
            .iter()
            .filter_map(|field| row.get(*field).and_then(Value::as_str))
            .find(|value| !value.is_empty())
            .unwrap_or_default()
            .to_string();

        let mut review = Self::new(address);
        for category in Category::ALL {
            let sentiment = Sentiment::from_cell(row.get(&category.sentiment_field()));
            if sentiment == Sentiment::Unclassified {
                debug!(field = %category.sentiment_field(), "unclassified sentiment cell");
            }
            let intensity = row
                .get(&category.intensity_field())
                .and_then(|value| match value {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().parse().ok(),
                    _ => None,
                });
            review.mentions[category.index()] = CategoryMention {
                sentiment,
                intensity: sanitize_intensity(intensity),
            };
        }
        review
    }
}

fn sanitize_intensity(raw: Option<f64>) -> f64 {
    raw.filter(|value| value.is_finite()).unwrap_or(0.0)
}

/// Derive a short location label from a full address.
///
/// The label is the second comma-separated segment, trimmed
/// (`"123 Main St, Springfield, IL"` → `"Springfield"`). Addresses without a
/// comma are truncated to the first [`LOCATION_LABEL_MAX_CHARS`] characters.
#[must_use]
pub fn location_label(address: &str) -> String {
    match address.split(',').nth(1) {
        Some(segment) => segment.trim().to_string(),
        None => address.chars().take(LOCATION_LABEL_MAX_CHARS).collect(),
    }
}

impl<'de> Deserialize<'de> for Review {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::Object(row) => Ok(Self::from_row(&row)),
            other => Err(serde::de::Error::custom(ReviewError::NotAnObject(
                other.to_string(),
            ))),
        }
    }
}

/// Serializes back to the flat column layout accepted by [`Review::from_row`].
impl Serialize for Review {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1 + 2 * Category::COUNT))?;
        map.serialize_entry(ADDRESS_FIELD, &self.address)?;
        for category in Category::ALL {
            let mention = self.mention(category);
            map.serialize_entry(&category.sentiment_field(), mention.sentiment.as_str())?;
            map.serialize_entry(&category.intensity_field(), &mention.intensity)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn category_order_is_fixed() {
        let names: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(
            names,
            [
                "cleanliness",
                "crowding",
                "customer_service",
                "equipment_quality",
                "membership_billing",
                "price",
                "staff_attitude"
            ]
        );
        for (i, category) in Category::ALL.iter().enumerate() {
            assert_eq!(category.index(), i);
        }
    }

    #[test]
    fn category_parses_label_and_field_name() {
        assert_eq!(
            "Membership Billing".parse::<Category>(),
            Ok(Category::MembershipBilling)
        );
        assert_eq!(
            "equipment_quality".parse::<Category>(),
            Ok(Category::EquipmentQuality)
        );
        assert_eq!("  Customer   Service ".parse::<Category>(), Ok(Category::CustomerService));
        let err = "parking".parse::<Category>().unwrap_err();
        assert!(err.to_string().contains("parking"));
    }

    #[test]
    fn location_label_uses_second_segment() {
        assert_eq!(location_label("123 Main St, Springfield"), "Springfield");
        assert_eq!(location_label("1 Elm, Shelbyville, IL"), "Shelbyville");
        assert_eq!(location_label("Trailing comma,"), "");
    }

    #[test]
    fn location_label_truncates_without_comma() {
        let long = "A".repeat(45);
        assert_eq!(location_label(&long).chars().count(), 30);
        assert_eq!(location_label("Short"), "Short");
        // Multi-byte characters are counted, not bytes.
        let accented = "é".repeat(40);
        assert_eq!(location_label(&accented), "é".repeat(30));
    }

    #[test]
    fn from_row_reads_sentiments_and_intensities() {
        let review = Review::from_row(&row(json!({
            "PLACE ADDRESS": "123 Main St, Springfield",
            "cleanliness_sentiment": "negative",
            "cleanliness_intensity": 4,
            "price_sentiment": "Positive",
            "price_intensity": "2.5"
        })));

        assert_eq!(review.address(), "123 Main St, Springfield");
        assert_eq!(review.sentiment(Category::Cleanliness), Sentiment::Negative);
        assert!((review.intensity(Category::Cleanliness) - 4.0).abs() < f64::EPSILON);
        assert_eq!(review.sentiment(Category::Price), Sentiment::Positive);
        assert!((review.intensity(Category::Price) - 2.5).abs() < f64::EPSILON);
        assert_eq!(review.sentiment(Category::Crowding), Sentiment::Neutral);
    }

    #[test]
    fn from_row_falls_back_to_address_alias() {
        let review = Review::from_row(&row(json!({
            "PLACE ADDRESS": "",
            "PLACE_ADDRESS": "9 Oak Rd, Capital City"
        })));
        assert_eq!(review.address(), "9 Oak Rd, Capital City");
        assert_eq!(review.location_label(), "Capital City");

        let missing = Review::from_row(&Map::new());
        assert_eq!(missing.address(), "");
    }

    #[test]
    fn null_sentiment_and_intensity_are_neutral_and_zero() {
        let review = Review::from_row(&row(json!({
            "PLACE ADDRESS": "x",
            "crowding_sentiment": null,
            "crowding_intensity": null,
            "price_sentiment": "negative",
            "price_intensity": null
        })));
        assert_eq!(review.sentiment(Category::Crowding), Sentiment::Neutral);
        assert_eq!(review.sentiment(Category::Price), Sentiment::Negative);
        assert!(review.intensity(Category::Price).abs() < f64::EPSILON);
    }

    #[test]
    fn unrecognised_sentiment_is_an_unclassified_mention() {
        let review = Review::from_row(&row(json!({
            "PLACE ADDRESS": "x",
            "price_sentiment": "error",
            "price_intensity": 0,
            "crowding_sentiment": "meh",
            "cleanliness_sentiment": 3
        })));
        for category in [Category::Price, Category::Crowding, Category::Cleanliness] {
            let sentiment = review.sentiment(category);
            assert_eq!(sentiment, Sentiment::Unclassified);
            assert!(sentiment.is_mention());
            assert!(Polarity::ALL.iter().all(|p| p.as_sentiment() != sentiment));
        }
        assert_eq!(review.sentiment(Category::StaffAttitude), Sentiment::Neutral);
    }

    #[test]
    fn unclassified_sentiment_serializes_as_error() {
        let review = Review::new("1 Elm, Alpha").with_mention(
            Category::Price,
            Sentiment::Unclassified,
            0.0,
        );
        let value = serde_json::to_value(&review).expect("serialize");
        assert_eq!(value["price_sentiment"], "error");
        let back: Review = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, review);
        assert_eq!(
            serde_json::to_value(Sentiment::Unclassified).expect("serialize"),
            json!("error")
        );
    }

    #[test]
    fn parse_errors_name_the_input() {
        assert_eq!(
            "Error".parse::<Sentiment>(),
            Ok(Sentiment::Unclassified)
        );
        assert_eq!(
            "meh".parse::<Sentiment>(),
            Err(UnknownSentiment {
                raw: "meh".to_string()
            })
        );
        let err = "sideways".parse::<Polarity>().unwrap_err();
        assert_eq!(err.raw, "sideways");
        assert!(err.to_string().contains("positive or negative"));
    }

    #[test]
    fn serde_roundtrip_preserves_row() {
        let review = Review::new("1 Elm, Shelbyville")
            .with_mention(Category::StaffAttitude, Sentiment::Positive, 3.0);
        let text = serde_json::to_string(&review).expect("serialize");
        let back: Review = serde_json::from_str(&text).expect("deserialize");
        assert_eq!(back, review);
    }

    #[test]
    fn non_object_row_is_rejected() {
        let err = serde_json::from_str::<Review>("[1, 2]").unwrap_err();
        assert!(err.to_string().contains("JSON object"));
        assert_eq!(
            ReviewError::NotAnObject("42".to_string()).error_code(),
            ErrorCode::InvalidReviewRow
        );
    }

    #[test]
    fn with_mention_sanitizes_non_finite_intensity() {
        let review = Review::new("x").with_mention(Category::Price, Sentiment::Negative, f64::NAN);
        assert!(review.intensity(Category::Price).abs() < f64::EPSILON);
    }
}
