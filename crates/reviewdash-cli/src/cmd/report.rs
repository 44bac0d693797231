//! `rdash report`: derived matrices and rankings for one results file.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, ValueEnum};
use reviewdash_core::aggregate::{
    CategoryPriority, DerivedMatrix, LocationCount, PriorityThresholds, compute_mention_frequency,
    compute_priority_ranking, compute_review_counts, compute_sentiment_percentage,
    compute_weighted_score,
};
use reviewdash_core::model::{Category, Polarity, Review};
use serde::Serialize;

use crate::output::{OutputMode, fmt_value, pretty_section, render_mode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Metric {
    /// Intensity-weighted share of reviews with the chosen polarity.
    Weighted,
    /// Share of mentions with the chosen polarity.
    Sentiment,
    /// Share of reviews mentioning each category.
    Mentions,
    /// Global frequency vs. negativity ranking.
    Priority,
    /// Number of reviews per location.
    Counts,
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Review rows as a JSON array, or a file record with `results`.
    pub input: PathBuf,

    /// Which derived view to print.
    #[arg(short, long, value_enum, default_value = "weighted")]
    pub metric: Metric,

    /// Polarity for the weighted and sentiment metrics.
    #[arg(short, long, default_value = "positive")]
    pub polarity: Polarity,
}

#[derive(Debug, Serialize)]
pub struct PriorityRow {
    #[serde(flatten)]
    pub stats: CategoryPriority,
    pub severity: f64,
    pub high_priority: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "metric", rename_all = "snake_case")]
pub enum ReportOutput {
    Weighted {
        polarity: Polarity,
        matrix: DerivedMatrix,
    },
    Sentiment {
        polarity: Polarity,
        matrix: DerivedMatrix,
    },
    Mentions {
        matrix: DerivedMatrix,
    },
    Priority {
        thresholds: PriorityThresholds,
        categories: Vec<PriorityRow>,
    },
    Counts {
        locations: Vec<LocationCount>,
    },
}

impl ReportOutput {
    pub fn build(
        reviews: &[Review],
        metric: Metric,
        polarity: Polarity,
        thresholds: PriorityThresholds,
    ) -> Self {
        match metric {
            Metric::Weighted => Self::Weighted {
                polarity,
                matrix: compute_weighted_score(reviews, polarity),
            },
            Metric::Sentiment => Self::Sentiment {
                polarity,
                matrix: compute_sentiment_percentage(reviews, polarity),
            },
            Metric::Mentions => Self::Mentions {
                matrix: compute_mention_frequency(reviews),
            },
            Metric::Priority => Self::Priority {
                thresholds,
                categories: compute_priority_ranking(reviews)
                    .ranked()
                    .into_iter()
                    .map(|stats| PriorityRow {
                        stats: *stats,
                        severity: stats.severity(),
                        high_priority: stats.is_high_priority(&thresholds),
                    })
                    .collect(),
            },
            Metric::Counts => Self::Counts {
                locations: compute_review_counts(reviews),
            },
        }
    }

    fn title(&self) -> String {
        match self {
            Self::Weighted { polarity, .. } => {
                format!("{} Weighted Score by Location", polarity.label())
            }
            Self::Sentiment { polarity, .. } => {
                format!("{} Sentiment Percentage by Location", polarity.label())
            }
            Self::Mentions { .. } => "Mention Frequency by Location".to_string(),
            Self::Priority { .. } => "Category Priority".to_string(),
            Self::Counts { .. } => "Number of Reviews by Location".to_string(),
        }
    }
}

pub fn run_report(
    args: &ReportArgs,
    thresholds: PriorityThresholds,
    output: OutputMode,
) -> Result<()> {
    let reviews = super::load_reviews(&args.input)?;
    let report = ReportOutput::build(&reviews, args.metric, args.polarity, thresholds);
    render_mode(output, &report, write_text, write_pretty)
}

// ---------------------------------------------------------------------------
// Text (tab-separated)
// ---------------------------------------------------------------------------

fn write_text(report: &ReportOutput, w: &mut dyn Write) -> io::Result<()> {
    match report {
        ReportOutput::Weighted { matrix, .. }
        | ReportOutput::Sentiment { matrix, .. }
        | ReportOutput::Mentions { matrix } => {
            let header: Vec<&str> = Category::ALL.into_iter().map(Category::as_str).collect();
            writeln!(w, "location\t{}", header.join("\t"))?;
            for (location, row) in matrix.location_names.iter().zip(&matrix.data) {
                let cells: Vec<String> = row.iter().copied().map(fmt_value).collect();
                writeln!(w, "{location}\t{}", cells.join("\t"))?;
            }
        }
        ReportOutput::Priority { categories, .. } => {
            writeln!(w, "category\tfrequency\tnegative_pct\tnegative_count\thigh_priority")?;
            for row in categories {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}\t{}",
                    row.stats.category,
                    fmt_value(row.stats.frequency),
                    fmt_value(row.stats.negative_pct),
                    row.stats.negative_count,
                    row.high_priority
                )?;
            }
        }
        ReportOutput::Counts { locations } => {
            writeln!(w, "location\tcount")?;
            for entry in locations {
                writeln!(w, "{}\t{}", entry.location, entry.count)?;
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Pretty (aligned)
// ---------------------------------------------------------------------------

fn write_pretty(report: &ReportOutput, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &report.title())?;
    match report {
        ReportOutput::Weighted { matrix, .. }
        | ReportOutput::Sentiment { matrix, .. }
        | ReportOutput::Mentions { matrix } => write_matrix(matrix, w)?,
        ReportOutput::Priority {
            thresholds,
            categories,
        } => {
            writeln!(
                w,
                "{:<20} {:>10} {:>10} {:>9}",
                "category", "frequency", "negative%", "priority"
            )?;
            for row in categories {
                writeln!(
                    w,
                    "{:<20} {:>10} {:>10} {:>9}",
                    row.stats.category.label(),
                    fmt_value(row.stats.frequency),
                    fmt_value(row.stats.negative_pct),
                    if row.high_priority { "HIGH" } else { "" }
                )?;
            }
            writeln!(
                w,
                "\nhigh priority: frequency > {}% and negative > {}%",
                thresholds.frequency, thresholds.negative_pct
            )?;
        }
        ReportOutput::Counts { locations } => {
            let width = label_width(locations.iter().map(|entry| entry.location.as_str()));
            for entry in locations {
                writeln!(w, "{:<width$} {:>6}", entry.location, entry.count)?;
            }
        }
    }
    Ok(())
}

fn write_matrix(matrix: &DerivedMatrix, w: &mut dyn Write) -> io::Result<()> {
    if matrix.is_empty() {
        return writeln!(w, "(no reviews)");
    }
    let width = label_width(matrix.location_names.iter().map(String::as_str));
    write!(w, "{:<width$}", "location")?;
    for category in Category::ALL {
        write!(w, " {:>18}", category.label())?;
    }
    writeln!(w)?;
    for (location, row) in matrix.location_names.iter().zip(&matrix.data) {
        write!(w, "{location:<width$}")?;
        for value in row {
            write!(w, " {:>18}", fmt_value(*value))?;
        }
        writeln!(w)?;
    }
    Ok(())
}

fn label_width<'a>(labels: impl Iterator<Item = &'a str>) -> usize {
    labels
        .map(|label| label.chars().count())
        .max()
        .unwrap_or(0)
        .max("location".len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use reviewdash_core::model::Sentiment;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: ReportArgs,
    }

    fn reviews() -> Vec<Review> {
        vec![
            Review::new("1 Elm, Alpha").with_mention(Category::Price, Sentiment::Negative, 4.0),
            Review::new("1 Elm, Alpha").with_mention(Category::Price, Sentiment::Negative, 2.0),
            Review::new("9 Oak, Beta").with_mention(Category::Price, Sentiment::Positive, 5.0),
        ]
    }

    #[test]
    fn args_default_to_positive_weighted() {
        let w = Wrapper::parse_from(["test", "results.json"]);
        assert_eq!(w.args.metric, Metric::Weighted);
        assert_eq!(w.args.polarity, Polarity::Positive);
    }

    #[test]
    fn args_parse_metric_and_polarity() {
        let w = Wrapper::parse_from(["test", "r.json", "--metric", "sentiment", "-p", "negative"]);
        assert_eq!(w.args.metric, Metric::Sentiment);
        assert_eq!(w.args.polarity, Polarity::Negative);
    }

    #[test]
    fn priority_rows_flag_high_priority() {
        let report = ReportOutput::build(
            &reviews(),
            Metric::Priority,
            Polarity::Positive,
            PriorityThresholds::default(),
        );
        let ReportOutput::Priority { categories, .. } = report else {
            panic!("expected priority output");
        };
        assert_eq!(categories.len(), Category::COUNT);
        // Price: mentioned in 3/3 reviews, 2/3 negative.
        assert_eq!(categories[0].stats.category, Category::Price);
        assert!(categories[0].high_priority);
        assert!(categories[1..].iter().all(|row| !row.high_priority));
    }

    #[test]
    fn json_shape_is_tagged_by_metric() {
        let report = ReportOutput::build(
            &reviews(),
            Metric::Counts,
            Polarity::Positive,
            PriorityThresholds::default(),
        );
        let json = serde_json::to_value(&report).expect("serialize");
        assert_eq!(json["metric"], "counts");
        assert_eq!(json["locations"][0]["location"], "Alpha");
        assert_eq!(json["locations"][0]["count"], 2);
    }

    #[test]
    fn text_matrix_is_tab_separated() {
        let report = ReportOutput::build(
            &reviews(),
            Metric::Sentiment,
            Polarity::Negative,
            PriorityThresholds::default(),
        );
        let mut buf = Vec::new();
        write_text(&report, &mut buf).expect("write");
        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("location\tcleanliness\t"));
        // Alpha: both price mentions negative.
        let alpha: Vec<&str> = lines[1].split('\t').collect();
        assert_eq!(alpha[0], "Alpha");
        assert_eq!(alpha[1 + Category::Price.index()], "100.00");
    }

    #[test]
    fn pretty_handles_empty_input() {
        let report = ReportOutput::build(
            &[],
            Metric::Mentions,
            Polarity::Positive,
            PriorityThresholds::default(),
        );
        let mut buf = Vec::new();
        write_pretty(&report, &mut buf).expect("write");
        assert!(String::from_utf8(buf).expect("utf8").contains("(no reviews)"));
    }
}
