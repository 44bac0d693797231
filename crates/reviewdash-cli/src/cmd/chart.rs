//! `rdash chart`: print one Vega-Lite chart spec.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use reviewdash_core::aggregate::PriorityThresholds;
use reviewdash_core::model::{Category, Polarity};
use reviewdash_render::{ChartKind, ChartSpec, Charts};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Weighted,
    Positive,
    Negative,
    Mentions,
    /// Positive/negative bars for one category; needs `--category`.
    Grouped,
    Priority,
    Counts,
}

#[derive(Args, Debug)]
pub struct ChartArgs {
    /// Review rows as a JSON array, or a file record with `results`.
    pub input: PathBuf,

    /// Chart to build.
    #[arg(short, long, value_enum)]
    pub kind: KindArg,

    /// Category for grouped bars, by label or field name.
    #[arg(short, long, required_if_eq("kind", "grouped"))]
    pub category: Option<Category>,

    /// Write the spec here instead of stdout.
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

impl ChartArgs {
    fn chart_kind(&self) -> Result<ChartKind> {
        Ok(match self.kind {
            KindArg::Weighted => ChartKind::Weighted,
            KindArg::Positive => ChartKind::Sentiment(Polarity::Positive),
            KindArg::Negative => ChartKind::Sentiment(Polarity::Negative),
            KindArg::Mentions => ChartKind::Mentions,
            KindArg::Grouped => ChartKind::Grouped(
                self.category
                    .context("--kind grouped requires --category")?,
            ),
            KindArg::Priority => ChartKind::Priority,
            KindArg::Counts => ChartKind::ReviewCounts,
        })
    }
}

pub fn build_chart(
    args: &ChartArgs,
    brand: &str,
    thresholds: PriorityThresholds,
) -> Result<ChartSpec> {
    let kind = args.chart_kind()?;
    let reviews = super::load_reviews(&args.input)?;
    let spec = Charts::new(&reviews)
        .with_brand(brand)
        .with_thresholds(thresholds)
        .build(kind);
    if spec.is_empty() {
        info!(chart = %kind, "chart has no data");
    }
    Ok(spec)
}

/// The spec is JSON in every output mode.
pub fn run_chart(args: &ChartArgs, brand: &str, thresholds: PriorityThresholds) -> Result<()> {
    let spec = build_chart(args, brand, thresholds)?;
    let json = spec.to_json_pretty()?;

    match &args.out {
        Some(path) => std::fs::write(path, format!("{json}\n"))
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            writeln!(out, "{json}")?;
        }
    }
    Ok(())
}
