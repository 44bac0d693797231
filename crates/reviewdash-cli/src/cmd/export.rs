//! `rdash export`: lay out a file's report and write it to a directory.
//!
//! Each chart spec is piped to an external Vega-Lite rasterizer (`vl2png` by
//! default) which must write a PNG to stdout. The placed charts become
//! `Report_<file>.pdf`, written next to a `<document>.layout.json` manifest
//! holding every page operation. With `--specs-only` no rasterizer runs; the
//! chart specs are written instead.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use clap::Args;
use reviewdash_core::config::ProjectConfig;
use reviewdash_core::model::FileRecord;
use reviewdash_render::export::{PageOp, Placement};
use reviewdash_render::{
    ChartSpec, Charts, ExportReport, LayoutRecorder, PageGeometry, PageSink, PdfSink, RasterImage,
    Rasterizer, RenderError, export_plan, export_report, report_file_name,
};
use serde::Serialize;
use tracing::debug;

use crate::output::{OutputMode, pretty_kv, pretty_section, render};

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// File record JSON (or a bare array of review rows).
    pub record: PathBuf,

    /// Directory for the PDF and its layout manifest.
    #[arg(short, long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Write Vega-Lite specs instead of rasterizing.
    #[arg(long)]
    pub specs_only: bool,
}

// ---------------------------------------------------------------------------
// Rasterizer
// ---------------------------------------------------------------------------

/// Runs an external command with the spec on stdin and a PNG on stdout.
#[derive(Debug, Clone)]
pub struct CommandRasterizer {
    command: String,
}

impl CommandRasterizer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn failure(&self, reason: impl Into<String>) -> RenderError {
        RenderError::Rasterize {
            command: self.command.clone(),
            reason: reason.into(),
        }
    }
}

impl Rasterizer for CommandRasterizer {
    fn rasterize(&mut self, spec: &ChartSpec, scale: f64) -> Result<RasterImage, RenderError> {
        let mut words = self.command.split_whitespace();
        let Some(program) = words.next() else {
            return Err(self.failure("no rasterizer command configured"));
        };

        let mut child = Command::new(program)
            .args(words)
            .arg("--scale")
            .arg(scale.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| self.failure(err.to_string()))?;

        let input = serde_json::to_vec(spec)?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&input)
                .map_err(|err| self.failure(err.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|err| self.failure(err.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.failure(format!("{}: {}", output.status, stderr.trim())));
        }

        let image = RasterImage::from_png(output.stdout)?;
        debug!(
            width_px = image.width_px,
            height_px = image.height_px,
            bytes = image.png.len(),
            "chart rasterized"
        );
        Ok(image)
    }
}

// ---------------------------------------------------------------------------
// Document writer
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct LayoutManifest<'a> {
    document: &'a str,
    pages: usize,
    ops: &'a [PageOp],
}

/// Draws into a PDF and a layout recording at once, then writes both to
/// `out_dir` when the document is finished.
#[derive(Debug)]
pub struct DocumentWriter {
    out_dir: PathBuf,
    pdf: PdfSink,
    recorder: LayoutRecorder,
    document: Option<PathBuf>,
    manifest: Option<PathBuf>,
}

impl DocumentWriter {
    pub fn new(out_dir: impl Into<PathBuf>, geometry: &PageGeometry) -> Self {
        Self {
            out_dir: out_dir.into(),
            pdf: PdfSink::new(geometry),
            recorder: LayoutRecorder::new(),
            document: None,
            manifest: None,
        }
    }

    /// Path of the written PDF, once finished.
    pub fn document(&self) -> Option<&Path> {
        self.document.as_deref()
    }

    pub fn manifest(&self) -> Option<&Path> {
        self.manifest.as_deref()
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, RenderError> {
        let path = self.out_dir.join(name);
        std::fs::write(&path, bytes).map_err(|source| RenderError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

impl PageSink for DocumentWriter {
    fn add_page(&mut self) -> Result<(), RenderError> {
        self.pdf.add_page()?;
        self.recorder.add_page()
    }

    fn draw_title(
        &mut self,
        text: &str,
        font_size: f64,
        x_mm: f64,
        y_mm: f64,
    ) -> Result<(), RenderError> {
        self.pdf.draw_title(text, font_size, x_mm, y_mm)?;
        self.recorder.draw_title(text, font_size, x_mm, y_mm)
    }

    fn draw_image(
        &mut self,
        title: &str,
        image: &RasterImage,
        placement: Placement,
    ) -> Result<(), RenderError> {
        self.pdf.draw_image(title, image, placement)?;
        self.recorder.draw_image(title, image, placement)
    }

    fn finish(&mut self, name: &str) -> Result<(), RenderError> {
        self.pdf.finish(name)?;
        self.recorder.finish(name)?;

        let bytes = self
            .pdf
            .bytes()
            .ok_or_else(|| RenderError::Document("pdf was not assembled".to_string()))?;
        self.document = Some(self.write(name, bytes)?);

        let manifest = LayoutManifest {
            document: name,
            pages: self.recorder.pages(),
            ops: &self.recorder.ops,
        };
        let json = serde_json::to_vec_pretty(&manifest)?;
        self.manifest = Some(self.write(&format!("{name}.layout.json"), &json)?);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Specs only
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct SpecEntry {
    title: String,
    kind: String,
    page_break_before: bool,
    /// Absent when the chart has nothing to draw.
    spec: Option<String>,
}

fn write_specs(record: &FileRecord, charts: &Charts<'_>, out_dir: &Path) -> Result<PathBuf> {
    let document = report_file_name(record);
    let mut entries = Vec::new();
    for (i, section) in export_plan().into_iter().enumerate() {
        let spec = charts.build(section.kind);
        let file = if spec.is_empty() {
            None
        } else {
            let name = format!("chart-{:02}.vl.json", i + 1);
            let path = out_dir.join(&name);
            std::fs::write(&path, spec.to_json_pretty()?)
                .with_context(|| format!("failed to write {}", path.display()))?;
            Some(name)
        };
        entries.push(SpecEntry {
            title: section.title,
            kind: section.kind.to_string(),
            page_break_before: section.page_break_before,
            spec: file,
        });
    }

    let manifest = out_dir.join(format!("{document}.specs.json"));
    let json = serde_json::json!({ "document": document, "sections": entries });
    std::fs::write(&manifest, serde_json::to_vec_pretty(&json)?)
        .with_context(|| format!("failed to write {}", manifest.display()))?;
    Ok(manifest)
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ExportOutput {
    out_dir: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    document: Option<String>,
    manifest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<ExportReport>,
}

pub fn run_export(args: &ExportArgs, config: &ProjectConfig, output: OutputMode) -> Result<()> {
    let record = super::load_record(&args.record)?;
    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("failed to create {}", args.out_dir.display()))?;

    let charts = Charts::new(record.reviews())
        .with_brand(config.report.brand.clone())
        .with_thresholds(config.priority.thresholds());

    let result = if args.specs_only {
        let manifest = write_specs(&record, &charts, &args.out_dir)?;
        ExportOutput {
            out_dir: args.out_dir.display().to_string(),
            document: None,
            manifest: Some(manifest.display().to_string()),
            report: None,
        }
    } else {
        let geometry = PageGeometry::from(&config.export);
        let mut rasterizer = CommandRasterizer::new(config.export.rasterizer.clone());
        let mut writer = DocumentWriter::new(&args.out_dir, &geometry);
        let report = export_report(&record, &charts, &geometry, &mut rasterizer, &mut writer)
            .with_context(|| format!("failed to export report for file {}", record.id))?;
        ExportOutput {
            out_dir: args.out_dir.display().to_string(),
            document: writer.document().map(|path| path.display().to_string()),
            manifest: writer.manifest().map(|path| path.display().to_string()),
            report: Some(report),
        }
    };

    render(output, &result, |r, w| {
        pretty_section(w, "Report export")?;
        pretty_kv(w, "directory", &r.out_dir)?;
        if let Some(document) = &r.document {
            pretty_kv(w, "document", document)?;
        }
        if let Some(manifest) = &r.manifest {
            pretty_kv(w, "manifest", manifest)?;
        }
        if let Some(report) = &r.report {
            pretty_kv(w, "pages", report.pages.to_string())?;
            pretty_kv(w, "charts", report.placed.len().to_string())?;
            for skipped in &report.skipped {
                pretty_kv(w, "skipped", format!("{} ({})", skipped.title, skipped.reason))?;
            }
        }
        Ok(())
    })
}
