//! `rdash list`: the uploaded-files grid.

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Args;
use reviewdash_core::config::ServerConfig;
use reviewdash_core::report::ReportModel;
use reviewdash_core::transport::refresh;
use reviewdash_render::grid::GRID_COLUMNS;
use reviewdash_render::{GridRow, grid_rows};

use crate::http::HttpTransport;
use crate::output::{OutputMode, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only show rows with this status (case-insensitive).
    #[arg(short, long)]
    pub status: Option<String>,

    /// Maximum rows to show.
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

impl ListArgs {
    fn filter(&self, rows: Vec<GridRow>) -> Vec<GridRow> {
        rows.into_iter()
            .filter(|row| {
                self.status
                    .as_deref()
                    .is_none_or(|wanted| row.status.as_str().eq_ignore_ascii_case(wanted))
            })
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }
}

pub fn run_list(args: &ListArgs, server: &ServerConfig, output: OutputMode) -> Result<()> {
    let mut transport = HttpTransport::new(server);
    let mut model = ReportModel::new();
    refresh(&mut transport, &mut model)
        .with_context(|| format!("failed to list files from {}", transport.files_url()))?;

    let rows = args.filter(grid_rows(&model, Some(&server.base_url)));
    render_mode(
        output,
        &rows,
        |rows, w| write_text(rows, w),
        |rows, w| write_pretty(rows, w),
    )
}

fn write_text(rows: &[GridRow], w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "id\tfile_name\tuploaded_at\tstatus\tdownload_url")?;
    for row in rows {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}",
            row.id,
            row.file_name,
            row.uploaded_at_display(),
            row.status,
            row.download_url.as_deref().unwrap_or("-")
        )?;
    }
    Ok(())
}

fn write_pretty(rows: &[GridRow], w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("Uploaded files ({})", rows.len()))?;
    if rows.is_empty() {
        return writeln!(w, "(none)");
    }

    let name_width = rows
        .iter()
        .map(|row| row.file_name.chars().count())
        .max()
        .unwrap_or(0)
        .max(GRID_COLUMNS[1].len());
    writeln!(
        w,
        "{:>6}  {:<name_width$}  {:<16}  {:<10}  actions",
        GRID_COLUMNS[0], GRID_COLUMNS[1], GRID_COLUMNS[2], GRID_COLUMNS[3]
    )?;
    for row in rows {
        let mut actions = Vec::new();
        if row.download_url.is_some() {
            actions.push("download");
        }
        if row.can_export {
            actions.push("export");
        }
        writeln!(
            w,
            "{:>6}  {:<name_width$}  {:<16}  {:<10}  {}",
            row.id.to_string(),
            row.file_name,
            row.uploaded_at_display(),
            row.status.to_string(),
            actions.join(",")
        )?;
    }
    Ok(())
}
