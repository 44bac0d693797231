//! `rdash upload`: send one spreadsheet to the server.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use reviewdash_core::config::ServerConfig;
use reviewdash_core::transport::{upload_file, validate_upload_name};
use serde::Serialize;
use serde_json::Value;

use crate::http::HttpTransport;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// The `.xls` or `.xlsx` file to upload.
    pub file: PathBuf,
}

#[derive(Debug, Serialize)]
struct UploadOutput {
    file_name: String,
    id: Option<u64>,
    status: Option<String>,
    response: Value,
}

pub fn run_upload(args: &UploadArgs, server: &ServerConfig, output: OutputMode) -> Result<()> {
    let file_name = args
        .file
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string();
    // Fail before opening a connection.
    validate_upload_name(&file_name)?;

    let mut transport = HttpTransport::new(server);
    let ack = upload_file(&mut transport, &args.file)
        .with_context(|| format!("failed to upload {}", args.file.display()))?;

    let result = UploadOutput {
        file_name,
        id: ack.id.map(|id| id.0),
        status: ack.status.map(|status| status.to_string()),
        response: ack.body,
    };

    render_mode(
        output,
        &result,
        |r, w| {
            writeln!(
                w,
                "uploaded\t{}\t{}\t{}",
                r.file_name,
                r.id.map_or_else(|| "-".to_string(), |id| id.to_string()),
                r.status.as_deref().unwrap_or("-")
            )
        },
        |r, w| {
            pretty_section(w, "Upload accepted")?;
            pretty_kv(w, "file", &r.file_name)?;
            if let Some(id) = r.id {
                pretty_kv(w, "id", id.to_string())?;
            }
            if let Some(status) = &r.status {
                pretty_kv(w, "status", status)?;
            }
            Ok(())
        },
    )
}
