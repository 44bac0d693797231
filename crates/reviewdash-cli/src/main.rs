#![forbid(unsafe_code)]

mod cmd;
mod http;
mod output;

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use reviewdash_core::config::{EffectiveConfig, resolve_config};
use reviewdash_core::error::ErrorCode;
use reviewdash_core::model::ReviewError;
use reviewdash_core::sync::{EventError, InvalidTransition};
use reviewdash_core::transport::TransportError;
use reviewdash_render::RenderError;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "rdash",
    author,
    version,
    about = "rdash: review sentiment dashboard",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Emit JSON output (same as `--format json`).
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Suppress non-essential output.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Project config file to use instead of `.reviewdash/config.toml`.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Output mode when no config could be loaded.
    fn fallback_output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, if self.json { "json" } else { "text" })
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Analyze",
        about = "Print derived metrics for a results file",
        long_about = "Aggregate review rows into per-location matrices, a category priority ranking, or review counts.",
        after_help = "EXAMPLES:\n    # Positive weighted scores per location\n    rdash report results.json\n\n    # Negative sentiment share\n    rdash report results.json --metric sentiment --polarity negative\n\n    # Priority ranking as JSON\n    rdash report results.json --metric priority --format json"
    )]
    Report(cmd::report::ReportArgs),

    #[command(
        next_help_heading = "Analyze",
        about = "Print a Vega-Lite chart spec",
        long_about = "Build the Vega-Lite specification of one dashboard chart from a results file.",
        after_help = "EXAMPLES:\n    # Weighted score heatmap\n    rdash chart results.json --kind weighted\n\n    # Grouped bars for one category\n    rdash chart results.json --kind grouped --category \"Customer Service\"\n\n    # Save the priority matrix\n    rdash chart results.json --kind priority --out priority.vl.json"
    )]
    Chart(cmd::chart::ChartArgs),

    #[command(
        next_help_heading = "Server",
        about = "List uploaded files",
        long_about = "Fetch the file listing from the server and print the uploaded-files grid, newest first.",
        after_help = "EXAMPLES:\n    # All files\n    rdash list\n\n    # Only finished files\n    rdash list --status completed\n\n    # Emit machine-readable output\n    rdash list --format json"
    )]
    List(cmd::list::ListArgs),

    #[command(
        next_help_heading = "Server",
        about = "Upload a spreadsheet",
        long_about = "Upload an .xls or .xlsx review export for processing.",
        after_help = "EXAMPLES:\n    # Upload a file\n    rdash upload march.xlsx\n\n    # Against another server\n    REVIEWDASH_SERVER=http://reviews.internal:8000 rdash upload march.xlsx"
    )]
    Upload(cmd::upload::UploadArgs),

    #[command(
        next_help_heading = "Server",
        about = "Apply push-channel status events",
        long_about = "Seed the file model, then reconcile status frames (one JSON envelope per line) in arrival order and print a notification per applied event.",
        after_help = "EXAMPLES:\n    # Replay a capture on top of a listing\n    rdash watch --seed listing.json --events capture.jsonl\n\n    # Read frames from another process\n    websocat ws://localhost:8000/ws/file-status/ | rdash watch --events -"
    )]
    Watch(cmd::watch::WatchArgs),

    #[command(
        next_help_heading = "Report",
        about = "Export a file's chart report",
        long_about = "Rasterize every report chart with the configured rasterizer and write the images plus a page layout manifest.",
        after_help = "EXAMPLES:\n    # Export to ./out\n    rdash export record.json --out-dir out\n\n    # Write chart specs only\n    rdash export record.json --out-dir out --specs-only"
    )]
    Export(cmd::export::ExportArgs),

    #[command(
        next_help_heading = "Project Maintenance",
        about = "Generate shell completion scripts",
        long_about = "Generate shell completion scripts for supported shells.",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    rdash completions bash\n\n    # Write zsh completions to a file\n    rdash completions zsh -o _rdash"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("REVIEWDASH_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "reviewdash=debug,rdash=debug,info"
        } else {
            "reviewdash=info,rdash=info,warn"
        })
    });

    let format = env::var("REVIEWDASH_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<EffectiveConfig> {
    let project_root = env::current_dir().context("failed to resolve working directory")?;
    resolve_config(&project_root, cli.config.as_deref(), cli.json)
}

fn dispatch(cli: &Cli, config: &EffectiveConfig, output: OutputMode) -> anyhow::Result<()> {
    let project = &config.project;
    match &cli.command {
        Commands::Report(args) => {
            cmd::report::run_report(args, project.priority.thresholds(), output)
        }
        Commands::Chart(args) => cmd::chart::run_chart(
            args,
            &project.report.brand,
            project.priority.thresholds(),
        ),
        Commands::List(args) => cmd::list::run_list(args, &project.server, output),
        Commands::Upload(args) => cmd::upload::run_upload(args, &project.server, output),
        Commands::Watch(args) => {
            cmd::watch::run_watch(args, project.reconnect.policy(), output, cli.quiet)
        }
        Commands::Export(args) => cmd::export::run_export(args, project, output),
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args, &mut command)
        }
    }
}

/// First typed error in the chain decides the code.
fn error_code_of(err: &anyhow::Error) -> Option<ErrorCode> {
    err.chain().find_map(|cause| {
        if let Some(err) = cause.downcast_ref::<TransportError>() {
            Some(err.error_code())
        } else if let Some(err) = cause.downcast_ref::<RenderError>() {
            Some(err.error_code())
        } else if let Some(err) = cause.downcast_ref::<ReviewError>() {
            Some(err.error_code())
        } else if let Some(err) = cause.downcast_ref::<EventError>() {
            Some(err.error_code())
        } else if cause.is::<toml::de::Error>() {
            Some(ErrorCode::ConfigParseError)
        } else if cause.is::<serde_json::Error>() {
            Some(ErrorCode::InvalidReviewRow)
        } else if cause.is::<InvalidTransition>() {
            Some(ErrorCode::InternalUnexpected)
        } else {
            None
        }
    })
}

fn report_failure(err: &anyhow::Error, output: OutputMode) {
    debug!(error = ?err, "command failed");
    let cli_error = match error_code_of(err) {
        Some(code) => CliError::coded(err, code),
        None => CliError {
            message: format!("{err:#}"),
            suggestion: None,
            error_code: None,
        },
    };
    if render_error(output, &cli_error).is_err() {
        eprintln!("error: {err:#}");
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let config = load_config(&cli);
    let output = match &config {
        Ok(config) => resolve_output_mode(cli.format, &config.resolved_output),
        Err(_) => cli.fallback_output_mode(),
    };

    match config.and_then(|config| dispatch(&cli, &config, output)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_failure(&err, output);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_forces_json_fallback() {
        let cli = Cli::parse_from(["rdash", "--json", "list"]);
        assert!(cli.json);
        assert!(cli.fallback_output_mode().is_json());
    }

    #[test]
    fn format_flag_after_subcommand() {
        let cli = Cli::parse_from(["rdash", "list", "--format", "pretty"]);
        assert_eq!(cli.format, Some(OutputMode::Pretty));
        assert_eq!(cli.fallback_output_mode(), OutputMode::Pretty);
    }

    #[test]
    fn default_fallback_is_text() {
        let cli = Cli::parse_from(["rdash", "list"]);
        assert!(!cli.json);
        assert_eq!(cli.fallback_output_mode(), OutputMode::Text);
    }

    #[test]
    fn global_flags_parse() {
        let cli = Cli::parse_from(["rdash", "-q", "-v", "--config", "alt.toml", "list"]);
        assert!(cli.quiet);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
    }

    #[test]
    fn completions_subcommand_parses() {
        let cli = Cli::parse_from(["rdash", "completions", "bash"]);
        assert!(matches!(
            cli.command,
            Commands::Completions(cmd::completions::CompletionsArgs {
                shell: clap_complete::Shell::Bash,
                output: None,
            })
        ));
    }

    #[test]
    fn completions_use_binary_name() {
        assert_eq!(Cli::command().get_name(), "rdash");
    }

    #[test]
    fn all_subcommands_listed() {
        let subcommands = [
            vec!["rdash", "report", "r.json"],
            vec!["rdash", "chart", "r.json", "--kind", "weighted"],
            vec!["rdash", "list"],
            vec!["rdash", "upload", "march.xlsx"],
            vec!["rdash", "watch"],
            vec!["rdash", "export", "record.json", "--out-dir", "out"],
            vec!["rdash", "completions", "bash"],
        ];
        for args in &subcommands {
            let result = Cli::try_parse_from(args.iter());
            assert!(
                result.is_ok(),
                "Failed to parse: {:?} error: {:?}",
                args,
                result.err()
            );
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn typed_errors_map_to_codes() {
        let err = anyhow::Error::new(TransportError::UnsupportedFileType {
            name: "notes.txt".to_string(),
        })
        .context("failed to upload notes.txt");
        assert_eq!(error_code_of(&err), Some(ErrorCode::UploadRejected));

        let err = anyhow::Error::new(RenderError::InvalidImage("0x0".to_string()));
        assert_eq!(error_code_of(&err), Some(ErrorCode::ChartRenderFailed));

        let json_err = serde_json::from_str::<serde_json::Value>("{").expect_err("invalid");
        let err = anyhow::Error::new(json_err).context("invalid review rows");
        assert_eq!(error_code_of(&err), Some(ErrorCode::InvalidReviewRow));

        assert_eq!(error_code_of(&anyhow::anyhow!("plain")), None);
    }
}
