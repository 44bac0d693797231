//! `rdash watch`: reconcile push-channel frames into the file model.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use reviewdash_core::report::ReportModel;
use reviewdash_core::sync::{
    ChannelOutcome, Notification, ReaderSource, ReconcileStats, Reconciler, ReconnectPolicy,
    run_channel,
};
use reviewdash_core::transport::decode_listing;
use serde::Serialize;
use tracing::info;

use crate::output::{OutputMode, pretty_kv, pretty_section};

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Listing JSON to seed the model with before any frames arrive.
    #[arg(long)]
    pub seed: Option<PathBuf>,

    /// JSON-lines frame source; `-` reads stdin.
    #[arg(long, default_value = "-")]
    pub events: PathBuf,
}

#[derive(Debug, Serialize)]
struct WatchSummary {
    event: &'static str,
    files: usize,
    sessions: u32,
    final_state: String,
    stats: ReconcileStats,
}

impl WatchSummary {
    fn new(outcome: &ChannelOutcome, model: &ReportModel) -> Self {
        Self {
            event: "summary",
            files: model.len(),
            sessions: outcome.sessions,
            final_state: outcome.final_state.to_string(),
            stats: outcome.stats,
        }
    }
}

/// One output line per applied event.
fn notification_line(mode: OutputMode, notification: &Notification) -> String {
    match mode {
        OutputMode::Json => {
            let event = match notification {
                Notification::Added { .. } => "added",
                Notification::Updated { .. } => "updated",
            };
            serde_json::json!({
                "event": event,
                "id": notification.id(),
                "status": notification.status(),
                "message": notification.message(),
            })
            .to_string()
        }
        OutputMode::Text | OutputMode::Pretty => notification.message(),
    }
}

pub fn run_watch(
    args: &WatchArgs,
    policy: ReconnectPolicy,
    output: OutputMode,
    quiet: bool,
) -> Result<()> {
    let mut model = ReportModel::new();
    if let Some(path) = &args.seed {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let records = decode_listing(&content)
            .with_context(|| format!("invalid listing in {}", path.display()))?;
        model.seed(records);
        info!(files = model.len(), "model seeded");
    }

    let mut reconciler = Reconciler::new().with_observer(
        move |notification: &Notification, _model: &ReportModel| {
            println!("{}", notification_line(output, notification));
        },
    );

    let outcome = if args.events.as_os_str() == "-" {
        let stdin = io::stdin();
        let mut source = ReaderSource::new(stdin.lock());
        run_channel(&mut source, &mut model, &mut reconciler, policy, std::thread::sleep)?
    } else {
        let mut source = ReaderSource::open(&args.events)
            .with_context(|| format!("failed to open {}", args.events.display()))?;
        run_channel(&mut source, &mut model, &mut reconciler, policy, std::thread::sleep)?
    };

    let summary = WatchSummary::new(&outcome, &model);
    match output {
        OutputMode::Json => println!("{}", serde_json::to_string(&summary)?),
        _ if quiet => {}
        OutputMode::Text => println!(
            "summary\tfiles={}\tapplied={}\tinserted={}\tupdated={}\tdropped={}",
            summary.files,
            summary.stats.applied,
            summary.stats.inserted,
            summary.stats.updated,
            summary.stats.dropped
        ),
        OutputMode::Pretty => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            pretty_section(&mut out, "Watch summary")?;
            pretty_kv(&mut out, "files", summary.files.to_string())?;
            pretty_kv(&mut out, "applied", summary.stats.applied.to_string())?;
            pretty_kv(&mut out, "inserted", summary.stats.inserted.to_string())?;
            pretty_kv(&mut out, "updated", summary.stats.updated.to_string())?;
            pretty_kv(&mut out, "dropped", summary.stats.dropped.to_string())?;
            pretty_kv(&mut out, "connection", &summary.final_state)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reviewdash_core::model::{FileId, FileStatus};

    #[test]
    fn events_default_to_stdin() {
        use clap::Parser;

        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: WatchArgs,
        }
        let w = Wrapper::parse_from(["test"]);
        assert_eq!(w.args.events, PathBuf::from("-"));
        assert!(w.args.seed.is_none());
    }

    #[test]
    fn text_lines_are_toast_messages() {
        let n = Notification::Updated {
            id: FileId(7),
            status: FileStatus::Completed,
        };
        assert_eq!(
            notification_line(OutputMode::Text, &n),
            "File ID 7 processed: Completed"
        );
    }

    #[test]
    fn json_lines_tag_the_event_kind() {
        let n = Notification::Added {
            id: FileId(9),
            status: FileStatus::Pending,
        };
        let value: serde_json::Value =
            serde_json::from_str(&notification_line(OutputMode::Json, &n)).expect("json");
        assert_eq!(value["event"], "added");
        assert_eq!(value["id"], 9);
        assert_eq!(value["status"], "Pending");
    }
}
