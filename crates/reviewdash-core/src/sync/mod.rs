//! Live synchronisation of the report model with the server push channel.
//!
//! Frames flow strictly in arrival order:
//!
//! [`EventSource`] → [`decode_envelope`] → [`Reconciler`] → [`ReportModel`]
//!
//! [`run_channel`] drives a source through the [`ConnectionMachine`],
//! reconnecting with backoff until the source is exhausted or the policy gives
//! up. Nothing here reorders or batches events.

pub mod connection;
pub mod event;
pub mod reconcile;
pub mod source;

use std::time::Duration;

use tracing::{info, warn};

use crate::report::ReportModel;

pub use connection::{ConnectionMachine, ConnectionState, InvalidTransition, ReconnectPolicy};
pub use event::{EventError, Frame, StatusEvent, decode_envelope, encode_envelope};
pub use reconcile::{ModelObserver, Notification, ReconcileStats, Reconciler, reconcile};
pub use source::{EventSource, ReaderSource};

/// Summary of a finished channel session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelOutcome {
    pub stats: ReconcileStats,
    pub final_state: ConnectionState,
    /// Number of times the connection reached `Open`.
    pub sessions: u32,
}

/// Pump frames from `source` into `model` until the channel stops for good.
///
/// `sleep` is called with each reconnect delay; pass `std::thread::sleep` in
/// production and a recorder in tests. Read errors close the current session
/// like an orderly close does.
///
/// # Errors
///
/// Returns [`InvalidTransition`] only if the driver itself violates the
/// connection lifecycle.
pub fn run_channel<S: EventSource>(
    source: &mut S,
    model: &mut ReportModel,
    reconciler: &mut Reconciler,
    policy: ReconnectPolicy,
    mut sleep: impl FnMut(Duration),
) -> Result<ChannelOutcome, InvalidTransition> {
    let mut machine = ConnectionMachine::new(policy);
    machine.start()?;

    loop {
        if let Err(err) = source.connect() {
            warn!(state = %machine.state(), error = %err, "push channel connect failed");
        } else {
            machine.opened()?;
            info!(session = machine.opens(), "push channel open");
            pump(source, model, reconciler);
            machine.closed()?;
            info!("push channel closed");
        }

        if source.exhausted() {
            machine.give_up()?;
            break;
        }
        match machine.retry()? {
            Some(delay) => sleep(delay),
            None => {
                warn!(
                    max_attempts = policy.max_attempts,
                    "giving up on push channel"
                );
                break;
            }
        }
    }

    Ok(ChannelOutcome {
        stats: reconciler.stats(),
        final_state: machine.state(),
        sessions: machine.opens(),
    })
}

fn pump<S: EventSource>(source: &mut S, model: &mut ReportModel, reconciler: &mut Reconciler) {
    loop {
        match source.next_frame() {
            Ok(Some(frame)) => {
                reconciler.handle_frame(model, &frame);
            }
            Ok(None) => return,
            Err(err) => {
                warn!(error = %err, "push channel read failed");
                return;
            }
        }
    }
}
