//! Reconnect state machine for the push channel.
//!
//! ```text
//! Idle ──▶ Connecting{1} ──▶ Open ──▶ Closed ──▶ Connecting{1} ──▶ …
//!              │  ▲                     │
//!              ▼  │ (failed attempt)    ▼
//!          Connecting{n+1} ──────────▶ GaveUp
//! ```
//!
//! The attempt counter restarts at 1 after every successful open. Each retry
//! waits `initial_backoff × 2^(attempt-1)`, capped at `max_backoff`.

use std::fmt;
use std::time::Duration;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    /// Attempt number since the last successful open, starting at 1.
    Connecting { attempt: u32 },
    Open,
    Closed,
    GaveUp,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Connecting { attempt } => write!(f, "connecting (attempt {attempt})"),
            Self::Open => f.write_str("open"),
            Self::Closed => f.write_str("closed"),
            Self::GaveUp => f.write_str("gave up"),
        }
    }
}

/// Error returned when a state transition is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid connection transition {from} -> {to}: {reason}")]
pub struct InvalidTransition {
    pub from: ConnectionState,
    pub to: ConnectionState,
    pub reason: &'static str,
}

impl ConnectionState {
    /// Validate a transition against the lifecycle above.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] for any edge not in the diagram, and for
    /// a retry whose attempt number does not follow the previous one.
    pub const fn can_transition_to(self, target: Self) -> Result<(), InvalidTransition> {
        let allowed = match (self, target) {
            (Self::Idle | Self::Closed, Self::Connecting { attempt }) => attempt == 1,
            (Self::Connecting { attempt: from }, Self::Connecting { attempt: to }) => {
                to == from.saturating_add(1)
            }
            (Self::Connecting { .. }, Self::Open | Self::GaveUp)
            | (Self::Open, Self::Closed)
            | (Self::Closed, Self::GaveUp) => true,
            _ => false,
        };

        if allowed {
            Ok(())
        } else {
            Err(InvalidTransition {
                from: self,
                to: target,
                reason: "transition not allowed by connection lifecycle",
            })
        }
    }
}

/// Backoff and give-up parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Attempts allowed per outage; 0 retries forever.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            max_attempts: 0,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry `attempt` (1-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_backoff
            .saturating_mul(1_u32 << exponent)
            .min(self.max_backoff)
    }

    /// `true` once `attempt` exceeds the allowed number of attempts.
    #[must_use]
    pub const fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts != 0 && attempt > self.max_attempts
    }
}

/// Tracks the connection state and computes retry delays.
#[derive(Debug, Clone)]
pub struct ConnectionMachine {
    state: ConnectionState,
    policy: ReconnectPolicy,
    opens: u32,
}

impl ConnectionMachine {
    #[must_use]
    pub const fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Idle,
            policy,
            opens: 0,
        }
    }

    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Number of successful opens so far.
    #[must_use]
    pub const fn opens(&self) -> u32 {
        self.opens
    }

    fn transition(&mut self, target: ConnectionState) -> Result<(), InvalidTransition> {
        self.state.can_transition_to(target)?;
        tracing::debug!(from = %self.state, to = %target, "push channel state");
        self.state = target;
        Ok(())
    }

    /// First connect; no delay.
    ///
    /// # Errors
    ///
    /// Fails unless the machine is idle.
    pub fn start(&mut self) -> Result<(), InvalidTransition> {
        self.transition(ConnectionState::Connecting { attempt: 1 })
    }

    /// The pending attempt succeeded.
    ///
    /// # Errors
    ///
    /// Fails unless an attempt is in progress.
    pub fn opened(&mut self) -> Result<(), InvalidTransition> {
        self.transition(ConnectionState::Open)?;
        self.opens += 1;
        Ok(())
    }

    /// The open connection ended.
    ///
    /// # Errors
    ///
    /// Fails unless the connection is open.
    pub fn closed(&mut self) -> Result<(), InvalidTransition> {
        self.transition(ConnectionState::Closed)
    }

    /// Schedule the next attempt after a close or a failed attempt.
    ///
    /// Returns the delay to wait before connecting, or `None` after moving to
    /// [`ConnectionState::GaveUp`] because the policy's attempts ran out.
    ///
    /// # Errors
    ///
    /// Fails unless the machine is closed or connecting.
    pub fn retry(&mut self) -> Result<Option<Duration>, InvalidTransition> {
        let attempt = match self.state {
            ConnectionState::Connecting { attempt } => attempt.saturating_add(1),
            _ => 1,
        };

        if self.policy.exhausted(attempt) {
            self.give_up()?;
            return Ok(None);
        }

        self.transition(ConnectionState::Connecting { attempt })?;
        Ok(Some(self.policy.backoff(attempt)))
    }

    /// Stop for good.
    ///
    /// # Errors
    ///
    /// Fails unless the machine is closed or connecting.
    pub fn give_up(&mut self) -> Result<(), InvalidTransition> {
        self.transition(ConnectionState::GaveUp)
    }
}
