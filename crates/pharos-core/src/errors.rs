//! Error hierarchy for the pharos capture orchestrator.
//!
//! Built on [`thiserror`]. Three families of failure exist (see the flow
//! docs for the full taxonomy):
//!
//! - **State violations** — an operation was attempted while a conflicting
//!   capture mode was active, or an `end_*` call had nothing to end. These
//!   are fatal to the call, never to the flow; state is left unchanged.
//! - **Collaborator failures** — capture, config-resolution, audit, or
//!   render errors, propagated unchanged to the caller.
//! - **Aggregation failures** — empty flow or a step the auditor produced
//!   no result for, reported with the offending step's name.

use std::fmt;

use thiserror::Error;

use crate::artifacts::GatherMode;

/// Result type alias for flow operations.
pub type Result<T> = std::result::Result<T, FlowError>;

/// Which capture mode is currently holding the flow.
///
/// Used by state-violation errors to name the conflicting mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActiveMode {
    /// A navigation capture is in progress or awaiting its trigger.
    Navigation,
    /// A timespan capture is in progress.
    Timespan,
}

impl fmt::Display for ActiveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Navigation => write!(f, "navigation"),
            Self::Timespan => write!(f, "timespan"),
        }
    }
}

/// Top-level error type for flow operations.
#[derive(Debug, Error)]
pub enum FlowError {
    /// A capture operation was attempted while a conflicting mode was active.
    #[error("cannot perform a {requested} operation while a {active} capture is in progress")]
    CaptureConflict {
        /// The capture mode that was requested.
        requested: GatherMode,
        /// The mode currently holding the flow.
        active: ActiveMode,
    },

    /// `end_navigation` was called with no navigation awaiting its trigger.
    #[error("no navigation in progress to end")]
    NoNavigationInProgress,

    /// `end_timespan` was called with no timespan in progress.
    #[error("no timespan in progress to end")]
    NoTimespanInProgress,

    /// The navigation collaborator completed without ever invoking its
    /// requestor, so the deferred trigger was never armed.
    #[error("navigation capture completed without requesting its trigger")]
    TriggerNeverRequested,

    /// The deferred trigger was dropped before it was fired.
    #[error("navigation trigger dropped before it was fired")]
    TriggerDropped,

    /// `create_flow_result` was called on a flow with no recorded steps.
    #[error("need at least one capture step before creating a flow result")]
    NoSteps,

    /// The audit collaborator yielded no result for a step.
    #[error("audit produced no result for step \"{step_name}\"")]
    MissingAuditResult {
        /// Display name of the offending step.
        step_name: String,
    },

    /// Configuration resolution failed.
    #[error("config resolution failed: {0}")]
    Config(String),

    /// A capture collaborator failed.
    #[error("capture failed: {message}")]
    Capture {
        /// Error description.
        message: String,
        /// Original cause.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The report renderer failed.
    #[error("report rendering failed: {0}")]
    Render(String),

    /// Internal invariant break (spawned task panic, poisoned handoff).
    #[error("internal flow error: {0}")]
    Internal(String),
}

impl FlowError {
    /// Create a capture error from a message.
    #[must_use]
    pub fn capture(message: impl Into<String>) -> Self {
        Self::Capture {
            message: message.into(),
            source: None,
        }
    }

    /// Create a capture error wrapping an underlying cause.
    #[must_use]
    pub fn capture_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Capture {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether this is a state-violation error (conflicting mode or
    /// unmatched end call). State violations never mutate flow state.
    #[must_use]
    pub fn is_state_violation(&self) -> bool {
        matches!(
            self,
            Self::CaptureConflict { .. } | Self::NoNavigationInProgress | Self::NoTimespanInProgress
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
