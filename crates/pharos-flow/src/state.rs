//! Capture state machine.
//!
//! Exactly one capture mode may hold the flow at any instant. The states
//! are an explicit tagged enum so the mutual-exclusion invariant is checked
//! by exhaustive matching, not by nullable-field inspection:
//!
//! - `Idle` — no capture active; every operation starts here
//! - `NavigationActive` — a blocking `navigate` is running
//! - `NavigationAwaitingTrigger` — a deferred navigation is parked on its
//!   external trigger
//! - `TimespanActive` — a timespan is open, waiting for `end_timespan`
//!
//! Guards are cooperative: each operation checks the state up front and
//! fails without mutating it on conflict. A single caller drives the flow,
//! so no lock primitive is involved.

use std::fmt;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use pharos_core::{ActiveMode, FlowError, GatherMode, Result};

use crate::collaborators::{CaptureOutput, TimespanCapture};
use crate::options::GatherOptions;

/// A deferred navigation parked between `start_navigation` and
/// `end_navigation`.
///
/// `trigger` releases the capture collaborator's requestor; `task` holds
/// the remainder of the capture. A post-trigger failure stays parked in
/// `task` until `end_navigation` awaits it, so it is observed exactly once.
pub struct PendingNavigation {
    /// Fires the external trigger. Consuming oneshot: a second fire is
    /// unrepresentable.
    pub trigger: oneshot::Sender<()>,
    /// The in-flight capture.
    pub task: JoinHandle<Result<CaptureOutput>>,
    /// Effective options the capture was started with.
    pub options: GatherOptions,
    /// Explicit step name supplied at `start_navigation`, if any.
    pub step_name: Option<String>,
}

/// An open timespan capture.
pub struct ActiveTimespan {
    /// Handle that ends the timespan.
    pub capture: Box<dyn TimespanCapture>,
    /// Effective options captured at `start_timespan` time.
    pub options: GatherOptions,
    /// Explicit step name supplied at `start_timespan`, if any.
    pub step_name: Option<String>,
}

/// Which capture mode currently holds the flow.
#[derive(Default)]
pub enum CaptureState {
    /// No capture active.
    #[default]
    Idle,
    /// A blocking navigation capture is running.
    NavigationActive,
    /// A deferred navigation is awaiting its external trigger.
    NavigationAwaitingTrigger(PendingNavigation),
    /// A timespan capture is open.
    TimespanActive(ActiveTimespan),
}

impl CaptureState {
    /// The active mode, if any.
    #[must_use]
    pub fn active_mode(&self) -> Option<ActiveMode> {
        match self {
            Self::Idle => None,
            Self::NavigationActive | Self::NavigationAwaitingTrigger(_) => {
                Some(ActiveMode::Navigation)
            }
            Self::TimespanActive(_) => Some(ActiveMode::Timespan),
        }
    }

    /// Guard for starting a new capture of `requested` mode.
    ///
    /// Fails with a state-violation error naming the conflicting mode when
    /// any capture is active; never mutates state.
    pub fn ensure_idle(&self, requested: GatherMode) -> Result<()> {
        match self.active_mode() {
            None => Ok(()),
            Some(active) => Err(FlowError::CaptureConflict { requested, active }),
        }
    }
}

impl fmt::Debug for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("Idle"),
            Self::NavigationActive => f.write_str("NavigationActive"),
            Self::NavigationAwaitingTrigger(_) => f.write_str("NavigationAwaitingTrigger"),
            Self::TimespanActive(_) => f.write_str("TimespanActive"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn idle_allows_every_mode() {
        let state = CaptureState::Idle;
        assert!(state.ensure_idle(GatherMode::Navigation).is_ok());
        assert!(state.ensure_idle(GatherMode::Timespan).is_ok());
        assert!(state.ensure_idle(GatherMode::Snapshot).is_ok());
        assert_eq!(state.active_mode(), None);
    }

    #[test]
    fn navigation_active_rejects_all_starts() {
        let state = CaptureState::NavigationActive;
        for mode in [
            GatherMode::Navigation,
            GatherMode::Timespan,
            GatherMode::Snapshot,
        ] {
            assert_matches!(
                state.ensure_idle(mode),
                Err(FlowError::CaptureConflict {
                    active: ActiveMode::Navigation,
                    ..
                })
            );
        }
    }

    #[tokio::test]
    async fn awaiting_trigger_reports_navigation_mode() {
        let (tx, _rx) = oneshot::channel();
        let task = tokio::spawn(async { Err(FlowError::TriggerDropped) });
        let state = CaptureState::NavigationAwaitingTrigger(PendingNavigation {
            trigger: tx,
            task,
            options: GatherOptions::default(),
            step_name: None,
        });
        assert_eq!(state.active_mode(), Some(ActiveMode::Navigation));
        assert_matches!(
            state.ensure_idle(GatherMode::Snapshot),
            Err(FlowError::CaptureConflict {
                requested: GatherMode::Snapshot,
                active: ActiveMode::Navigation,
            })
        );
        assert_eq!(format!("{state:?}"), "NavigationAwaitingTrigger");
    }

    #[test]
    fn default_is_idle() {
        assert_matches!(CaptureState::default(), CaptureState::Idle);
    }
}
