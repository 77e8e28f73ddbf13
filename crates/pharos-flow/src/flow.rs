//! The flow orchestrator.
//!
//! [`UserFlow`] sequences independent captures over one page session,
//! enforces the one-active-capture invariant, and appends every completed
//! capture to the step registry together with the options it ran under.
//!
//! The deferred navigation protocol is a two-phase oneshot handoff:
//!
//! 1. `start_navigation` spawns the capture and hands it a requestor that
//!    first signals "ready for trigger", then suspends on the trigger
//!    channel. The caller resumes as soon as the ready signal arrives.
//! 2. `end_navigation` fires the trigger and awaits the parked capture.
//!
//! A capture failure before the ready signal is returned by
//! `start_navigation` itself (the machine stays idle). A failure after it
//! is parked in the spawned task's `JoinHandle` and observed exactly once,
//! when `end_navigation` awaits it — an unpolled `JoinHandle` is inert, so
//! no unobserved-failure state exists in the interim.

use std::mem;
use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use pharos_core::{ActiveMode, FlowError, FlowId, GatherMode, GatherStep, Result};

use crate::collaborators::{CaptureOutput, Collaborators, NavigationRequestor, PageHandle};
use crate::options::{FlowOptions, GatherOptions, StepOptions};
use crate::registry::{RunnerOptionsCache, StepRegistry};
use crate::state::{ActiveTimespan, CaptureState, PendingNavigation};

/// A multi-step capture flow over a single page session.
///
/// Not safe for concurrent capture invocations: the mutual-exclusion
/// invariant is cooperative (state checks at the head of each operation),
/// and the `&mut self` receivers assume one caller driving the flow
/// sequentially. Independent flows share no data.
pub struct UserFlow {
    id: FlowId,
    page: PageHandle,
    pub(crate) collaborators: Collaborators,
    pub(crate) options: FlowOptions,
    state: CaptureState,
    pub(crate) registry: StepRegistry,
    pub(crate) runner_cache: RunnerOptionsCache,
}

impl UserFlow {
    /// Create a flow over `page` with the given collaborators and options.
    #[must_use]
    pub fn new(page: PageHandle, collaborators: Collaborators, options: FlowOptions) -> Self {
        let id = FlowId::new();
        debug!(flow = %id, page = %page.session_id(), "flow created");
        Self {
            id,
            page,
            collaborators,
            options,
            state: CaptureState::Idle,
            registry: StepRegistry::new(),
            runner_cache: RunnerOptionsCache::new(),
        }
    }

    /// Unique identifier for this flow instance.
    #[must_use]
    pub fn id(&self) -> &FlowId {
        &self.id
    }

    /// The page session this flow captures against.
    #[must_use]
    pub fn page(&self) -> &PageHandle {
        &self.page
    }

    /// Explicit flow name, if one was supplied at construction.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.options.name.as_deref()
    }

    /// Recorded steps, in capture order.
    #[must_use]
    pub fn steps(&self) -> &[GatherStep] {
        self.registry.steps()
    }

    /// Number of recorded steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.registry.len()
    }

    /// Which capture mode is currently active, if any.
    #[must_use]
    pub fn current_mode(&self) -> Option<ActiveMode> {
        self.state.active_mode()
    }

    /// Whether a navigation step has already been recorded.
    #[must_use]
    pub fn has_navigation_step(&self) -> bool {
        self.registry.has_mode(GatherMode::Navigation)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Capture operations
    // ─────────────────────────────────────────────────────────────────────

    /// Run a blocking navigation capture.
    ///
    /// `requestor` performs (or signals) the actual navigation when the
    /// capture collaborator invokes it. Atomic from the state machine's
    /// perspective: the flow is idle again by the time this returns.
    pub async fn navigate(
        &mut self,
        requestor: NavigationRequestor,
        step_options: Option<StepOptions>,
    ) -> Result<&GatherStep> {
        self.state.ensure_idle(GatherMode::Navigation)?;
        let step_options = step_options.unwrap_or_default();
        let opts = self.navigation_options(&step_options);

        debug!(page = %self.page.session_id(), "navigation capture started");
        self.state = CaptureState::NavigationActive;
        let outcome = self
            .collaborators
            .navigation
            .capture(&self.page, requestor, opts.clone())
            .await;
        self.state = CaptureState::Idle;

        Ok(self.append_step(outcome?, step_options.name, opts))
    }

    /// Begin a deferred navigation capture.
    ///
    /// Suspends only until the capture collaborator is parked on its
    /// trigger, then transitions to awaiting-trigger. Capture failures
    /// before that point are returned here and leave the flow idle.
    pub async fn start_navigation(&mut self, step_options: Option<StepOptions>) -> Result<()> {
        self.state.ensure_idle(GatherMode::Navigation)?;
        let step_options = step_options.unwrap_or_default();
        let opts = self.navigation_options(&step_options);

        let (ready_tx, ready_rx) = oneshot::channel::<()>();
        let (trigger_tx, trigger_rx) = oneshot::channel::<()>();
        let requestor: NavigationRequestor = Box::new(move || {
            Box::pin(async move {
                let _ = ready_tx.send(());
                trigger_rx.await.map_err(|_| FlowError::TriggerDropped)?;
                Ok(())
            })
        });

        let gatherer = Arc::clone(&self.collaborators.navigation);
        let page = self.page.clone();
        let capture_opts = opts.clone();
        let task =
            tokio::spawn(async move { gatherer.capture(&page, requestor, capture_opts).await });

        match ready_rx.await {
            Ok(()) => {
                debug!(page = %self.page.session_id(), "deferred navigation awaiting trigger");
                self.state = CaptureState::NavigationAwaitingTrigger(PendingNavigation {
                    trigger: trigger_tx,
                    task,
                    options: opts,
                    step_name: step_options.name,
                });
                Ok(())
            }
            // The requestor was dropped unused: the capture settled before
            // the trigger was ever armed. Surface its failure here; a clean
            // exit without requesting the trigger is a contract violation.
            Err(_) => match task.await {
                Ok(Ok(_)) => Err(FlowError::TriggerNeverRequested),
                Ok(Err(err)) => Err(err),
                Err(join_err) => Err(FlowError::Internal(format!(
                    "navigation capture task failed: {join_err}"
                ))),
            },
        }
    }

    /// Fire the deferred navigation's trigger and await the capture.
    ///
    /// Post-trigger capture failures surface here, exactly once.
    pub async fn end_navigation(&mut self) -> Result<&GatherStep> {
        match &self.state {
            CaptureState::NavigationAwaitingTrigger(_) => {}
            CaptureState::TimespanActive(_) => {
                return Err(FlowError::CaptureConflict {
                    requested: GatherMode::Navigation,
                    active: ActiveMode::Timespan,
                });
            }
            CaptureState::Idle | CaptureState::NavigationActive => {
                return Err(FlowError::NoNavigationInProgress);
            }
        }
        let CaptureState::NavigationAwaitingTrigger(pending) =
            mem::replace(&mut self.state, CaptureState::Idle)
        else {
            return Err(FlowError::NoNavigationInProgress);
        };
        let PendingNavigation {
            trigger,
            task,
            options,
            step_name,
        } = pending;

        if trigger.send(()).is_err() {
            // Requestor already gone; the task result carries the failure.
            warn!("navigation trigger receiver was already dropped");
        }
        let outcome = match task.await {
            Ok(result) => result,
            Err(join_err) => Err(FlowError::Internal(format!(
                "navigation capture task failed: {join_err}"
            ))),
        };

        Ok(self.append_step(outcome?, step_name, options))
    }

    /// Begin a timespan capture.
    pub async fn start_timespan(&mut self, step_options: Option<StepOptions>) -> Result<()> {
        self.state.ensure_idle(GatherMode::Timespan)?;
        let step_options = step_options.unwrap_or_default();
        let opts = self.options.effective(&step_options);

        let capture = self
            .collaborators
            .timespan
            .start(&self.page, opts.clone())
            .await?;
        debug!(page = %self.page.session_id(), "timespan capture started");
        self.state = CaptureState::TimespanActive(ActiveTimespan {
            capture,
            options: opts,
            step_name: step_options.name,
        });
        Ok(())
    }

    /// End the open timespan capture, recording its step with the options
    /// captured at `start_timespan` time.
    pub async fn end_timespan(&mut self) -> Result<&GatherStep> {
        match &self.state {
            CaptureState::TimespanActive(_) => {}
            CaptureState::NavigationActive | CaptureState::NavigationAwaitingTrigger(_) => {
                return Err(FlowError::CaptureConflict {
                    requested: GatherMode::Timespan,
                    active: ActiveMode::Navigation,
                });
            }
            CaptureState::Idle => return Err(FlowError::NoTimespanInProgress),
        }
        let CaptureState::TimespanActive(active) =
            mem::replace(&mut self.state, CaptureState::Idle)
        else {
            return Err(FlowError::NoTimespanInProgress);
        };
        let ActiveTimespan {
            capture,
            options,
            step_name,
        } = active;

        let output = capture.end().await?;
        Ok(self.append_step(output, step_name, options))
    }

    /// Capture a point-in-time snapshot. Atomic; no state transition.
    pub async fn snapshot(&mut self, step_options: Option<StepOptions>) -> Result<&GatherStep> {
        self.state.ensure_idle(GatherMode::Snapshot)?;
        let step_options = step_options.unwrap_or_default();
        let opts = self.options.effective(&step_options);

        let output = self
            .collaborators
            .snapshot
            .capture(&self.page, opts.clone())
            .await?;
        Ok(self.append_step(output, step_options.name, opts))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    /// Effective navigation options: flow + step merge, then the
    /// navigation-specific defaults.
    fn navigation_options(&self, step_options: &StepOptions) -> GatherOptions {
        self.options
            .effective(step_options)
            .with_navigation_defaults(!self.has_navigation_step())
    }

    /// Append a completed capture to the registry and record its runner
    /// options weakly in the side-table.
    fn append_step(
        &mut self,
        output: CaptureOutput,
        step_name: Option<String>,
        opts: GatherOptions,
    ) -> &GatherStep {
        let CaptureOutput {
            artifacts,
            runner_options,
        } = output;
        let step = GatherStep::new(artifacts, step_name, opts.config, opts.flags);
        self.runner_cache.insert(step.id.clone(), &runner_options);
        info!(step = %step.name, mode = %step.artifacts.gather_mode, "capture step recorded");
        self.registry.push(step)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
