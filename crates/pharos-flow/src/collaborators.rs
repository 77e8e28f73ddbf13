//! Collaborator seams.
//!
//! The orchestrator produces no artifacts and computes no scores itself;
//! everything heavy lives behind these traits. Implementations are held as
//! `Arc<dyn ...>` in a [`Collaborators`] bundle so a flow can be driven by
//! real capture backends or by the fakes in [`crate::testing`].

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use pharos_core::{Artifacts, FlowFlags, GatherMode, ResolvedConfig, Result, RunnerOptions};

use crate::options::GatherOptions;
use crate::result::FlowResult;

/// Opaque handle to the single logical page session a flow captures against.
///
/// The orchestrator never drives the page itself; it only threads this
/// handle through to the capture collaborators.
#[derive(Clone, Debug)]
pub struct PageHandle {
    session_id: String,
}

impl PageHandle {
    /// Wrap a collaborator-issued session identifier.
    #[must_use]
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
        }
    }

    /// The underlying session identifier.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// A scored result for one step, as produced by the audit collaborator.
pub type ScoredResult = serde_json::Value;

/// Future returned by a [`NavigationRequestor`].
pub type RequestorFuture = BoxFuture<'static, Result<()>>;

/// Callback that performs (or signals) the actual page navigation.
///
/// The navigation gatherer invokes this once, at the point where the page
/// should navigate. For deferred navigations the orchestrator substitutes a
/// requestor that suspends until the caller fires the external trigger.
pub type NavigationRequestor = Box<dyn FnOnce() -> RequestorFuture + Send>;

/// Artifacts plus the runner options that produced them.
///
/// The `runner_options` Arc is recorded weakly in the flow's side-table;
/// a gatherer that wants the "reuse at aggregation time" optimization keeps
/// its own clone alive, but is never required to.
pub struct CaptureOutput {
    /// Artifact bag for the completed capture.
    pub artifacts: Artifacts,
    /// Resolved execution options the capture ran with.
    pub runner_options: Arc<RunnerOptions>,
}

/// Navigation capture backend.
#[async_trait]
pub trait NavigationGatherer: Send + Sync {
    /// Run a navigation capture, invoking `requestor` to trigger the actual
    /// navigation. Must fail if the navigation fails.
    async fn capture(
        &self,
        page: &PageHandle,
        requestor: NavigationRequestor,
        options: GatherOptions,
    ) -> Result<CaptureOutput>;
}

/// In-flight timespan capture, obtained from [`TimespanGatherer::start`].
#[async_trait]
pub trait TimespanCapture: Send {
    /// End the timespan and produce its artifacts.
    async fn end(self: Box<Self>) -> Result<CaptureOutput>;
}

/// Timespan capture backend.
#[async_trait]
pub trait TimespanGatherer: Send + Sync {
    /// Begin a timespan capture, returning a handle that ends it later.
    async fn start(
        &self,
        page: &PageHandle,
        options: GatherOptions,
    ) -> Result<Box<dyn TimespanCapture>>;
}

/// Snapshot capture backend.
#[async_trait]
pub trait SnapshotGatherer: Send + Sync {
    /// Capture a point-in-time snapshot of the page.
    async fn capture(&self, page: &PageHandle, options: GatherOptions) -> Result<CaptureOutput>;
}

/// External configuration resolver.
///
/// Turns a capture-mode config document plus flags into a [`ResolvedConfig`]
/// the auditor can consume. The orchestrator calls this at aggregation time
/// for any step whose runner options are no longer available.
pub trait ConfigResolver: Send + Sync {
    /// Resolve configuration for the given capture mode.
    fn resolve(
        &self,
        gather_mode: GatherMode,
        config: Option<&serde_json::Value>,
        flags: &FlowFlags,
    ) -> Result<ResolvedConfig>;
}

/// Audit/scoring engine.
#[async_trait]
pub trait Auditor: Send + Sync {
    /// Score one step's artifacts. Returning `Ok(None)` means the auditor
    /// produced nothing for this step, which fails the whole aggregation.
    async fn audit(
        &self,
        artifacts: &Artifacts,
        runner_options: &RunnerOptions,
    ) -> Result<Option<ScoredResult>>;
}

/// Report renderer.
pub trait Renderer: Send + Sync {
    /// Render a flow result into a report document.
    fn render(&self, result: &FlowResult) -> Result<String>;
}

/// Bundle of the external collaborators a flow is constructed with.
#[derive(Clone)]
pub struct Collaborators {
    /// Navigation capture backend.
    pub navigation: Arc<dyn NavigationGatherer>,
    /// Timespan capture backend.
    pub timespan: Arc<dyn TimespanGatherer>,
    /// Snapshot capture backend.
    pub snapshot: Arc<dyn SnapshotGatherer>,
    /// Configuration resolver.
    pub config: Arc<dyn ConfigResolver>,
    /// Audit/scoring engine.
    pub auditor: Arc<dyn Auditor>,
    /// Report renderer.
    pub renderer: Arc<dyn Renderer>,
}
