//! Test doubles for exercising flows without a real capture backend.
//!
//! [`FakeWorld`] wires a full [`Collaborators`] bundle out of in-memory
//! fakes. The fakes resolve configuration exactly the way the fake resolver
//! does, so results aggregated from live runner options and results
//! re-derived from stored config/flags come out identical — which is what
//! the orchestrator promises.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use pharos_core::{
    Artifacts, FlowError, FlowFlags, GatherMode, ResolvedConfig, Result, RunnerOptions,
};

use crate::collaborators::{
    Auditor, CaptureOutput, Collaborators, ConfigResolver, NavigationGatherer,
    NavigationRequestor, PageHandle, Renderer, ScoredResult, SnapshotGatherer, TimespanCapture,
    TimespanGatherer,
};
use crate::flow::UserFlow;
use crate::options::{FlowOptions, GatherOptions};
use crate::result::FlowResult;

/// A requestor that performs the "navigation" immediately.
#[must_use]
pub fn immediate_requestor() -> NavigationRequestor {
    Box::new(|| Box::pin(async { Ok(()) }))
}

/// How the fake navigation gatherer behaves around its requestor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum NavBehavior {
    /// Invoke the requestor, then succeed.
    #[default]
    Normal,
    /// Fail before ever invoking the requestor.
    FailBeforeTrigger,
    /// Invoke the requestor, then fail.
    FailAfterTrigger,
    /// Complete successfully without invoking the requestor.
    SkipRequestor,
}

/// Strong references the fakes keep to the runner options they hand out,
/// standing in for a real gatherer's internal state. Clearing them makes
/// the flow's weak side-table go cold.
type Retained = Arc<Mutex<Vec<Arc<RunnerOptions>>>>;

/// Builder for a fully-faked collaborator bundle.
#[derive(Clone)]
pub struct FakeWorld {
    final_url: String,
    nav_behavior: NavBehavior,
    retained: Retained,
}

impl FakeWorld {
    /// A world whose captures all resolve to `https://example.com/`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            final_url: "https://example.com/".to_owned(),
            nav_behavior: NavBehavior::Normal,
            retained: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Use `url` as the final resolved URL for every capture.
    #[must_use]
    pub fn with_final_url(mut self, url: impl Into<String>) -> Self {
        self.final_url = url.into();
        self
    }

    /// Navigation captures fail before invoking their requestor.
    #[must_use]
    pub fn fail_before_trigger(mut self) -> Self {
        self.nav_behavior = NavBehavior::FailBeforeTrigger;
        self
    }

    /// Navigation captures invoke their requestor, then fail.
    #[must_use]
    pub fn fail_after_trigger(mut self) -> Self {
        self.nav_behavior = NavBehavior::FailAfterTrigger;
        self
    }

    /// Navigation captures complete without invoking their requestor.
    #[must_use]
    pub fn skip_requestor(mut self) -> Self {
        self.nav_behavior = NavBehavior::SkipRequestor;
        self
    }

    /// The fake page session.
    #[must_use]
    pub fn page(&self) -> PageHandle {
        PageHandle::new("sess_fake")
    }

    /// Build the collaborator bundle.
    #[must_use]
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            navigation: Arc::new(FakeNavigation {
                final_url: self.final_url.clone(),
                behavior: self.nav_behavior,
                retained: Arc::clone(&self.retained),
            }),
            timespan: Arc::new(FakeTimespan {
                final_url: self.final_url.clone(),
                retained: Arc::clone(&self.retained),
            }),
            snapshot: Arc::new(FakeSnapshot {
                final_url: self.final_url.clone(),
                retained: Arc::clone(&self.retained),
            }),
            config: Arc::new(FakeResolver),
            auditor: Arc::new(FakeAuditor),
            renderer: Arc::new(FakeRenderer),
        }
    }

    /// Build a flow driven by this world's fakes.
    #[must_use]
    pub fn flow(&self, options: FlowOptions) -> UserFlow {
        UserFlow::new(self.page(), self.collaborators(), options)
    }

    /// Drop every strong runner-options reference the fakes hold, so the
    /// flow's weak side-table entries die.
    pub fn release_runner_options(&self) {
        self.retained.lock().clear();
    }
}

impl Default for FakeWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// The one resolution rule every fake shares: settings are just the config
/// and flags echoed back, so recomputing from a step's stored config/flags
/// reproduces what the gatherer built at capture time.
fn resolve(
    gather_mode: GatherMode,
    config: Option<&serde_json::Value>,
    flags: &FlowFlags,
) -> ResolvedConfig {
    ResolvedConfig {
        gather_mode,
        settings: json!({ "config": config, "flags": flags }),
    }
}

fn capture_output(
    gather_mode: GatherMode,
    final_url: &str,
    options: &GatherOptions,
    retained: &Retained,
) -> CaptureOutput {
    let runner_options = Arc::new(RunnerOptions::new(resolve(
        gather_mode,
        options.config.as_ref(),
        &options.flags,
    )));
    retained.lock().push(Arc::clone(&runner_options));
    CaptureOutput {
        artifacts: Artifacts::new(gather_mode, final_url)
            .with_payload(json!({ "finalUrl": final_url })),
        runner_options,
    }
}

struct FakeNavigation {
    final_url: String,
    behavior: NavBehavior,
    retained: Retained,
}

#[async_trait]
impl NavigationGatherer for FakeNavigation {
    async fn capture(
        &self,
        _page: &PageHandle,
        requestor: NavigationRequestor,
        options: GatherOptions,
    ) -> Result<CaptureOutput> {
        match self.behavior {
            NavBehavior::FailBeforeTrigger => {
                return Err(FlowError::capture("failed before navigation was requested"));
            }
            NavBehavior::SkipRequestor => {}
            NavBehavior::Normal | NavBehavior::FailAfterTrigger => requestor().await?,
        }
        if self.behavior == NavBehavior::FailAfterTrigger {
            return Err(FlowError::capture("failed after navigation was requested"));
        }
        Ok(capture_output(
            GatherMode::Navigation,
            &self.final_url,
            &options,
            &self.retained,
        ))
    }
}

struct FakeTimespan {
    final_url: String,
    retained: Retained,
}

struct FakeTimespanCapture {
    final_url: String,
    options: GatherOptions,
    retained: Retained,
}

#[async_trait]
impl TimespanGatherer for FakeTimespan {
    async fn start(
        &self,
        _page: &PageHandle,
        options: GatherOptions,
    ) -> Result<Box<dyn TimespanCapture>> {
        Ok(Box::new(FakeTimespanCapture {
            final_url: self.final_url.clone(),
            options,
            retained: Arc::clone(&self.retained),
        }))
    }
}

#[async_trait]
impl TimespanCapture for FakeTimespanCapture {
    async fn end(self: Box<Self>) -> Result<CaptureOutput> {
        Ok(capture_output(
            GatherMode::Timespan,
            &self.final_url,
            &self.options,
            &self.retained,
        ))
    }
}

struct FakeSnapshot {
    final_url: String,
    retained: Retained,
}

#[async_trait]
impl SnapshotGatherer for FakeSnapshot {
    async fn capture(&self, _page: &PageHandle, options: GatherOptions) -> Result<CaptureOutput> {
        Ok(capture_output(
            GatherMode::Snapshot,
            &self.final_url,
            &options,
            &self.retained,
        ))
    }
}

struct FakeResolver;

impl ConfigResolver for FakeResolver {
    fn resolve(
        &self,
        gather_mode: GatherMode,
        config: Option<&serde_json::Value>,
        flags: &FlowFlags,
    ) -> Result<ResolvedConfig> {
        Ok(resolve(gather_mode, config, flags))
    }
}

struct FakeAuditor;

#[async_trait]
impl Auditor for FakeAuditor {
    async fn audit(
        &self,
        artifacts: &Artifacts,
        runner_options: &RunnerOptions,
    ) -> Result<Option<ScoredResult>> {
        // URLs containing "no-audit" simulate a step the engine can't score
        if artifacts.final_url.contains("no-audit") {
            return Ok(None);
        }
        Ok(Some(json!({
            "finalUrl": artifacts.final_url,
            "gatherMode": artifacts.gather_mode,
            "settings": runner_options.resolved.settings,
        })))
    }
}

struct FakeRenderer;

impl Renderer for FakeRenderer {
    fn render(&self, result: &FlowResult) -> Result<String> {
        Ok(format!(
            "# {}\n{} step(s)\n",
            result.name,
            result.steps.len()
        ))
    }
}
