//! Step registry and runner-options side-table.
//!
//! The registry is the only shared mutable resource in a flow: append-only,
//! single-writer. Steps are immutable once pushed.
//!
//! The side-table associates each step (by [`StepId`], identity not value)
//! with the runner options that produced it — weakly. It never owns the
//! options and never keeps a step alive: if a gatherer dropped its Arc, the
//! entry is simply gone and the aggregator recomputes from the step's
//! stored config/flags. Reusable-if-present, nothing more.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use tracing::debug;

use pharos_core::{GatherMode, GatherStep, RunnerOptions, StepId};

/// Append-only ordered list of completed capture steps.
#[derive(Debug, Default)]
pub struct StepRegistry {
    steps: Vec<GatherStep>,
}

impl StepRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed step. Returns a reference to the stored step.
    pub fn push(&mut self, step: GatherStep) -> &GatherStep {
        debug!(step = %step.name, mode = %step.artifacts.gather_mode, "step appended");
        self.steps.push(step);
        // push guarantees non-empty
        &self.steps[self.steps.len() - 1]
    }

    /// All recorded steps, in capture order.
    #[must_use]
    pub fn steps(&self) -> &[GatherStep] {
        &self.steps
    }

    /// Number of recorded steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether no steps have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Whether any recorded step was captured under `mode`.
    #[must_use]
    pub fn has_mode(&self, mode: GatherMode) -> bool {
        self.steps.iter().any(|s| s.artifacts.gather_mode == mode)
    }

    /// First recorded step, if any.
    #[must_use]
    pub fn first(&self) -> Option<&GatherStep> {
        self.steps.first()
    }
}

/// Non-owning side-table from step identity to runner options.
#[derive(Debug, Default)]
pub struct RunnerOptionsCache {
    entries: HashMap<StepId, Weak<RunnerOptions>>,
}

impl RunnerOptionsCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a weak association for a step. The cache takes no ownership;
    /// the entry dies with the last strong reference held elsewhere.
    pub fn insert(&mut self, id: StepId, options: &Arc<RunnerOptions>) {
        let _ = self.entries.insert(id, Arc::downgrade(options));
    }

    /// Look up the runner options for a step, if they are still alive.
    #[must_use]
    pub fn get(&self, id: &StepId) -> Option<Arc<RunnerOptions>> {
        self.entries.get(id).and_then(Weak::upgrade)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
