//! Flags, resolved configuration, and per-step runner options.
//!
//! Flag merging here is shallow on purpose: the orchestrator never parses
//! or validates capture-level options, it only overlays step values on top
//! of flow values and hands the result to the collaborators.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::artifacts::GatherMode;

/// Capture-mode flags carried by a flow and overridable per step.
///
/// The two named flags are the ones the orchestrator itself defaults (see
/// the navigation rules in pharos-flow); anything else passes through in
/// `extra` untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowFlags {
    /// Skip the interstitial `about:blank` transition before navigating.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub skip_about_blank: Option<bool>,
    /// Do not clear storage (cache, cookies, local storage) before loading.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub disable_storage_reset: Option<bool>,
    /// Passthrough flags the orchestrator does not interpret.
    #[serde(flatten, default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl FlowFlags {
    /// Overlay `overrides` on top of `self`: a `Some` override wins, extras
    /// merge shallowly with override entries winning.
    #[must_use]
    pub fn overlaid(&self, overrides: &Self) -> Self {
        let mut extra = self.extra.clone();
        extra.extend(overrides.extra.clone());
        Self {
            skip_about_blank: overrides.skip_about_blank.or(self.skip_about_blank),
            disable_storage_reset: overrides
                .disable_storage_reset
                .or(self.disable_storage_reset),
            extra,
        }
    }
}

/// Output of the external configuration resolver: a capture-mode config
/// ready for a gatherer or auditor to consume.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    /// Capture mode the config was resolved for.
    pub gather_mode: GatherMode,
    /// Resolved settings document.
    pub settings: serde_json::Value,
}

/// Ephemeral, per-step resolved execution options.
///
/// Produced at capture time by a gatherer (or recomputed at aggregation
/// time from the step's stored config/flags). The computed cache is private
/// scratch space for the audit collaborator; a fresh `RunnerOptions` always
/// starts with an empty one.
#[derive(Debug)]
pub struct RunnerOptions {
    /// Resolved capture-mode configuration.
    pub resolved: ResolvedConfig,
    /// Private per-step result cache.
    computed_cache: Mutex<BTreeMap<String, serde_json::Value>>,
}

impl RunnerOptions {
    /// Create runner options with an empty computed cache.
    #[must_use]
    pub fn new(resolved: ResolvedConfig) -> Self {
        Self {
            resolved,
            computed_cache: Mutex::new(BTreeMap::new()),
        }
    }

    /// Look up a cached computation.
    #[must_use]
    pub fn cached(&self, key: &str) -> Option<serde_json::Value> {
        self.computed_cache.lock().get(key).cloned()
    }

    /// Store a computation result.
    pub fn cache_put(&self, key: impl Into<String>, value: serde_json::Value) {
        let _ = self.computed_cache.lock().insert(key.into(), value);
    }

    /// Number of cached entries.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.computed_cache.lock().len()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
