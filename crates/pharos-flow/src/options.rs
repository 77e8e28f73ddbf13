//! Flow-level and per-step options, and the effective-option merge.
//!
//! Merge rules (shallow, highest priority last):
//! 1. flow-level config/flags
//! 2. step-level overrides
//! 3. capture-mode defaults (navigation only) — applied only to flags the
//!    caller left unset

use serde::{Deserialize, Serialize};

use pharos_core::FlowFlags;

/// Options a flow is constructed with.
#[derive(Clone, Debug, Default)]
pub struct FlowOptions {
    /// Explicit flow name. Defaults to `"User flow (<host>)"` at
    /// aggregation time when unset.
    pub name: Option<String>,
    /// Flow-level capture-mode config document.
    pub config: Option<serde_json::Value>,
    /// Flow-level flags.
    pub flags: FlowFlags,
}

/// Per-step overrides accepted by every capture operation.
#[derive(Clone, Debug, Default)]
pub struct StepOptions {
    /// Explicit step name; wins over the derived `"<Mode> report (...)"`.
    pub name: Option<String>,
    /// Step-level config. When present it replaces (not merges with) the
    /// flow-level config for this step.
    pub config: Option<serde_json::Value>,
    /// Step-level flag overrides.
    pub flags: FlowFlags,
}

impl StepOptions {
    /// Step options with just an explicit name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

/// Effective options handed to a capture collaborator and recorded on the
/// resulting step.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatherOptions {
    /// Effective capture-mode config (step-level, else flow-level).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub config: Option<serde_json::Value>,
    /// Effective flags after overlay and mode defaults.
    pub flags: FlowFlags,
}

impl FlowOptions {
    /// Merge flow-level options with step-level overrides.
    #[must_use]
    pub fn effective(&self, step: &StepOptions) -> GatherOptions {
        GatherOptions {
            config: step.config.clone().or_else(|| self.config.clone()),
            flags: self.flags.overlaid(&step.flags),
        }
    }
}

impl GatherOptions {
    /// Apply the navigation-specific defaults on top of merged options.
    ///
    /// - The interstitial `about:blank` transition is skipped unless the
    ///   caller explicitly asked for it.
    /// - Subsequent navigations in a flow are not cold loads, so storage
    ///   reset is disabled by default from the second navigation on.
    #[must_use]
    pub fn with_navigation_defaults(mut self, is_first_navigation: bool) -> Self {
        if self.flags.skip_about_blank.is_none() {
            self.flags.skip_about_blank = Some(true);
        }
        if !is_first_navigation && self.flags.disable_storage_reset.is_none() {
            self.flags.disable_storage_reset = Some(true);
        }
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn step_config_replaces_flow_config() {
        let flow = FlowOptions {
            config: Some(json!({"level": "flow"})),
            ..FlowOptions::default()
        };
        let step = StepOptions {
            config: Some(json!({"level": "step"})),
            ..StepOptions::default()
        };
        assert_eq!(flow.effective(&step).config, Some(json!({"level": "step"})));
    }

    #[test]
    fn flow_config_used_when_step_has_none() {
        let flow = FlowOptions {
            config: Some(json!({"level": "flow"})),
            ..FlowOptions::default()
        };
        assert_eq!(
            flow.effective(&StepOptions::default()).config,
            Some(json!({"level": "flow"}))
        );
    }

    #[test]
    fn step_flags_override_flow_flags() {
        let flow = FlowOptions {
            flags: FlowFlags {
                skip_about_blank: Some(false),
                ..FlowFlags::default()
            },
            ..FlowOptions::default()
        };
        let step = StepOptions {
            flags: FlowFlags {
                skip_about_blank: Some(true),
                ..FlowFlags::default()
            },
            ..StepOptions::default()
        };
        assert_eq!(flow.effective(&step).flags.skip_about_blank, Some(true));
    }

    #[test]
    fn first_navigation_keeps_storage_reset_unset() {
        let opts = FlowOptions::default()
            .effective(&StepOptions::default())
            .with_navigation_defaults(true);
        assert_eq!(opts.flags.skip_about_blank, Some(true));
        assert_eq!(opts.flags.disable_storage_reset, None);
    }

    #[test]
    fn subsequent_navigation_disables_storage_reset() {
        let opts = FlowOptions::default()
            .effective(&StepOptions::default())
            .with_navigation_defaults(false);
        assert_eq!(opts.flags.disable_storage_reset, Some(true));
    }

    #[test]
    fn explicit_storage_reset_override_survives_defaults() {
        let step = StepOptions {
            flags: FlowFlags {
                disable_storage_reset: Some(false),
                ..FlowFlags::default()
            },
            ..StepOptions::default()
        };
        let opts = FlowOptions::default()
            .effective(&step)
            .with_navigation_defaults(false);
        assert_eq!(opts.flags.disable_storage_reset, Some(false));
    }

    #[test]
    fn explicit_about_blank_override_survives_defaults() {
        let step = StepOptions {
            flags: FlowFlags {
                skip_about_blank: Some(false),
                ..FlowFlags::default()
            },
            ..StepOptions::default()
        };
        let opts = FlowOptions::default()
            .effective(&step)
            .with_navigation_defaults(true);
        assert_eq!(opts.flags.skip_about_blank, Some(false));
    }
}
