//! Capture artifacts and completed-step records.
//!
//! A [`GatherStep`] is one completed capture: the artifact bag the capture
//! collaborator produced, the display name for the step, and the
//! config/flags that were in effect when it was captured. Steps are
//! append-only and immutable once recorded.
//!
//! Wire format is camelCase JSON so persisted flows match the
//! `{gatherSteps, name}` document the caller stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::config::FlowFlags;
use crate::ids::StepId;

/// The capture mode a step was taken under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatherMode {
    /// A full page navigation capture.
    Navigation,
    /// A start/end-bounded timespan capture.
    Timespan,
    /// A point-in-time snapshot capture.
    Snapshot,
}

impl GatherMode {
    /// Capitalized label used in derived step names.
    #[must_use]
    pub fn report_label(self) -> &'static str {
        match self {
            Self::Navigation => "Navigation",
            Self::Timespan => "Timespan",
            Self::Snapshot => "Snapshot",
        }
    }
}

impl fmt::Display for GatherMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Navigation => write!(f, "navigation"),
            Self::Timespan => write!(f, "timespan"),
            Self::Snapshot => write!(f, "snapshot"),
        }
    }
}

/// Opaque artifact bag produced by a capture collaborator.
///
/// The orchestrator only reads the capture mode and the resolved final URL;
/// everything else rides along in `payload` untouched.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifacts {
    /// Capture mode this bag was taken under.
    pub gather_mode: GatherMode,
    /// Final resolved page URL after the capture settled.
    pub final_url: String,
    /// When the capture ran (UTC).
    pub fetched_at: DateTime<Utc>,
    /// Collaborator-specific artifact data.
    pub payload: serde_json::Value,
}

impl Artifacts {
    /// Create an artifact bag stamped with the current time.
    #[must_use]
    pub fn new(gather_mode: GatherMode, final_url: impl Into<String>) -> Self {
        Self {
            gather_mode,
            final_url: final_url.into(),
            fetched_at: Utc::now(),
            payload: serde_json::Value::Null,
        }
    }

    /// Attach a collaborator payload.
    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// One completed capture step, paired with the configuration that was in
/// effect when it was captured.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatherStep {
    /// Step identity. Keys the runner-options side-table; minted fresh when
    /// rehydrating a persisted document that lacks it.
    #[serde(default)]
    pub id: StepId,
    /// Artifact bag from the capture collaborator.
    pub artifacts: Artifacts,
    /// Display label for the step.
    pub name: String,
    /// Capture-mode config in effect for this step, if one was supplied.
    /// Absent means "use the flow-level config at aggregation time".
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub config: Option<serde_json::Value>,
    /// Capture-mode flags in effect for this step.
    #[serde(default)]
    pub flags: FlowFlags,
}

impl GatherStep {
    /// Create a step, deriving the name from the artifacts when no explicit
    /// name is supplied.
    #[must_use]
    pub fn new(
        artifacts: Artifacts,
        name: Option<String>,
        config: Option<serde_json::Value>,
        flags: FlowFlags,
    ) -> Self {
        let name = name.unwrap_or_else(|| derived_step_name(&artifacts));
        Self {
            id: StepId::new(),
            artifacts,
            name,
            config,
            flags,
        }
    }
}

/// Shorten a URL to `host + path`, discarding query and fragment.
///
/// Unparseable or hostless URLs (e.g. `about:blank`) are returned verbatim.
#[must_use]
pub fn shorten_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => format!("{host}{}", parsed.path()),
            None => raw.to_owned(),
        },
        Err(_) => raw.to_owned(),
    }
}

/// Derived step name: `"<Mode> report (<host + path>)"`.
#[must_use]
pub fn derived_step_name(artifacts: &Artifacts) -> String {
    format!(
        "{} report ({})",
        artifacts.gather_mode.report_label(),
        shorten_url(&artifacts.final_url)
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn shorten_strips_query_and_fragment() {
        assert_eq!(
            shorten_url("https://example.com/foo?x=1#y"),
            "example.com/foo"
        );
    }

    #[test]
    fn shorten_keeps_path() {
        assert_eq!(shorten_url("https://shop.example/cart"), "shop.example/cart");
    }

    #[test]
    fn shorten_bare_host_keeps_root_path() {
        assert_eq!(shorten_url("https://example.com"), "example.com/");
    }

    #[test]
    fn shorten_hostless_url_verbatim() {
        assert_eq!(shorten_url("about:blank"), "about:blank");
    }

    #[test]
    fn shorten_garbage_verbatim() {
        assert_eq!(shorten_url("not a url"), "not a url");
    }

    #[test]
    fn derived_name_navigation() {
        let artifacts = Artifacts::new(GatherMode::Navigation, "https://example.com/foo?x=1#y");
        assert_eq!(
            derived_step_name(&artifacts),
            "Navigation report (example.com/foo)"
        );
    }

    #[test]
    fn derived_name_used_when_no_explicit_name() {
        let artifacts = Artifacts::new(GatherMode::Snapshot, "https://example.com/a");
        let step = GatherStep::new(artifacts, None, None, FlowFlags::default());
        assert_eq!(step.name, "Snapshot report (example.com/a)");
    }

    #[test]
    fn explicit_name_wins() {
        let artifacts = Artifacts::new(GatherMode::Timespan, "https://example.com/a");
        let step = GatherStep::new(
            artifacts,
            Some("Checkout timespan".to_owned()),
            None,
            FlowFlags::default(),
        );
        assert_eq!(step.name, "Checkout timespan");
    }

    #[test]
    fn steps_have_distinct_ids() {
        let a = GatherStep::new(
            Artifacts::new(GatherMode::Snapshot, "https://example.com/"),
            None,
            None,
            FlowFlags::default(),
        );
        let b = GatherStep::new(
            Artifacts::new(GatherMode::Snapshot, "https://example.com/"),
            None,
            None,
            FlowFlags::default(),
        );
        assert_ne!(a.id, b.id, "structurally identical steps keep distinct identity");
    }

    #[test]
    fn step_serde_roundtrip_camel_case() {
        let step = GatherStep::new(
            Artifacts::new(GatherMode::Navigation, "https://example.com/foo")
                .with_payload(json!({"trace": true})),
            None,
            Some(json!({"extends": "default"})),
            FlowFlags {
                disable_storage_reset: Some(true),
                ..FlowFlags::default()
            },
        );

        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["artifacts"]["gatherMode"], "navigation");
        assert_eq!(json["artifacts"]["finalUrl"], "https://example.com/foo");
        assert_eq!(json["flags"]["disableStorageReset"], true);

        let back: GatherStep = serde_json::from_value(json).unwrap();
        assert_eq!(back.name, step.name);
        assert_eq!(back.id, step.id);
    }

    #[test]
    fn rehydration_without_id_mints_one() {
        let doc = json!({
            "artifacts": {
                "gatherMode": "snapshot",
                "finalUrl": "https://example.com/",
                "fetchedAt": "2026-08-30T12:00:00Z",
                "payload": null
            },
            "name": "Snapshot report (example.com/)"
        });
        let step: GatherStep = serde_json::from_value(doc).unwrap();
        assert!(!step.id.as_str().is_empty());
    }

    #[test]
    fn gather_mode_display() {
        assert_eq!(GatherMode::Navigation.to_string(), "navigation");
        assert_eq!(GatherMode::Timespan.report_label(), "Timespan");
    }
}
