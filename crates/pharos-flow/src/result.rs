//! Flow result aggregation and the persistence surface.
//!
//! `create_flow_result` walks the registry in capture order, re-deriving
//! runner options for any step whose side-table entry is gone, and invokes
//! the audit collaborator once per step. A failed pass discards all of its
//! progress; the steps stay in the registry for retry.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use pharos_core::{FlowError, GatherStep, Result, RunnerOptions};

use crate::collaborators::{Collaborators, PageHandle, ScoredResult};
use crate::flow::UserFlow;
use crate::options::FlowOptions;

/// One entry of a flow result: a step's name and its scored result.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowResultStep {
    /// Display name of the step.
    pub name: String,
    /// Scored result from the audit collaborator.
    pub result: ScoredResult,
}

/// Ordered, scored result of a whole flow. Built on demand, never mutated.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowResult {
    /// Flow display name (explicit, or derived from the first step's URL).
    pub name: String,
    /// Per-step results, in capture order.
    pub steps: Vec<FlowResultStep>,
}

/// The persistable `{gatherSteps, name}` document.
///
/// Persistence itself is the caller's job; this type is the stable wire
/// shape for it, and [`UserFlow::from_artifacts_json`] is its inverse.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowArtifacts {
    /// All recorded steps, in capture order.
    pub gather_steps: Vec<GatherStep>,
    /// Explicit flow name, if one was set.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
}

impl UserFlow {
    /// Aggregate every recorded step into an ordered, scored flow result.
    ///
    /// Fails on an empty flow, or when the auditor yields no result for a
    /// step (reported with that step's name).
    pub async fn create_flow_result(&mut self) -> Result<FlowResult> {
        if self.registry.is_empty() {
            return Err(FlowError::NoSteps);
        }

        let name = self
            .options
            .name
            .clone()
            .unwrap_or_else(|| default_flow_name(self.registry.steps()));

        let mut steps = Vec::with_capacity(self.registry.len());
        for step in self.registry.steps() {
            let runner_options = match self.runner_cache.get(&step.id) {
                Some(cached) => {
                    debug!(step = %step.name, "reusing cached runner options");
                    cached
                }
                None => {
                    let fresh = resolve_runner_options(&self.collaborators, &self.options, step)?;
                    self.runner_cache.insert(step.id.clone(), &fresh);
                    fresh
                }
            };

            let scored = self
                .collaborators
                .auditor
                .audit(&step.artifacts, &runner_options)
                .await?
                .ok_or_else(|| FlowError::MissingAuditResult {
                    step_name: step.name.clone(),
                })?;
            steps.push(FlowResultStep {
                name: step.name.clone(),
                result: scored,
            });
        }

        info!(flow = %name, steps = steps.len(), "flow result created");
        Ok(FlowResult { name, steps })
    }

    /// Build the flow result and render it through the report collaborator.
    pub async fn generate_report(&mut self) -> Result<String> {
        let result = self.create_flow_result().await?;
        self.collaborators.renderer.render(&result)
    }

    /// Snapshot the step list as a persistable `{gatherSteps, name}`
    /// document.
    #[must_use]
    pub fn create_artifacts_json(&self) -> FlowArtifacts {
        FlowArtifacts {
            gather_steps: self.registry.steps().to_vec(),
            name: self.options.name.clone(),
        }
    }

    /// Rebuild a flow from a persisted `{gatherSteps, name}` document so it
    /// can be re-aggregated without re-capturing.
    ///
    /// The runner-options side-table starts empty; every step resolves its
    /// configuration from the stored config/flags on the first pass.
    #[must_use]
    pub fn from_artifacts_json(
        page: PageHandle,
        collaborators: Collaborators,
        artifacts: FlowArtifacts,
    ) -> Self {
        let FlowArtifacts { gather_steps, name } = artifacts;
        let mut flow = Self::new(
            page,
            collaborators,
            FlowOptions {
                name,
                ..FlowOptions::default()
            },
        );
        for step in gather_steps {
            let _ = flow.registry.push(step);
        }
        flow
    }
}

/// Re-derive runner options for a step whose side-table entry is gone:
/// step-level config (else flow-level) merged with the step's stored flags,
/// with a fresh, empty computed cache.
fn resolve_runner_options(
    collaborators: &Collaborators,
    options: &FlowOptions,
    step: &GatherStep,
) -> Result<Arc<RunnerOptions>> {
    debug!(step = %step.name, "re-deriving runner options");
    let config = step.config.as_ref().or(options.config.as_ref());
    let resolved =
        collaborators
            .config
            .resolve(step.artifacts.gather_mode, config, &step.flags)?;
    Ok(Arc::new(RunnerOptions::new(resolved)))
}

/// Default flow name: `"User flow (<host of first step's final URL>)"`.
fn default_flow_name(steps: &[GatherStep]) -> String {
    let host = steps
        .first()
        .and_then(|step| Url::parse(&step.artifacts.final_url).ok())
        .and_then(|url| url.host_str().map(ToOwned::to_owned))
        .unwrap_or_else(|| "unknown".to_owned());
    format!("User flow ({host})")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
