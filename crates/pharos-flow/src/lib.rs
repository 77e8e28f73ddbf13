//! # pharos-flow
//!
//! Multi-step capture orchestration over a single page session.
//!
//! - **Collaborator seams**: traits for the external navigation, timespan,
//!   and snapshot gatherers, the config resolver, the auditor, and the
//!   report renderer
//! - **Capture state machine**: one capture mode active at a time, with a
//!   deferred-trigger protocol for externally-initiated navigations
//! - **Step registry**: append-only list of completed [`GatherStep`]s plus
//!   a non-owning runner-options side-table
//! - **Aggregation**: walks the registry in order and materializes one
//!   scored [`FlowResult`]
//!
//! ## Crate Position
//!
//! Aggregation layer. Depends on: pharos-core.
//!
//! [`GatherStep`]: pharos_core::GatherStep

#![deny(unsafe_code)]

pub mod collaborators;
pub mod flow;
pub mod options;
pub mod registry;
pub mod result;
pub mod state;
pub mod testing;

pub use collaborators::{
    Auditor, CaptureOutput, Collaborators, ConfigResolver, NavigationGatherer,
    NavigationRequestor, PageHandle, Renderer, RequestorFuture, ScoredResult, SnapshotGatherer,
    TimespanCapture, TimespanGatherer,
};
pub use flow::UserFlow;
pub use options::{FlowOptions, GatherOptions, StepOptions};
pub use registry::{RunnerOptionsCache, StepRegistry};
pub use result::{FlowArtifacts, FlowResult, FlowResultStep};
pub use state::CaptureState;
