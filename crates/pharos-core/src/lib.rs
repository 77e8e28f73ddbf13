//! # pharos-core
//!
//! Foundation types for the pharos capture orchestrator.
//!
//! - **Branded IDs**: [`StepId`] / [`FlowId`] newtypes (UUID v7)
//! - **Errors**: [`FlowError`] hierarchy covering state violations,
//!   collaborator failures, and aggregation failures
//! - **Data model**: [`GatherMode`], [`Artifacts`], [`GatherStep`] and the
//!   step-naming rules
//! - **Options**: [`FlowFlags`], [`ResolvedConfig`], [`RunnerOptions`]
//! - **Logging**: [`logging::init_subscriber`] for tracing setup
//!
//! ## Crate Position
//!
//! Leaf crate. Depended on by: pharos-flow.

#![deny(unsafe_code)]

pub mod artifacts;
pub mod config;
pub mod errors;
pub mod ids;
pub mod logging;

pub use artifacts::{Artifacts, GatherMode, GatherStep, shorten_url};
pub use config::{FlowFlags, ResolvedConfig, RunnerOptions};
pub use errors::{ActiveMode, FlowError, Result};
pub use ids::{FlowId, StepId};
