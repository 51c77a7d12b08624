//! Client-side orchestration of translation export and import jobs against a
//! Translation Management System.
//!
//! A run submits one job, polls it until it is done or the deadline passes,
//! and moves translations between the TMS and local storage through staging
//! files. [`TranslationSync`] is the entry point; [`TmsConfig`] builds one
//! from `tms.toml`.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod poller;
pub mod state_machine;
pub mod tms;
pub mod translations;

#[cfg(test)]
mod testing;

pub use config::TmsConfig;
pub use error::{ErrorKind, PreconditionFailure, ProtocolFailure, RequestContext, TmsError};
pub use orchestrator::TranslationSync;
pub use poller::{Sleeper, TokioSleeper};
