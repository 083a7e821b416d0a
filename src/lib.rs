//! proctree library
//!
//! Process-tree snapshots, subtree queries, and guarded signal dispatch to
//! relational process sets.

pub mod commands;
pub mod config;
pub mod core;
pub mod dispatch;
pub mod error;
pub mod platform;
pub mod query;
pub mod safety;
pub mod utils;

// Re-export commonly used types for convenience
pub use core::models::{ProcessRecord, ProcessSnapshot, ProcessState};
pub use core::snapshot::{build_snapshot, Probe, ProcessSource, SnapshotBuilder};
pub use dispatch::{
    DeliveryOutcome, DispatchReport, SignalDispatcher, SignalFailure, SignalKind, SignalOperation,
    SignalSender,
};
pub use error::{ProcTreeError, ProcTreeResult};
pub use query::{Query, QueryEngine, QueryOutcome};
pub use safety::{CommandNameLookup, SafetyPolicy, Verdict};
