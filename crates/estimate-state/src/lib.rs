//! Estimate-State: SurrealDB Backend for estimate pipeline runs
//!
//! This crate provides the persistence layer for the estimate pipeline.
//! It owns the authoritative `PipelineRun` record and the rules every
//! transition must satisfy, and handles all I/O with SurrealDB.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: write-then-proceed durability, transition invariants, and a
//! best-effort UI projection.
//!
//! ## Key Components
//!
//! - `PipelineRun`: per-run progress record and transition rules
//! - `PipelineStore`: authoritative run state + append-only stage outputs
//! - `ProgressMirror`: reduced, UI-facing view of a run
//! - `SurrealPipelineStore` / `SurrealProgressMirror`: SurrealDB backends

pub mod connection;
mod error;
pub mod fakes;
mod migrations;
pub mod run;
mod schema;
pub mod storage_traits;
pub mod surreal_store;

pub use connection::{SignIn, StoreConfig};
pub use error::{StateError, StorageError};
pub use run::{
    FailureDetail, PipelineRun, PipelineStatus, ProgressView, StageStatus, StageTransition,
    TransitionRecord,
};
pub use storage_traits::{
    ContentDigest, PipelineStore, ProgressMirror, RunId, StageOutputRecord, StorageResult,
};
pub use surreal_store::{SurrealPipelineStore, SurrealProgressMirror};

/// Result type for estimate-state connection and schema operations
pub type Result<T> = std::result::Result<T, StateError>;
