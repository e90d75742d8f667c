//! File actions module.
//!
//! This module provides functionality for:
//! - Turning keep selections into per-group deletion plans
//! - Producing selections interactively or from a batch policy
//! - Executing plans by permanent removal or via the system trash
//!
//! ```no_run
//! use psamfinder::actions::{execute_deletion, plan_deletion, DeleteOptions, KeepPolicy};
//! use psamfinder::actions::select_by_policy;
//! use psamfinder::diagnostics::LogSink;
//!
//! # let groups = Vec::new();
//! let selections = select_by_policy(&groups, KeepPolicy::Newest);
//! let plans = plan_deletion(&groups, &selections, &LogSink);
//! let outcomes = execute_deletion(plans, &DeleteOptions::dry_run(), &LogSink);
//! ```

pub mod delete;
pub mod plan;
pub mod policy;
pub mod prompt;

// Re-export commonly used types
pub use delete::{
    execute_deletion, remove_file, DeleteError, DeleteMethod, DeleteOptions, DeletionOutcome,
    DeletionStatus, DeletionSummary,
};
pub use plan::{
    plan_deletion, DeletionPlan, GroupResolution, GroupState, KeepSelection, SelectionError,
    SkipReason,
};
pub use policy::{select_by_policy, KeepPolicy};
pub use prompt::{confirm, prompt_selections, KEEP_PROMPT};
