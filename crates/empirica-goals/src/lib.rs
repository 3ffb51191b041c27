//! The goal graph: session-scoped objectives, their subtasks, and an
//! append-only lineage of which agent created, resumed, or completed them.

pub mod error;
pub mod record;
pub mod store;

pub use error::GoalError;
pub use record::{
    GoalRecord, GoalScope, Importance, LineageAction, LineageEntry, Subtask, SubtaskStatus,
    SuccessCriterion, SuccessCriterionInput,
};
pub use store::GoalGraph;
