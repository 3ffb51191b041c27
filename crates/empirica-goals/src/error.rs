use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum GoalError {
    #[error("session store error: {0}")]
    SessionStore(#[from] empirica_core::session_store::SessionStoreError),

    #[error("goal not found: {0}")]
    GoalNotFound(Uuid),

    #[error("subtask not found: {0}")]
    SubtaskNotFound(Uuid),

    #[error("dependency {0} does not exist in this goal")]
    UnknownDependency(Uuid),

    #[error("subtask {0} has incomplete dependencies")]
    DependenciesIncomplete(Uuid),

    #[error("cannot mark complete: not every success criterion is met")]
    CriteriaNotMet,

    #[error("success criterion not found: {0}")]
    CriterionNotFound(Uuid),

    #[error("goal {0} is already terminal")]
    AlreadyTerminal(Uuid),
}
