use empirica_checkpoint::CheckpointError;
use empirica_core::llm_transport::LlmTransportError;
use empirica_goals::GoalError;
use empirica_identity::IdentityError;
use empirica_parser::ParserError;
use empirica_vector::VectorError;

#[derive(Debug, thiserror::Error)]
pub enum CascadeError {
    #[error("vector error: {0}")]
    Vector(#[from] VectorError),

    #[error("parser error: {0}")]
    Parser(#[from] ParserError),

    #[error("checkpoint store error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("goal graph error: {0}")]
    Goal(#[from] GoalError),

    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("LM transport error: {0}")]
    Transport(#[from] LlmTransportError),

    #[error("report_act_outcome called but the cascade is not awaiting an act outcome")]
    NotAwaitingAct,

    #[error("run_until_act called on a cascade that already reached a terminal state")]
    AlreadyTerminal,
}
