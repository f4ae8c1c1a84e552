use crate::identity::Role;
use crate::state::Status;
use thiserror::Error;

/// Reasons the approval state machine refuses a transition.
///
/// Both variants surface to clients as "you may not do this", but they are kept
/// apart from jurisdiction failures so a client can tell "not your turn yet"
/// from "not your application".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Application is already {0}; no further decisions are accepted")]
    TerminalState(Status),

    #[error("Role {role} cannot act while the application is {status}")]
    InvalidStage { status: Status, role: Role },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Application {0} not found")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid principal claims: {0}")]
    InvalidClaims(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("User {0} already has an application in progress")]
    AlreadySubmitted(String),

    #[error("Payment cannot be recorded while the application is {0}")]
    PaymentNotAllowed(Status),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Server error: {0}")]
    Server(String),
}

pub type Result<T> = std::result::Result<T, Error>;
