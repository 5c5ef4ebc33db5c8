use crate::parameter::ParameterError;
use num_dual::linalg::LinAlgError;
use thiserror::Error;

/// Errors for invalid state definitions and failed solver iterations.
#[derive(Error, Debug)]
pub enum EosError {
    #[error("`{0}` exceeded its iteration limit without converging.")]
    NotConverged(String),
    #[error("`{0}` ran into invalid values during the iteration.")]
    IterationFailed(String),
    #[error("Converged to the trivial solution with identical phases.")]
    TrivialSolution,
    #[error("`{0}` called with invalid {1} = {2}.")]
    InvalidState(String, String, f64),
    #[error("State not fully determined: {0}.")]
    UndeterminedState(String),
    #[error("No saturation state above the critical point.")]
    SuperCritical,
    #[error("Invalid input pair: {0}.")]
    InvalidInputPair(String),
    #[error(transparent)]
    ParameterError(#[from] ParameterError),
    #[error(transparent)]
    LinAlgError(#[from] LinAlgError),
}

/// Shorthand for results carrying an [`EosError`].
pub type EosResult<T> = Result<T, EosError>;
