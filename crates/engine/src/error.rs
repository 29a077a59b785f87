//! Error taxonomy for the distributed engine.
//!
//! Configuration and transport failures travel as `Result`s and abort the
//! run at the top level; invariant violations (ownership not conserving
//! the population, malformed wire buffers) are programming errors and
//! fail as assertions inside the offending worker.

use thiserror::Error;

use crate::comm::CommError;

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that abort a simulation run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The spatial grid is dim x dim, so the worker count must be square.
    #[error("worker count {0} is not a positive perfect square")]
    WorkerCount(usize),

    /// Redistribution must run at least every iteration.
    #[error("rebuild granularity must be at least 1")]
    RebuildGranularity,

    /// Step parameters failed validation.
    #[error("invalid step parameters: {0}")]
    InvalidParameters(String),

    /// Two input particles share an id.
    #[error("particle id {0} appears more than once in the input")]
    DuplicateParticle(i32),

    /// The final gather produced an id the input never had.
    #[error("gathered particle id {0} was not present in the input")]
    UnknownParticle(i32),

    /// The final gather lost or invented particles.
    #[error("gathered {got} particles, expected {expected}")]
    PopulationMismatch {
        /// Input population size.
        expected: usize,
        /// Gathered population size.
        got: usize,
    },

    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(std::io::Error),

    /// A worker thread died without reporting an error of its own.
    #[error("worker {rank} panicked")]
    WorkerPanic {
        /// Rank of the dead worker.
        rank: usize,
    },

    /// A collective or point-to-point operation failed.
    #[error("transport failure: {0}")]
    Transport(#[from] CommError),

    /// A parameter file could not be read.
    #[error("could not read step parameter file: {0}")]
    Io(#[from] std::io::Error),

    /// A parameter file did not parse.
    #[error("step parameter file is not valid JSON: {0}")]
    ParameterSyntax(#[from] serde_json::Error),
}
