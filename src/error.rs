//! Error types shared by the dispatch model, the QP solver and the colony.
//!
//! A non-optimal QP status is not an error: the solver absorbs it into a
//! sentinel cost (see [`INFEASIBLE_COST`](crate::system::INFEASIBLE_COST)).
//! Everything here is structural and aborts the current call.

use thiserror::Error;

/// Errors raised by this crate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ColonyError {
    /// An assignment does not carry exactly one zone per unit.
    #[error("assignment has {actual} zones, system has {expected} units")]
    AssignmentLength { expected: usize, actual: usize },

    /// A zone index does not exist for the given unit.
    #[error("unit {unit} has no operative zone {zone}")]
    UnknownZone { unit: usize, zone: usize },

    /// A unit id does not exist in the system.
    #[error("unknown unit {unit}")]
    UnknownUnit { unit: usize },

    /// Every pheromone cell of a unit column is zero.
    #[error("pheromone column of unit {unit} has no mass to sample from")]
    DegeneratePheromone { unit: usize },

    /// Pheromone deposit requested for a cost that is zero, negative or NaN.
    #[error("cannot deposit pheromone for non-positive cost {cost}")]
    NonPositiveCost { cost: f64 },

    /// A path does not fit the pheromone matrix.
    #[error("path of length {path_len} does not fit a pheromone field over {units} units")]
    PheromoneShape { units: usize, path_len: usize },

    /// Pheromone data does not describe a consistent field.
    #[error("invalid pheromone field: {0}")]
    InvalidPheromone(String),

    /// The power system description is inconsistent.
    #[error("invalid dispatch model: {0}")]
    InvalidModel(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A canonical path string could not be parsed.
    #[error("invalid path '{0}'")]
    InvalidPath(String),

    /// The QP backend rejected the problem data.
    #[error("QP solver error: {0}")]
    Solver(String),

    /// An operation was invoked in the wrong search state.
    #[error("search is {found}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        found: &'static str,
    },

    /// An error raised while executing a colony iteration.
    #[error("iteration {iteration}: {source}")]
    Iteration {
        iteration: usize,
        #[source]
        source: Box<ColonyError>,
    },
}

impl ColonyError {
    /// Attaches the iteration number to an error raised inside a step.
    pub fn at_iteration(self, iteration: usize) -> Self {
        match self {
            already @ ColonyError::Iteration { .. } => already,
            other => ColonyError::Iteration {
                iteration,
                source: Box::new(other),
            },
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ColonyError>;
