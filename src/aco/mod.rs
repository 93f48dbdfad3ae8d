//! Ant Colony Optimization over operative-zone assignments.
//!
//! Each ant picks one zone per unit, either by following the pheromone
//! field or by a fresh uniform draw, and the path is scored by the
//! economic dispatch cost `Ft` from [`crate::system::DispatchSolver`].
//! Cheap paths deposit more pheromone (`scale / Ft`); visited cells
//! evaporate at a rate that depends on whether they lie on the global best
//! or worst path, so poor choices are forgotten faster than good ones.
//!
//! # Key Types
//!
//! - [`ColonyConfig`]: Ants, rates, exploit probability, solver settings
//! - [`ColonySearch`]: Step-by-step state machine over the iterations
//! - [`ColonyRunner`]: One-call execution with optional cancellation
//! - [`PheromoneField`]: (zone, unit) intensity matrix
//! - [`Trial`] / [`BestWorst`] / [`TrialHistory`]: Recorded outcomes
//!
//! # References
//!
//! - Dorigo, Maniezzo & Colorni (1996), "Ant System: Optimization by a Colony
//!   of Cooperating Agents"
//! - Dorigo & Stützle (2004), *Ant Colony Optimization*

mod config;
mod pheromone;
mod runner;
pub mod sampling;
mod types;

pub use config::{ColonyConfig, EvaporationRates};
pub use pheromone::PheromoneField;
pub use runner::{ColonyResult, ColonyRunner, ColonySearch, SearchState};
pub use types::{BestWorst, IterationStats, Trial, TrialHistory};
