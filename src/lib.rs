//! Ant colony search for thermal unit dispatch with operative zones.
//!
//! Each generating unit offers a few discrete operative zones, each with its
//! own quadratic cost curve and power band. Picking a zone per unit is a
//! combinatorial choice; dispatching power within the chosen zones is a
//! convex QP. This crate couples the two:
//!
//! - **System** ([`system`]): the power system model, zone assignments and
//!   the economic dispatch solver that turns an assignment into a cost.
//! - **Colony** ([`aco`]): an Ant Colony Optimization loop that samples
//!   assignments from a pheromone field, scores them with the dispatch
//!   solver, and reinforces the cheap ones.
//!
//! # Example
//!
//! ```
//! use u_powercolony::aco::{ColonyConfig, ColonyRunner};
//! use u_powercolony::system::{DispatchModel, ZoneRow};
//!
//! let rows = [
//!     ZoneRow { unit: 1, zone: 1, a: 0.0, b: 2.0, c: 0.01, p_min: 0.0, p_max: 60.0 },
//!     ZoneRow { unit: 1, zone: 2, a: 8.0, b: 1.8, c: 0.01, p_min: 60.0, p_max: 120.0 },
//!     ZoneRow { unit: 2, zone: 1, a: 0.0, b: 3.0, c: 0.02, p_min: 0.0, p_max: 100.0 },
//! ];
//! let model = DispatchModel::from_rows("demo", 150.0, &rows).unwrap();
//!
//! let config = ColonyConfig::default()
//!     .with_ants(10)
//!     .with_max_iterations(5)
//!     .with_seed(7);
//! let result = ColonyRunner::run(&model, &config).unwrap();
//! assert!(result.best.status.is_optimal());
//! ```
//!
//! # Features
//!
//! - `parallel`: solve the ants of an iteration on the rayon pool
//! - `serde`: `Serialize`/`Deserialize` for models, configs and results

pub mod aco;
pub mod error;
pub mod system;

pub use error::{ColonyError, Result};
