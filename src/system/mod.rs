//! Power system model and economic dispatch.
//!
//! A [`DispatchModel`] holds the generating units of one system, each with
//! an ordered list of operative [`Zone`]s, and the total demand. Choosing
//! one zone per unit gives an [`Assignment`]; the [`DispatchSolver`] turns
//! an assignment into a least-cost dispatch by solving a convex QP.
//!
//! # Key Types
//!
//! - [`DispatchModel`]: Immutable system description with zone sampling helpers
//! - [`Assignment`]: One zone per unit, keyed by its canonical string
//! - [`DispatchSolver`]: QP solve of an assignment ([`DispatchResult`])
//!
//! # References
//!
//! - Wood, Wollenberg & Sheblé (2013), *Power Generation, Operation, and Control*, ch. 3
//! - Goerigk et al. (2023), "Clarabel: An interior-point solver for conic programs
//!   with quadratic objectives"

mod assignment;
mod model;
mod solver;

pub use assignment::Assignment;
pub use model::{DispatchModel, Unit, Zone, ZoneRow};
pub use solver::{DispatchResult, DispatchSolver, SolverSettings, SolverStatus, INFEASIBLE_COST};
