//! Colony configuration.

use crate::error::{ColonyError, Result};
use crate::system::SolverSettings;

/// Evaporation rates applied to visited pheromone cells.
///
/// Each visited cell keeps `1 - rate` of its mass. Cells on the global best
/// path (and cells of units with a single zone) use `best`, cells on the
/// global worst path use `worst`, everything else uses `mean`.
///
/// `best ≤ mean ≤ worst` is the usual choice but is not required.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvaporationRates {
    pub best: f64,
    pub mean: f64,
    pub worst: f64,
}

impl Default for EvaporationRates {
    fn default() -> Self {
        Self {
            best: 0.05,
            mean: 0.25,
            worst: 0.75,
        }
    }
}

impl EvaporationRates {
    pub fn new(best: f64, mean: f64, worst: f64) -> Self {
        Self { best, mean, worst }
    }

    /// Same rate for every cell.
    pub fn uniform(rate: f64) -> Self {
        Self::new(rate, rate, rate)
    }

    /// Checks that every rate lies in `[0, 1)`.
    ///
    /// A rate of 1 would wipe a visited column, leaving nothing to sample.
    pub fn validate(&self) -> Result<()> {
        for (name, rate) in [("best", self.best), ("mean", self.mean), ("worst", self.worst)] {
            if !(0.0..1.0).contains(&rate) {
                return Err(ColonyError::InvalidConfig(format!(
                    "{name} evaporation rate must be in [0, 1), got {rate}"
                )));
            }
        }
        Ok(())
    }
}

/// Configuration for the ant colony search.
///
/// # Examples
///
/// ```
/// use u_powercolony::aco::{ColonyConfig, EvaporationRates};
///
/// let config = ColonyConfig::default()
///     .with_ants(50)
///     .with_max_iterations(30)
///     .with_evaporation(EvaporationRates::new(0.05, 0.25, 0.75))
///     .with_seed(42);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColonyConfig {
    /// Number of ants per iteration.
    pub n_ants: usize,

    /// Iterations run by [`ColonyRunner`](super::ColonyRunner), not counting
    /// the initial random iteration.
    pub max_iterations: usize,

    pub evaporation: EvaporationRates,

    /// Probability that an ant follows the pheromone field instead of
    /// drawing a fresh random assignment.
    pub exploit_probability: f64,

    /// Pheromone deposited per trial is `deposit_scale / Ft`.
    pub deposit_scale: f64,

    /// Settings for every dispatch solve.
    pub solver: SolverSettings,

    /// Solve the ants of an iteration on the rayon pool.
    ///
    /// Only effective with the `parallel` feature. Results are identical
    /// to a sequential run with the same seed.
    pub parallel: bool,

    /// Random seed for reproducibility.
    pub seed: Option<u64>,

    /// Keep only this many most recent iterations of trials. `None` keeps all.
    pub history_limit: Option<usize>,

    /// Store a snapshot of the pheromone field after every iteration.
    pub keep_pheromone_history: bool,
}

impl Default for ColonyConfig {
    fn default() -> Self {
        Self {
            n_ants: 100,
            max_iterations: 20,
            evaporation: EvaporationRates::default(),
            exploit_probability: 0.8,
            deposit_scale: 1000.0,
            solver: SolverSettings::default(),
            parallel: false,
            seed: None,
            history_limit: None,
            keep_pheromone_history: false,
        }
    }
}

impl ColonyConfig {
    pub fn with_ants(mut self, n: usize) -> Self {
        self.n_ants = n;
        self
    }

    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn with_evaporation(mut self, rates: EvaporationRates) -> Self {
        self.evaporation = rates;
        self
    }

    pub fn with_exploit_probability(mut self, p: f64) -> Self {
        self.exploit_probability = p;
        self
    }

    pub fn with_deposit_scale(mut self, scale: f64) -> Self {
        self.deposit_scale = scale;
        self
    }

    pub fn with_solver(mut self, solver: SolverSettings) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    pub fn with_pheromone_history(mut self, keep: bool) -> Self {
        self.keep_pheromone_history = keep;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.n_ants == 0 {
            return Err(ColonyError::InvalidConfig("n_ants must be at least 1".into()));
        }
        self.evaporation.validate()?;
        if !(0.0..=1.0).contains(&self.exploit_probability) {
            return Err(ColonyError::InvalidConfig(format!(
                "exploit_probability must be in [0, 1], got {}",
                self.exploit_probability
            )));
        }
        if !(self.deposit_scale > 0.0 && self.deposit_scale.is_finite()) {
            return Err(ColonyError::InvalidConfig(format!(
                "deposit_scale must be positive and finite, got {}",
                self.deposit_scale
            )));
        }
        if self.history_limit == Some(0) {
            return Err(ColonyError::InvalidConfig(
                "history_limit must keep at least one iteration".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ColonyConfig::default();
        assert_eq!(config.n_ants, 100);
        assert!((config.exploit_probability - 0.8).abs() < 1e-12);
        assert!((config.deposit_scale - 1000.0).abs() < 1e-12);
        assert_eq!(config.evaporation, EvaporationRates::new(0.05, 0.25, 0.75));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_ants() {
        assert!(ColonyConfig::default().with_ants(0).validate().is_err());
    }

    #[test]
    fn test_validate_rates() {
        let config =
            ColonyConfig::default().with_evaporation(EvaporationRates::new(0.1, 1.5, 0.9));
        assert!(matches!(config.validate(), Err(ColonyError::InvalidConfig(_))));

        // Full evaporation would empty visited columns.
        for rates in [
            EvaporationRates::uniform(1.0),
            EvaporationRates::new(1.0, 0.25, 0.75),
            EvaporationRates::new(0.05, 0.25, 1.0),
        ] {
            let config = ColonyConfig::default().with_evaporation(rates);
            assert!(matches!(config.validate(), Err(ColonyError::InvalidConfig(_))));
        }
        let config = ColonyConfig::default().with_evaporation(EvaporationRates::uniform(0.0));
        assert!(config.validate().is_ok());

        // Unordered rates are the caller's business.
        let config =
            ColonyConfig::default().with_evaporation(EvaporationRates::new(0.9, 0.5, 0.1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_probability_and_scale() {
        assert!(ColonyConfig::default()
            .with_exploit_probability(1.2)
            .validate()
            .is_err());
        assert!(ColonyConfig::default()
            .with_deposit_scale(0.0)
            .validate()
            .is_err());
        assert!(ColonyConfig::default()
            .with_deposit_scale(f64::INFINITY)
            .validate()
            .is_err());
        assert!(ColonyConfig::default()
            .with_history_limit(0)
            .validate()
            .is_err());
    }
}
