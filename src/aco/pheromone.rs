//! Pheromone matrix over (zone, unit) pairs.

use super::config::EvaporationRates;
use super::sampling::roulette_select;
use super::types::{BestWorst, Trial};
use crate::error::{ColonyError, Result};
use crate::system::{Assignment, DispatchModel};
use rand::Rng;

/// Pheromone intensity per (zone, unit).
///
/// Rows are zones `1..=max_zone_count`, columns are units `1..=unit_count`.
/// A cell whose zone index exceeds its unit's zone count does not exist in
/// the system; it stays at exactly `0.0` and is never sampled.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawPheromoneField"))]
pub struct PheromoneField {
    /// Row-major `zones × units`.
    cells: Vec<f64>,
    zone_counts: Vec<usize>,
    zones: usize,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawPheromoneField {
    cells: Vec<f64>,
    zone_counts: Vec<usize>,
    zones: usize,
}

#[cfg(feature = "serde")]
impl TryFrom<RawPheromoneField> for PheromoneField {
    type Error = ColonyError;

    fn try_from(raw: RawPheromoneField) -> Result<Self> {
        let mut field = Self::new(raw.zone_counts);
        if raw.zones != field.zones {
            return Err(ColonyError::InvalidPheromone(format!(
                "{} zone rows declared, zone counts need {}",
                raw.zones, field.zones
            )));
        }
        if raw.cells.len() != field.cells.len() {
            return Err(ColonyError::InvalidPheromone(format!(
                "{} cells for a {}x{} field",
                raw.cells.len(),
                field.zones,
                field.zone_counts.len()
            )));
        }
        let units = field.zone_counts.len();
        for (i, &value) in raw.cells.iter().enumerate() {
            let (zone, unit) = (i / units + 1, i % units + 1);
            let exists = zone <= field.zone_counts[unit - 1];
            if !value.is_finite() || value < 0.0 || (!exists && value != 0.0) {
                return Err(ColonyError::InvalidPheromone(format!(
                    "cell (zone {zone}, unit {unit}) holds {value}"
                )));
            }
        }
        field.cells = raw.cells;
        Ok(field)
    }
}

impl PheromoneField {
    /// All-zero field for units with the given zone counts.
    pub fn new(zone_counts: Vec<usize>) -> Self {
        let zones = zone_counts.iter().copied().max().unwrap_or(0);
        Self {
            cells: vec![0.0; zones * zone_counts.len()],
            zone_counts,
            zones,
        }
    }

    /// All-zero field shaped after `model`.
    pub fn for_model(model: &DispatchModel) -> Self {
        Self::new(model.zone_counts())
    }

    /// `(zones, units)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.zones, self.zone_counts.len())
    }

    pub fn unit_count(&self) -> usize {
        self.zone_counts.len()
    }

    pub fn zone_counts(&self) -> &[usize] {
        &self.zone_counts
    }

    #[inline]
    fn idx(&self, zone: usize, unit: usize) -> usize {
        (zone - 1) * self.zone_counts.len() + (unit - 1)
    }

    /// Intensity at 1-based `(zone, unit)`; `None` outside the matrix.
    pub fn get(&self, zone: usize, unit: usize) -> Option<f64> {
        if zone == 0 || unit == 0 || zone > self.zones || unit > self.zone_counts.len() {
            return None;
        }
        Some(self.cells[self.idx(zone, unit)])
    }

    /// Full column of unit `unit`, zone 1 first.
    pub fn column(&self, unit: usize) -> Option<Vec<f64>> {
        (unit >= 1 && unit <= self.zone_counts.len())
            .then(|| (1..=self.zones).map(|z| self.cells[self.idx(z, unit)]).collect())
    }

    /// Snapshot as nested rows, zone 1 first.
    pub fn rows(&self) -> Vec<Vec<f64>> {
        let units = self.zone_counts.len().max(1);
        self.cells.chunks(units).map(<[f64]>::to_vec).collect()
    }

    /// Sum of all cells.
    pub fn total(&self) -> f64 {
        self.cells.iter().sum()
    }

    fn check_path(&self, path: &Assignment) -> Result<()> {
        if path.len() != self.zone_counts.len() {
            return Err(ColonyError::PheromoneShape {
                units: self.zone_counts.len(),
                path_len: path.len(),
            });
        }
        for (u, (&zone, &count)) in path.zones().iter().zip(&self.zone_counts).enumerate() {
            if zone == 0 || zone > count {
                return Err(ColonyError::UnknownZone { unit: u + 1, zone });
            }
        }
        Ok(())
    }

    /// Adds `scale / trial.cost` to every cell on the trial's path.
    ///
    /// # Errors
    /// [`ColonyError::NonPositiveCost`] if the cost is zero, negative or NaN;
    /// shape errors if the path does not fit the field. Nothing is modified
    /// on error.
    pub fn deposit(&mut self, trial: &Trial, scale: f64) -> Result<()> {
        if !(trial.cost > 0.0) {
            return Err(ColonyError::NonPositiveCost { cost: trial.cost });
        }
        self.check_path(&trial.path)?;

        let amount = scale / trial.cost;
        for (u, &zone) in trial.path.zones().iter().enumerate() {
            let i = self.idx(zone, u + 1);
            self.cells[i] += amount;
        }
        Ok(())
    }

    /// Decays every cell visited by at least one of `trials`.
    ///
    /// Each visited cell is scaled once by `1 - rate`, where the rate is
    /// `rates.best` for single-zone units and for cells on the global best
    /// path, `rates.worst` for cells on the global worst path, and
    /// `rates.mean` otherwise.
    pub fn evaporate(
        &mut self,
        trials: &[Trial],
        best_worst: &BestWorst,
        rates: &EvaporationRates,
    ) -> Result<()> {
        for trial in trials {
            self.check_path(&trial.path)?;
        }

        let mut visited = vec![false; self.cells.len()];
        for trial in trials {
            for (u, &zone) in trial.path.zones().iter().enumerate() {
                visited[self.idx(zone, u + 1)] = true;
            }
        }

        let best = best_worst.best().map(|t| &t.path);
        let worst = best_worst.worst().map(|t| &t.path);
        let units = self.zone_counts.len();

        for (i, cell) in self.cells.iter_mut().enumerate() {
            if !visited[i] {
                continue;
            }
            let zone = i / units + 1;
            let unit = i % units + 1;
            let rate = if self.zone_counts[unit - 1] == 1
                || best.and_then(|p| p.zone_of(unit)) == Some(zone)
            {
                rates.best
            } else if worst.and_then(|p| p.zone_of(unit)) == Some(zone) {
                rates.worst
            } else {
                rates.mean
            };
            *cell *= 1.0 - rate;
        }
        Ok(())
    }

    /// Draws one zone per unit with probability proportional to pheromone.
    ///
    /// Returns 1-based zone indices in unit order.
    ///
    /// # Errors
    /// [`ColonyError::DegeneratePheromone`] if a unit's column has no mass.
    pub fn sample_path<R: Rng>(&self, rng: &mut R) -> Result<Vec<usize>> {
        let mut weights = Vec::with_capacity(self.zones);
        (1..=self.zone_counts.len())
            .map(|unit| {
                weights.clear();
                weights.extend(
                    (1..=self.zone_counts[unit - 1]).map(|z| self.cells[self.idx(z, unit)]),
                );
                roulette_select(&weights, &mut *rng)
                    .map(|i| i + 1)
                    .ok_or(ColonyError::DegeneratePheromone { unit })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::SolverStatus;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn trial(ant: usize, zones: &[usize], cost: f64) -> Trial {
        Trial {
            ant,
            iteration: 0,
            path: Assignment::new_unchecked(zones.to_vec()),
            status: SolverStatus::Optimal,
            cost,
            reused: false,
        }
    }

    #[test]
    fn test_new_is_zero_and_shaped() {
        let field = PheromoneField::new(vec![1, 3, 2]);
        assert_eq!(field.shape(), (3, 3));
        assert_eq!(field.total(), 0.0);
        assert_eq!(field.get(3, 2), Some(0.0));
        assert_eq!(field.get(4, 1), None);
        assert_eq!(field.get(1, 0), None);
        assert_eq!(field.rows().len(), 3);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialization_checks_shape() {
        let mut field = PheromoneField::new(vec![1, 2]);
        field.deposit(&trial(1, &[1, 2], 100.0), 1000.0).unwrap();
        let json = serde_json::to_string(&field).unwrap();
        let back: PheromoneField = serde_json::from_str(&json).unwrap();
        assert_eq!(back, field);

        for bad in [
            r#"{"cells": [1.0, 1.0], "zone_counts": [1, 2], "zones": 2}"#,
            r#"{"cells": [1.0, 1.0, 0.0, 1.0], "zone_counts": [1, 2], "zones": 3}"#,
            r#"{"cells": [1.0, 1.0, 0.5, 1.0], "zone_counts": [1, 2], "zones": 2}"#,
            r#"{"cells": [1.0, -1.0, 0.0, 1.0], "zone_counts": [1, 2], "zones": 2}"#,
        ] {
            let err = serde_json::from_str::<PheromoneField>(bad).unwrap_err();
            assert!(err.to_string().contains("invalid pheromone field"), "{err}");
        }
    }

    #[test]
    fn test_deposit_adds_inverse_cost() {
        let mut field = PheromoneField::new(vec![2, 2]);
        field.deposit(&trial(1, &[2, 1], 500.0), 1000.0).unwrap();
        field.deposit(&trial(2, &[2, 2], 250.0), 1000.0).unwrap();
        assert!((field.get(2, 1).unwrap() - 6.0).abs() < 1e-12);
        assert!((field.get(1, 2).unwrap() - 2.0).abs() < 1e-12);
        assert!((field.get(2, 2).unwrap() - 4.0).abs() < 1e-12);
        assert_eq!(field.get(1, 1), Some(0.0));
    }

    #[test]
    fn test_deposit_rejects_zero_cost() {
        let mut field = PheromoneField::new(vec![2]);
        assert_eq!(
            field.deposit(&trial(1, &[1], 0.0), 1000.0),
            Err(ColonyError::NonPositiveCost { cost: 0.0 })
        );
        assert!(field.deposit(&trial(1, &[1], f64::NAN), 1000.0).is_err());
        assert_eq!(field.total(), 0.0);
    }

    #[test]
    fn test_deposit_rejects_bad_shape() {
        let mut field = PheromoneField::new(vec![2, 1]);
        assert!(matches!(
            field.deposit(&trial(1, &[1], 10.0), 1.0),
            Err(ColonyError::PheromoneShape { units: 2, path_len: 1 })
        ));
        assert_eq!(
            field.deposit(&trial(1, &[1, 2], 10.0), 1.0),
            Err(ColonyError::UnknownZone { unit: 2, zone: 2 })
        );
        assert_eq!(field.total(), 0.0);
    }

    // Units: 1 has one zone, 2 and 3 have three zones.
    // Best path 1,1,1; worst path 1,3,3.
    fn evaporation_fixture() -> (PheromoneField, BestWorst) {
        let mut field = PheromoneField::new(vec![1, 3, 3]);
        for z in 1..=3 {
            for u in 1..=3 {
                if z == 1 || u > 1 {
                    let i = field.idx(z, u);
                    field.cells[i] = 10.0;
                }
            }
        }
        let mut bw = BestWorst::new();
        bw.observe(&trial(1, &[1, 1, 1], 100.0));
        bw.observe(&trial(2, &[1, 3, 3], 900.0));
        (field, bw)
    }

    #[test]
    fn test_evaporation_rules() {
        let rates = EvaporationRates::new(0.1, 0.5, 0.8);
        // (trial path, cell (zone, unit), expected retention)
        let cases: &[(&[usize], (usize, usize), f64)] = &[
            // single-zone unit always keeps the best rate
            (&[1, 2, 2], (1, 1), 0.9),
            // matches global best at unit 2
            (&[1, 1, 2], (1, 2), 0.9),
            // matches global worst at unit 3
            (&[1, 2, 3], (3, 3), 0.2),
            // neither best nor worst
            (&[1, 2, 2], (2, 2), 0.5),
            (&[1, 2, 2], (2, 3), 0.5),
        ];

        for (path, (zone, unit), retention) in cases {
            let (mut field, bw) = evaporation_fixture();
            field
                .evaporate(&[trial(9, path, 300.0)], &bw, &rates)
                .unwrap();
            let got = field.get(*zone, *unit).unwrap();
            assert!(
                (got - 10.0 * retention).abs() < 1e-12,
                "path {path:?} cell ({zone},{unit}): got {got}"
            );
        }
    }

    #[test]
    fn test_evaporation_skips_unvisited_and_applies_once() {
        let (mut field, bw) = evaporation_fixture();
        let rates = EvaporationRates::new(0.1, 0.5, 0.8);
        let trials = vec![trial(1, &[1, 2, 2], 300.0), trial(2, &[1, 2, 2], 300.0)];
        field.evaporate(&trials, &bw, &rates).unwrap();

        assert!((field.get(2, 2).unwrap() - 5.0).abs() < 1e-12);
        assert!((field.get(1, 1).unwrap() - 9.0).abs() < 1e-12);
        // not visited
        assert_eq!(field.get(3, 2), Some(10.0));
        assert_eq!(field.get(1, 3), Some(10.0));
        // structurally unused
        assert_eq!(field.get(2, 1), Some(0.0));
    }

    #[test]
    fn test_best_wins_when_best_and_worst_share_a_zone() {
        let (mut field, _) = evaporation_fixture();
        let mut bw = BestWorst::new();
        bw.observe(&trial(1, &[1, 2, 1], 100.0));
        bw.observe(&trial(2, &[1, 2, 3], 900.0));
        let rates = EvaporationRates::new(0.1, 0.5, 0.8);
        field
            .evaporate(&[trial(3, &[1, 2, 3], 400.0)], &bw, &rates)
            .unwrap();
        assert!((field.get(2, 2).unwrap() - 9.0).abs() < 1e-12);
        assert!((field.get(3, 3).unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_sample_follows_mass() {
        let mut field = PheromoneField::new(vec![1, 3]);
        field.deposit(&trial(1, &[1, 3], 10.0), 1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            assert_eq!(field.sample_path(&mut rng).unwrap(), vec![1, 3]);
        }
    }

    #[test]
    fn test_sample_degenerate_column() {
        let mut field = PheromoneField::new(vec![2, 2]);
        let i = field.idx(1, 1);
        field.cells[i] = 1.0;
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            field.sample_path(&mut rng),
            Err(ColonyError::DegeneratePheromone { unit: 2 })
        );
    }

    proptest! {
        #[test]
        fn prop_unused_cells_stay_zero(
            ops in prop::collection::vec((0usize..2, 0usize..3, 1.0f64..1e4, any::<bool>()), 1..40),
            seed in any::<u64>(),
        ) {
            let counts = vec![1usize, 2, 3];
            let mut field = PheromoneField::new(counts.clone());
            let mut bw = BestWorst::new();
            let mut rng = StdRng::seed_from_u64(seed);
            let rates = EvaporationRates::default();

            for (z2, z3, cost, evaporate) in ops {
                let t = trial(1, &[1, z2 + 1, (z2 + z3) % 3 + 1], cost);
                bw.observe(&t);
                if evaporate {
                    field.evaporate(std::slice::from_ref(&t), &bw, &rates).unwrap();
                } else {
                    field.deposit(&t, 1000.0).unwrap();
                }
                for (u, &count) in counts.iter().enumerate() {
                    for z in (count + 1)..=3 {
                        prop_assert_eq!(field.get(z, u + 1), Some(0.0));
                    }
                }
            }

            if field.column(1).unwrap()[0] > 0.0 {
                if let Ok(path) = field.sample_path(&mut rng) {
                    for (u, &z) in path.iter().enumerate() {
                        prop_assert!(z >= 1 && z <= counts[u]);
                    }
                }
            }
        }
    }
}
