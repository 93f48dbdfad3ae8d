//! Power system description: units, operative zones and demand.

use super::assignment::Assignment;
use crate::error::{ColonyError, Result};
use rand::Rng;

/// One operative zone of a generating unit.
///
/// The zone's cost curve is `F(P) = c·P² + b·P + a` over
/// `p_min ≤ P ≤ p_max`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Zone {
    /// 1-based zone index within its unit.
    pub index: usize,
    /// Fixed cost term.
    pub a: f64,
    /// Linear cost term.
    pub b: f64,
    /// Quadratic cost term.
    pub c: f64,
    /// Lower power bound.
    pub p_min: f64,
    /// Upper power bound.
    pub p_max: f64,
}

impl Zone {
    pub fn new(index: usize, a: f64, b: f64, c: f64, p_min: f64, p_max: f64) -> Self {
        Self {
            index,
            a,
            b,
            c,
            p_min,
            p_max,
        }
    }

    /// Generation cost at output `p`.
    pub fn cost_at(&self, p: f64) -> f64 {
        self.c * p * p + self.b * p + self.a
    }
}

/// A thermal generating unit and its operative zones.
///
/// Units with a single zone hold a one-element list like any other unit.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Unit {
    /// 1-based unit id.
    pub id: usize,
    zones: Vec<Zone>,
}

impl Unit {
    pub fn new(id: usize, zones: Vec<Zone>) -> Self {
        Self { id, zones }
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    /// Zone with 1-based index `zone`.
    pub fn zone(&self, zone: usize) -> Option<&Zone> {
        zone.checked_sub(1).and_then(|i| self.zones.get(i))
    }
}

/// One row of the tabular system data handed over by a loader.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ZoneRow {
    pub unit: usize,
    pub zone: usize,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub p_min: f64,
    pub p_max: f64,
}

/// An immutable power system instance.
///
/// Built once and shared by reference with the solver and the colony.
///
/// # Examples
///
/// ```
/// use u_powercolony::system::{DispatchModel, Unit, Zone};
///
/// let model = DispatchModel::new(
///     "two-units",
///     100.0,
///     vec![
///         Unit::new(1, vec![Zone::new(1, 0.0, 2.0, 0.01, 0.0, 100.0)]),
///         Unit::new(2, vec![
///             Zone::new(1, 0.0, 3.0, 0.02, 0.0, 50.0),
///             Zone::new(2, 5.0, 2.5, 0.02, 50.0, 100.0),
///         ]),
///     ],
/// )
/// .unwrap();
///
/// assert_eq!(model.unit_count(), 2);
/// assert_eq!(model.max_zone_count(), 2);
/// assert_eq!(model.zone_count(1).unwrap(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawDispatchModel"))]
pub struct DispatchModel {
    name: String,
    demand: f64,
    units: Vec<Unit>,
}

/// Unchecked wire form; deserialized models pass through [`DispatchModel::new`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawDispatchModel {
    name: String,
    demand: f64,
    units: Vec<Unit>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawDispatchModel> for DispatchModel {
    type Error = ColonyError;

    fn try_from(raw: RawDispatchModel) -> Result<Self> {
        Self::new(raw.name, raw.demand, raw.units)
    }
}

impl DispatchModel {
    /// Builds and validates a model.
    ///
    /// Unit ids must run `1..=N` in order, zone indices `1..=k` in order,
    /// all coefficients and bounds must be finite and non-negative with
    /// `p_min ≤ p_max`, and demand must be finite and non-negative.
    pub fn new(name: impl Into<String>, demand: f64, units: Vec<Unit>) -> Result<Self> {
        let model = Self {
            name: name.into(),
            demand,
            units,
        };
        model.validate()?;
        Ok(model)
    }

    /// Builds a model from loader rows, grouping by unit id.
    ///
    /// Rows may come in any order; they are sorted by `(unit, zone)`.
    pub fn from_rows(name: impl Into<String>, demand: f64, rows: &[ZoneRow]) -> Result<Self> {
        let mut sorted: Vec<&ZoneRow> = rows.iter().collect();
        sorted.sort_by_key(|r| (r.unit, r.zone));

        let mut units: Vec<Unit> = Vec::new();
        for row in sorted {
            let zone = Zone::new(row.zone, row.a, row.b, row.c, row.p_min, row.p_max);
            match units.last_mut() {
                Some(unit) if unit.id == row.unit => unit.zones.push(zone),
                _ => units.push(Unit::new(row.unit, vec![zone])),
            }
        }

        Self::new(name, demand, units)
    }

    fn validate(&self) -> Result<()> {
        if !self.demand.is_finite() || self.demand < 0.0 {
            return Err(ColonyError::InvalidModel(format!(
                "demand must be finite and non-negative, got {}",
                self.demand
            )));
        }
        if self.units.is_empty() {
            return Err(ColonyError::InvalidModel("system has no units".into()));
        }

        for (pos, unit) in self.units.iter().enumerate() {
            if unit.id != pos + 1 {
                return Err(ColonyError::InvalidModel(format!(
                    "unit ids must run 1..=N in order, found {} at position {}",
                    unit.id,
                    pos + 1
                )));
            }
            if unit.zones.is_empty() {
                return Err(ColonyError::InvalidModel(format!(
                    "unit {} has no operative zones",
                    unit.id
                )));
            }
            for (zpos, zone) in unit.zones.iter().enumerate() {
                if zone.index != zpos + 1 {
                    return Err(ColonyError::InvalidModel(format!(
                        "unit {}: zone indices must run 1..=k in order, found {} at position {}",
                        unit.id,
                        zone.index,
                        zpos + 1
                    )));
                }
                let values = [zone.a, zone.b, zone.c, zone.p_min, zone.p_max];
                if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
                    return Err(ColonyError::InvalidModel(format!(
                        "unit {} zone {}: coefficients and bounds must be finite and non-negative",
                        unit.id, zone.index
                    )));
                }
                if zone.p_min > zone.p_max {
                    return Err(ColonyError::InvalidModel(format!(
                        "unit {} zone {}: p_min {} exceeds p_max {}",
                        unit.id, zone.index, zone.p_min, zone.p_max
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total power the units must supply.
    pub fn demand(&self) -> f64 {
        self.demand
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Unit with 1-based id `unit`.
    pub fn unit(&self, unit: usize) -> Result<&Unit> {
        unit.checked_sub(1)
            .and_then(|i| self.units.get(i))
            .ok_or(ColonyError::UnknownUnit { unit })
    }

    /// Number of operative zones of unit `unit`.
    pub fn zone_count(&self, unit: usize) -> Result<usize> {
        self.unit(unit).map(Unit::zone_count)
    }

    /// Zone counts of every unit, in unit order.
    pub fn zone_counts(&self) -> Vec<usize> {
        self.units.iter().map(Unit::zone_count).collect()
    }

    /// Largest zone count across units.
    pub fn max_zone_count(&self) -> usize {
        self.units.iter().map(Unit::zone_count).max().unwrap_or(0)
    }

    /// Number of distinct assignments, saturating at `u128::MAX`.
    pub fn assignment_count(&self) -> u128 {
        self.units
            .iter()
            .fold(1u128, |acc, u| acc.saturating_mul(u.zone_count() as u128))
    }

    /// Draws one zone per unit uniformly at random.
    ///
    /// Feasibility against demand is not checked here; infeasible draws
    /// surface as a non-optimal solve.
    pub fn sample_random_assignment<R: Rng>(&self, rng: &mut R) -> Assignment {
        let zones = self
            .units
            .iter()
            .map(|u| rng.random_range(1..=u.zone_count()))
            .collect();
        Assignment::new_unchecked(zones)
    }

    /// Builds a checked assignment from 1-based zone indices.
    ///
    /// # Errors
    /// - [`ColonyError::AssignmentLength`] if `zones.len()` differs from the unit count
    /// - [`ColonyError::UnknownZone`] if a unit has no zone with the given index
    pub fn assignment_from_zone_indices(&self, zones: &[usize]) -> Result<Assignment> {
        if zones.len() != self.units.len() {
            return Err(ColonyError::AssignmentLength {
                expected: self.units.len(),
                actual: zones.len(),
            });
        }
        for (unit, &zone) in self.units.iter().zip(zones) {
            if unit.zone(zone).is_none() {
                return Err(ColonyError::UnknownZone {
                    unit: unit.id,
                    zone,
                });
            }
        }
        Ok(Assignment::new_unchecked(zones.to_vec()))
    }

    /// Resolves an assignment to the zone each unit occupies.
    pub fn resolve(&self, assignment: &Assignment) -> Result<Vec<&Zone>> {
        if assignment.len() != self.units.len() {
            return Err(ColonyError::AssignmentLength {
                expected: self.units.len(),
                actual: assignment.len(),
            });
        }
        self.units
            .iter()
            .zip(assignment.zones())
            .map(|(unit, &zone)| {
                unit.zone(zone).ok_or(ColonyError::UnknownZone {
                    unit: unit.id,
                    zone,
                })
            })
            .collect()
    }

    /// `(Σ p_min, Σ p_max)` of an assignment.
    ///
    /// Demand outside this range makes the dispatch infeasible.
    pub fn capacity_range(&self, assignment: &Assignment) -> Result<(f64, f64)> {
        let zones = self.resolve(assignment)?;
        Ok(zones
            .iter()
            .fold((0.0, 0.0), |(lo, hi), z| (lo + z.p_min, hi + z.p_max)))
    }
}
