//! Zone assignments (ant paths).

use crate::error::ColonyError;
use std::fmt;
use std::str::FromStr;

/// One operative zone per unit, in unit order.
///
/// Zone indices are 1-based, matching the zone numbering of the input
/// tables. The canonical text form is the comma-joined index list
/// (`"1,3,2"`), which is also the memoization key used by the colony.
///
/// An `Assignment` is not tied to a particular [`DispatchModel`]; use
/// [`DispatchModel::assignment_from_zone_indices`] to get a checked one.
///
/// [`DispatchModel`]: super::DispatchModel
/// [`DispatchModel::assignment_from_zone_indices`]: super::DispatchModel::assignment_from_zone_indices
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Assignment(Vec<usize>);

impl Assignment {
    pub(crate) fn new_unchecked(zones: Vec<usize>) -> Self {
        Self(zones)
    }

    /// Zone indices in unit order.
    pub fn zones(&self) -> &[usize] {
        &self.0
    }

    /// Number of units covered.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Zone chosen for the unit with 1-based id `unit`.
    pub fn zone_of(&self, unit: usize) -> Option<usize> {
        unit.checked_sub(1).and_then(|i| self.0.get(i).copied())
    }

    /// Canonical comma-joined key.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, zone) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{zone}")?;
        }
        Ok(())
    }
}

impl FromStr for Assignment {
    type Err = ColonyError;

    /// Parses the canonical form. Range checks against a model are left to
    /// [`DispatchModel::assignment_from_zone_indices`](super::DispatchModel::assignment_from_zone_indices).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ColonyError::InvalidPath(s.to_string()));
        }
        trimmed
            .split(',')
            .map(|tok| {
                tok.trim()
                    .parse::<usize>()
                    .map_err(|_| ColonyError::InvalidPath(s.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Assignment)
    }
}
