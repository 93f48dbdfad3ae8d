//! Records kept by the colony: trials, best/worst tracking and history.

use crate::system::{Assignment, SolverStatus};
use std::collections::VecDeque;

/// One ant's outcome in one iteration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trial {
    /// 1-based ant id.
    pub ant: usize,
    /// Iteration the trial belongs to (0 = initialization).
    pub iteration: usize,
    pub path: Assignment,
    pub status: SolverStatus,
    /// Total dispatch cost `Ft` (the path "distance").
    pub cost: f64,
    /// Cost and status were copied from an earlier trial on the same path.
    pub reused: bool,
}

impl Trial {
    /// Canonical path key.
    pub fn path_key(&self) -> String {
        self.path.key()
    }

    /// Path attractiveness `1 / Ft`.
    pub fn tau(&self) -> f64 {
        1.0 / self.cost
    }
}

/// Cheapest and most expensive trials seen so far.
///
/// Both slots start empty, which stands for the `+∞` / `-∞` sentinels: the
/// first observed trial installs itself in both. Afterwards a trial replaces
/// the best only if strictly cheaper and the worst only if strictly more
/// expensive, so ties keep the current holder.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BestWorst {
    best: Option<Trial>,
    worst: Option<Trial>,
}

impl BestWorst {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn best(&self) -> Option<&Trial> {
        self.best.as_ref()
    }

    pub fn worst(&self) -> Option<&Trial> {
        self.worst.as_ref()
    }

    /// Best cost, `+∞` while empty.
    pub fn best_cost(&self) -> f64 {
        self.best.as_ref().map_or(f64::INFINITY, |t| t.cost)
    }

    /// Worst cost, `-∞` while empty.
    pub fn worst_cost(&self) -> f64 {
        self.worst.as_ref().map_or(f64::NEG_INFINITY, |t| t.cost)
    }

    /// Offers a trial. Returns `true` if it became the new best.
    pub fn observe(&mut self, trial: &Trial) -> bool {
        let improved = trial.cost < self.best_cost();
        if improved {
            self.best = Some(trial.clone());
        }
        if trial.cost > self.worst_cost() {
            self.worst = Some(trial.clone());
        }
        improved
    }

    /// Offers every trial in order. Returns `true` if the best changed.
    pub fn observe_all<'t>(&mut self, trials: impl IntoIterator<Item = &'t Trial>) -> bool {
        trials
            .into_iter()
            .fold(false, |changed, t| self.observe(t) || changed)
    }
}

/// Summary of one iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IterationStats {
    pub iteration: usize,
    /// Cheapest trial cost in this iteration.
    pub best_cost: f64,
    pub mean_cost: f64,
    pub worst_cost: f64,
    /// Trials that went through the QP solver.
    pub solved: usize,
    /// Trials answered from the path memo.
    pub reused: usize,
    /// Trials whose dispatch was not optimal.
    pub non_optimal: usize,
}

impl IterationStats {
    /// Summarizes a non-empty set of trials.
    pub fn from_trials(iteration: usize, trials: &[Trial]) -> Self {
        let n = trials.len().max(1) as f64;
        let (best, worst, sum) = trials.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(lo, hi, sum), t| (lo.min(t.cost), hi.max(t.cost), sum + t.cost),
        );
        let reused = trials.iter().filter(|t| t.reused).count();
        Self {
            iteration,
            best_cost: best,
            mean_cost: sum / n,
            worst_cost: worst,
            solved: trials.len() - reused,
            reused,
            non_optimal: trials.iter().filter(|t| !t.status.is_optimal()).count(),
        }
    }
}

/// Trials grouped by iteration.
///
/// With a retention limit only the most recent iterations are kept; the
/// iteration numbers of retained trials are unaffected.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrialHistory {
    iterations: VecDeque<Vec<Trial>>,
    first: usize,
    limit: Option<usize>,
}

impl TrialHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps at most `limit` iterations.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit.max(1)),
            ..Self::default()
        }
    }

    /// Appends the trials of the next iteration.
    pub fn push(&mut self, trials: Vec<Trial>) {
        self.iterations.push_back(trials);
        if let Some(limit) = self.limit {
            while self.iterations.len() > limit {
                self.iterations.pop_front();
                self.first += 1;
            }
        }
    }

    /// Trials of iteration `k`, if still retained.
    pub fn iteration(&self, k: usize) -> Option<&[Trial]> {
        k.checked_sub(self.first)
            .and_then(|i| self.iterations.get(i))
            .map(Vec::as_slice)
    }

    /// Trials of the most recent iteration.
    pub fn latest(&self) -> Option<&[Trial]> {
        self.iterations.back().map(Vec::as_slice)
    }

    /// Number of the most recent iteration.
    pub fn latest_iteration(&self) -> Option<usize> {
        (!self.iterations.is_empty()).then(|| self.first + self.iterations.len() - 1)
    }

    /// Number of the oldest retained iteration.
    pub fn first_iteration(&self) -> usize {
        self.first
    }

    /// Number of retained iterations.
    pub fn len(&self) -> usize {
        self.iterations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.iterations.is_empty()
    }

    /// Retained iterations, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &[Trial]> {
        self.iterations.iter().map(Vec::as_slice)
    }

    /// All retained trials as one flat table, ordered by iteration then ant.
    pub fn rows(&self) -> impl Iterator<Item = &Trial> {
        self.iterations.iter().flatten()
    }

    /// Cheapest cost of each retained iteration.
    pub fn min_costs(&self) -> Vec<f64> {
        self.iterations
            .iter()
            .map(|ts| ts.iter().map(|t| t.cost).fold(f64::INFINITY, f64::min))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trial(ant: usize, iteration: usize, cost: f64) -> Trial {
        Trial {
            ant,
            iteration,
            path: Assignment::new_unchecked(vec![ant]),
            status: SolverStatus::Optimal,
            cost,
            reused: false,
        }
    }

    #[test]
    fn test_first_trial_installs_both() {
        let mut bw = BestWorst::new();
        assert_eq!(bw.best_cost(), f64::INFINITY);
        assert_eq!(bw.worst_cost(), f64::NEG_INFINITY);

        assert!(bw.observe(&trial(1, 0, 10.0)));
        assert_eq!(bw.best().unwrap().ant, 1);
        assert_eq!(bw.worst().unwrap().ant, 1);
    }

    #[test]
    fn test_ties_keep_holder() {
        let mut bw = BestWorst::new();
        bw.observe(&trial(1, 0, 10.0));
        bw.observe(&trial(2, 0, 20.0));
        assert!(!bw.observe(&trial(3, 1, 10.0)));
        bw.observe(&trial(4, 1, 20.0));
        assert_eq!(bw.best().unwrap().ant, 1);
        assert_eq!(bw.worst().unwrap().ant, 2);

        assert!(bw.observe(&trial(5, 2, 9.0)));
        bw.observe(&trial(6, 2, 21.0));
        assert_eq!(bw.best().unwrap().ant, 5);
        assert_eq!(bw.worst().unwrap().ant, 6);
    }

    #[test]
    fn test_observe_all_reports_change() {
        let mut bw = BestWorst::new();
        let trials = vec![trial(1, 0, 5.0), trial(2, 0, 3.0)];
        assert!(bw.observe_all(&trials));
        assert!(!bw.observe_all(&[trial(3, 1, 4.0)]));
        assert_eq!(bw.best_cost(), 3.0);
        assert_eq!(bw.worst_cost(), 5.0);
    }

    #[test]
    fn test_stats() {
        let mut trials = vec![trial(1, 2, 4.0), trial(2, 2, 8.0), trial(3, 2, 6.0)];
        trials[2].reused = true;
        trials[1].status = SolverStatus::Infeasible;
        let s = IterationStats::from_trials(2, &trials);
        assert_eq!(s.best_cost, 4.0);
        assert_eq!(s.worst_cost, 8.0);
        assert!((s.mean_cost - 6.0).abs() < 1e-12);
        assert_eq!(s.solved, 2);
        assert_eq!(s.reused, 1);
        assert_eq!(s.non_optimal, 1);
    }

    #[test]
    fn test_history_limit_drops_oldest() {
        let mut h = TrialHistory::with_limit(2);
        assert_eq!(h.latest_iteration(), None);
        for k in 0..4 {
            h.push(vec![trial(1, k, 10.0 - k as f64)]);
        }
        assert_eq!(h.len(), 2);
        assert_eq!(h.first_iteration(), 2);
        assert_eq!(h.latest_iteration(), Some(3));
        assert!(h.iteration(1).is_none());
        assert_eq!(h.iteration(2).unwrap()[0].iteration, 2);
        assert_eq!(h.min_costs(), vec![8.0, 7.0]);
        assert_eq!(h.rows().count(), 2);
    }

    #[test]
    fn test_tau() {
        assert!((trial(1, 0, 4.0).tau() - 0.25).abs() < 1e-15);
    }
}
