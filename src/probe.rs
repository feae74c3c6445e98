use std::mem;

use rand::seq::SliceRandom;
use tracing::{debug, info};

use crate::implcache::CacheEntry;
use crate::lbool::LBool;
use crate::lit::Lit;
use crate::propagate::ProbeTree;
use crate::solver::Solver;
use crate::var::{Removed, Var};

/// Running totals of the failed-literal prober.
#[derive(Debug, Clone)]
pub struct ProbeStats {
    pub num_calls: u64,
    pub num_probed: u64,
    pub num_failed: u64,
    pub num_visited: u64,
    pub zero_depth_assigns: u64,
    pub added_bin: u64,
    pub removed_bin_irred: u64,
    pub removed_bin_red: u64,
    pub both_same_added: u64,
    /// Budget scaling carried between calls: productive rounds earn a
    /// bigger budget next time.
    pub(crate) props_multiplier: f64,
}

impl Default for ProbeStats {
    fn default() -> Self {
        Self {
            num_calls: 0,
            num_probed: 0,
            num_failed: 0,
            num_visited: 0,
            zero_depth_assigns: 0,
            added_bin: 0,
            removed_bin_irred: 0,
            removed_bin_red: 0,
            both_same_added: 0,
            props_multiplier: 1.0,
        }
    }
}

enum Pass {
    Completed,
    FailedLit,
    Unsat,
}

impl Solver {
    /// Failed-literal probing round over a randomized subset of the
    /// unassigned variables, within a bogo-count budget.
    ///
    /// Each selected variable is tentatively decided at level 1 in both
    /// polarities. Conflicts yield failed literals (level-0 units),
    /// agreements of both passes yield level-0 consequences, long-clause
    /// propagations yield hyper-binary resolvents, and the implication
    /// tree exposes transitively redundant binaries. Returns false on
    /// proven unsatisfiability.
    pub fn probe(&mut self) -> bool {
        if !self.ok {
            return false;
        }
        debug_assert_eq!(self.assignment.decision_level(), 0);
        if self.propagate().is_some() {
            self.ok = false;
            return false;
        }

        let mut tree = mem::take(&mut self.probe_tree);
        tree.bogo = 0;
        let result = self.probe_inner(&mut tree);
        self.probe_stats.num_visited += tree.bogo;
        self.probe_tree = tree;
        result
    }

    fn probe_inner(&mut self, tree: &mut ProbeTree) -> bool {
        self.probe_stats.num_calls += 1;
        let trail_at_start = self.assignment.num_assigned();
        let budget =
            (self.opts.probe_bogo_base as f64 * self.probe_stats.props_multiplier) as u64;

        let mut candidates: Vec<Var> = (0..self.num_vars() as u32)
            .map(Var::new)
            .filter(|&v| {
                self.assignment.value_var(v).is_undef()
                    && self.assignment.var_data(v).removed == Removed::None
            })
            .collect();
        candidates.shuffle(&mut self.rng);

        // Pass-1 footprint for both-propagated detection.
        let mut propagated: Vec<LBool> = vec![LBool::Undef; self.num_vars()];
        let mut pass_lits: Vec<Lit> = Vec::new();
        let mut first_lits: Vec<Lit> = Vec::new();
        let mut to_enqueue: Vec<Lit> = Vec::new();

        for v in candidates {
            if tree.bogo > budget {
                debug!("probe budget exhausted");
                break;
            }
            if !self.assignment.value_var(v).is_undef() {
                continue;
            }
            let probe = Lit::positive(v);
            self.probe_stats.num_probed += 1;

            // First pass.
            pass_lits.clear();
            match self.try_this(probe, tree, &mut pass_lits) {
                Pass::Unsat => return false,
                Pass::FailedLit => continue,
                Pass::Completed => {}
            }
            for &l in &pass_lits {
                propagated[l.var().index()] = LBool::from(!l.sign());
            }
            first_lits.clear();
            first_lits.append(&mut pass_lits);

            // Installing a half-falsified hyper-binary may have fixed the
            // probed variable meanwhile; the cache still learns from the
            // finished pass.
            if !self.assignment.value_var(v).is_undef() {
                self.cache.merge(
                    probe,
                    first_lits.iter().map(|&lit| CacheEntry { lit, certain: false }),
                );
                continue;
            }

            // Second pass with the opposite polarity.
            match self.try_this(!probe, tree, &mut pass_lits) {
                Pass::Unsat => return false,
                Pass::FailedLit => {
                    for &l in &first_lits {
                        propagated[l.var().index()] = LBool::Undef;
                    }
                    continue;
                }
                Pass::Completed => {}
            }

            // Literals forced the same way by both polarities hold at
            // level 0.
            to_enqueue.clear();
            for &l in &pass_lits {
                if propagated[l.var().index()] == LBool::from(!l.sign()) {
                    to_enqueue.push(l);
                }
            }

            self.update_cache_from_passes(probe, &first_lits, &pass_lits, &to_enqueue);

            for &l in &first_lits {
                propagated[l.var().index()] = LBool::Undef;
            }

            if !to_enqueue.is_empty() {
                self.probe_stats.both_same_added += to_enqueue.len() as u64;
                for i in 0..to_enqueue.len() {
                    let l = to_enqueue[i];
                    if self.assignment.value(l) != LBool::True {
                        self.drat.add_clause(&[l]);
                    }
                    if !self.assignment.enqueue(l, None) {
                        self.ok = false;
                        return false;
                    }
                }
                if self.propagate().is_some() {
                    self.ok = false;
                    return false;
                }
            }
        }

        let zero_depth = (self.assignment.num_assigned() - trail_at_start) as u64;
        self.probe_stats.zero_depth_assigns += zero_depth;
        self.probe_stats.props_multiplier = if zero_depth > 0 {
            (self.probe_stats.props_multiplier * 1.3).min(self.opts.probe_multiplier_max)
        } else {
            1.0
        };
        info!(
            "probe round: {} probed, {} failed, {} zero-depth, {} bins added, {} bins removed",
            self.probe_stats.num_probed,
            self.probe_stats.num_failed,
            zero_depth,
            self.probe_stats.added_bin,
            self.probe_stats.removed_bin_irred + self.probe_stats.removed_bin_red,
        );
        true
    }

    /// One tentative decision: enqueue `probe` at a fresh level 1 and
    /// propagate with hyper-binary bookkeeping. Fills `forced` with the
    /// literals the probe implied (the probe itself excluded).
    fn try_this(&mut self, probe: Lit, tree: &mut ProbeTree, forced: &mut Vec<Lit>) -> Pass {
        debug_assert_eq!(self.assignment.decision_level(), 0);
        debug_assert_eq!(self.assignment.value(probe), LBool::Undef);

        tree.begin_pass(probe);
        self.assignment.new_decision_level();
        self.assignment.unchecked_enqueue(probe, None);
        let below = self.assignment.trail_lim[0] + 1;

        let confl = self.propagate_probe(tree);

        if confl.is_some() {
            // Failed literal: the opposite polarity is a level-0 unit.
            self.probe_stats.num_failed += 1;
            debug!("failed literal {:?}", probe);
            tree.end_pass();
            self.cancel_until(0);
            if !self.install_probe_bins(tree) {
                return Pass::Unsat;
            }
            self.drat.add_clause(&[!probe]);
            if !self.assignment.enqueue(!probe, None) || self.propagate().is_some() {
                self.ok = false;
                return Pass::Unsat;
            }
            return Pass::FailedLit;
        }

        forced.clear();
        forced.extend(self.assignment.trail[below..].iter().copied());
        tree.end_pass();
        self.cancel_until(0);
        if !self.install_probe_bins(tree) {
            return Pass::Unsat;
        }
        Pass::Completed
    }

    /// Apply the binary-clause harvest of a finished pass: attach the
    /// hyper-binary resolvents, drop transitively redundant binaries.
    fn install_probe_bins(&mut self, tree: &mut ProbeTree) -> bool {
        debug_assert_eq!(self.assignment.decision_level(), 0);
        let mut propagate_needed = false;

        for (a, b) in tree.pending_bins.drain(..) {
            let va = self.assignment.value(a);
            let vb = self.assignment.value(b);
            if va == LBool::True || vb == LBool::True {
                continue;
            }
            if va == LBool::False && vb == LBool::False {
                self.ok = false;
                return false;
            }
            self.watches.attach_bin(a, b, true);
            self.db.num_bin_red += 1;
            self.probe_stats.added_bin += 1;
            self.drat.add_clause(&[a, b]);
            if va == LBool::False {
                self.drat.add_clause(&[b]);
                self.assignment.unchecked_enqueue(b, None);
                propagate_needed = true;
            } else if vb == LBool::False {
                self.drat.add_clause(&[a]);
                self.assignment.unchecked_enqueue(a, None);
                propagate_needed = true;
            }
        }

        for (a, b, red) in tree.useless_bins.drain(..) {
            if self.watches.detach_bin(a, b, red) {
                self.drat.delete_clause(&[a, b]);
                if red {
                    self.db.num_bin_red -= 1;
                    self.probe_stats.removed_bin_red += 1;
                } else {
                    self.db.num_bin_irred -= 1;
                    self.probe_stats.removed_bin_irred += 1;
                }
            }
        }

        if propagate_needed && self.propagate().is_some() {
            self.ok = false;
            return false;
        }
        true
    }

    /// Feed the implication cache: everything forced by `probe` (and by
    /// its negation), with both-propagated consequences marked certain.
    fn update_cache_from_passes(
        &mut self,
        probe: Lit,
        first_lits: &[Lit],
        second_lits: &[Lit],
        both: &[Lit],
    ) {
        let certain = |l: &Lit| both.contains(l);
        self.cache.merge(
            probe,
            first_lits.iter().map(|&lit| CacheEntry { lit, certain: certain(&lit) }),
        );
        self.cache.merge(
            !probe,
            second_lits.iter().map(|&lit| CacheEntry { lit, certain: certain(&lit) }),
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::options::Options;
    use crate::solver::Solver;
    use crate::lbool::LBool;
    use crate::lit::Lit;
    use test_log::test;

    fn lit(x: i32) -> Lit {
        Lit::from_external(x)
    }

    #[test]
    fn failed_literal_becomes_unit() {
        // 1 → 2, 1 → ¬2 makes 1 a failed literal: probing fixes ¬1.
        let mut solver = Solver::new(Options::default());
        solver.add_clause(&[lit(-1), lit(2)]);
        solver.add_clause(&[lit(-1), lit(-2)]);
        assert!(solver.probe());
        assert_eq!(solver.value(lit(1)), LBool::False);
    }

    #[test]
    fn both_propagated_is_fixed() {
        // Both 1 and ¬1 force 3: var 3 is a level-0 consequence.
        let mut solver = Solver::new(Options::default());
        solver.add_clause(&[lit(-1), lit(3)]);
        solver.add_clause(&[lit(1), lit(3)]);
        // Noise so the instance is not trivially all-units.
        solver.add_clause(&[lit(2), lit(4), lit(5)]);
        assert!(solver.probe());
        assert_eq!(solver.value(lit(3)), LBool::True);
    }
}
