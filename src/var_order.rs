use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

use crate::assignment::{Assignment, VarData};
use crate::idx::{VarHeap, VarVec};
use crate::lit::Lit;
use crate::options::{Branching, Options, PolarityMode};
use crate::var::{Removed, Var};

/// Variable order shared by both branching heuristics.
///
/// One max-heap serves whichever heuristic is active; each heuristic keeps
/// its own activity table so a mode switch between solves only needs a
/// heap rebuild. The heap may transiently hold assigned variables — they
/// are filtered at pick time and exact membership is restored on rebuild.
#[derive(Debug)]
pub struct VarOrder {
    branching: Branching,
    polarity_mode: PolarityMode,
    random_var_freq: f64,

    activity_vsids: VarVec<f64>,
    var_inc: f64,
    pub var_decay: f64,
    var_decay_max: f64,

    activity_maple: VarVec<f64>,
    pub step_size: f64,
    step_size_min: f64,
    step_size_dec: f64,

    heap: VarHeap,
}

impl VarOrder {
    pub fn new(opts: &Options) -> Self {
        Self {
            branching: opts.branching,
            polarity_mode: opts.polarity_mode,
            random_var_freq: opts.random_var_freq,
            activity_vsids: VarVec::new(),
            var_inc: 1.0,
            var_decay: opts.var_decay_start,
            var_decay_max: opts.var_decay_max,
            activity_maple: VarVec::new(),
            step_size: opts.step_size_start,
            step_size_min: opts.step_size_min,
            step_size_dec: opts.step_size_dec,
            heap: VarHeap::new(),
        }
    }

    pub fn branching(&self) -> Branching {
        self.branching
    }

    pub fn push_var(&mut self) {
        self.activity_vsids.push(0.0);
        self.activity_maple.push(0.0);
    }

    pub fn activities(&self, var: Var) -> (f64, f64) {
        (self.activity_vsids[var], self.activity_maple[var])
    }
    pub fn set_activities(&mut self, var: Var, vsids: f64, maple: f64) {
        self.activity_vsids[var] = vsids;
        self.activity_maple[var] = maple;
    }

    pub fn insert(&mut self, var: Var) {
        let act = match self.branching {
            Branching::Vsids => &self.activity_vsids,
            Branching::Maple => &self.activity_maple,
        };
        self.heap.insert_by(var, |a, b| act[a] > act[b]);
    }

    /// Activity-decay bump. `mult` scales the increment (conflict-side
    /// literals get a half bump during resolution, implied ones a full one).
    pub fn bump_vsids(&mut self, var: Var, mult: f64) {
        let new = self.activity_vsids[var] + self.var_inc * mult;
        self.activity_vsids[var] = new;

        if new > 1e100 {
            self.rescale_vsids();
        }

        if self.branching == Branching::Vsids && self.heap.contains(&var) {
            let act = &self.activity_vsids;
            self.heap.raise_by(var, |a, b| act[a] > act[b]);
        }
    }

    fn rescale_vsids(&mut self) {
        debug!("Rescaling VSIDS activity");
        self.var_inc *= 1e-100;
        for a in self.activity_vsids.iter_mut() {
            *a *= 1e-100;
        }
    }

    /// Geometric growth of the increment, once per conflict.
    pub fn decay_vsids(&mut self) {
        self.var_inc *= 1.0 / self.var_decay;
    }

    /// Linear warm-up of the decay factor, applied every 4096 conflicts.
    pub fn warmup_var_decay(&mut self) {
        if self.var_decay < self.var_decay_max {
            self.var_decay += 0.01;
        }
    }

    /// Per-conflict step-size decay of the moving-average heuristic.
    pub fn decay_step_size(&mut self) {
        if self.step_size > self.step_size_min {
            self.step_size -= self.step_size_dec;
        }
    }

    /// Moving-average reward, applied when `var` is unassigned during
    /// backtracking: reward = conflicts-participated / age-in-conflicts.
    pub fn reward_on_unassign(&mut self, var: Var, data: &mut VarData, sum_conflicts: u64) {
        debug_assert!(self.branching == Branching::Maple);
        let age = sum_conflicts - data.last_picked;
        if age > 0 {
            let reward = data.conflicted as f64 / age as f64;
            let old = self.activity_maple[var];
            let new = self.step_size * reward + (1.0 - self.step_size) * old;
            self.activity_maple[var] = new;
            if self.heap.contains(&var) {
                let act = &self.activity_maple;
                if new > old {
                    self.heap.raise_by(var, |a, b| act[a] > act[b]);
                } else {
                    self.heap.lower_by(var, |a, b| act[a] > act[b]);
                }
            }
        }
        data.cancelled = sum_conflicts;
    }

    /// Pop the best unassigned, non-removed variable. In moving-average
    /// mode, stale heap tops are geometrically aged (`0.95^age`) before
    /// being trusted.
    pub fn pick_branching_variable(
        &mut self,
        assignment: &mut Assignment,
        sum_conflicts: u64,
        rng: &mut StdRng,
    ) -> Option<Var> {
        if self.random_var_freq > 0.0 && rng.gen::<f64>() < self.random_var_freq {
            if let Some(&var) = self.heap.random_element(rng) {
                if assignment.value_var(var).is_undef()
                    && assignment.var_data(var).removed == Removed::None
                {
                    return Some(var);
                }
            }
        }

        loop {
            if self.branching == Branching::Maple {
                self.age_stale_top(assignment, sum_conflicts);
            }
            let act = match self.branching {
                Branching::Vsids => &self.activity_vsids,
                Branching::Maple => &self.activity_maple,
            };
            let var = self.heap.remove_top_by(|a, b| act[a] > act[b])?;
            if assignment.value_var(var).is_undef()
                && assignment.var_data(var).removed == Removed::None
            {
                return Some(var);
            }
        }
    }

    fn age_stale_top(&mut self, assignment: &mut Assignment, sum_conflicts: u64) {
        while let Some(&top) = self.heap.peek() {
            let age = sum_conflicts - assignment.var_data(top).cancelled;
            if age == 0 {
                break;
            }
            let decay = 0.95f64.powi(age as i32);
            self.activity_maple[top] *= decay;
            let act = &self.activity_maple;
            self.heap.lower_by(top, |a, b| act[a] > act[b]);
            assignment.var_data[top].cancelled = sum_conflicts;
        }
    }

    pub fn pick_phase(&self, var: Var, data: &VarData, rng: &mut StdRng) -> Lit {
        let value = match self.polarity_mode {
            PolarityMode::Saved => data.polarity,
            PolarityMode::AlwaysFalse => false,
            PolarityMode::AlwaysTrue => true,
            PolarityMode::Random => rng.gen(),
        };
        Lit::new(var, !value)
    }

    /// Rebuild the heap to hold exactly the given variables.
    pub fn rebuild(&mut self, vars: Vec<Var>) {
        let act = match self.branching {
            Branching::Vsids => &self.activity_vsids,
            Branching::Maple => &self.activity_maple,
        };
        self.heap.build_by(vars, |a, b| act[a] > act[b]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::DEFAULT_OPTIONS;
    use rand::SeedableRng;

    #[test]
    fn picks_highest_activity_first() {
        let mut order = VarOrder::new(&DEFAULT_OPTIONS);
        let mut assignment = Assignment::new();
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..3 {
            order.push_var();
            assignment.push_var();
        }
        for v in 0..3 {
            order.insert(Var::new(v));
        }
        order.bump_vsids(Var::new(1), 1.0);
        let picked = order.pick_branching_variable(&mut assignment, 0, &mut rng);
        assert_eq!(picked, Some(Var::new(1)));
    }
}
