use tracing::trace;

use crate::cref::ClauseRef;
use crate::idx::VarVec;
use crate::lbool::LBool;
use crate::lit::Lit;
use crate::var::{Removed, Var};

/// Why a literal is on the trail. Decisions and true level-0 units carry
/// no reason. Binary reasons store the *other* literal of the clause
/// (false under the trail) so the propagator needs no clause object.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Reason {
    Binary { other: Lit, red: bool },
    Long(ClauseRef),
}

#[derive(Debug)]
pub struct VarData {
    pub reason: Option<Reason>,
    pub level: u32,
    pub removed: Removed,
    /// Last assigned value, for phase saving.
    pub polarity: bool,
    /// Assumption mark while assumptions are installed.
    pub assumption: LBool,
    // Step-size branching bookkeeping:
    pub conflicted: u32,
    pub last_picked: u64,
    pub cancelled: u64,
}

impl Default for VarData {
    fn default() -> Self {
        Self {
            reason: None,
            level: 0,
            removed: Removed::None,
            polarity: true,
            assumption: LBool::Undef,
            conflicted: 0,
            last_picked: 0,
            cancelled: 0,
        }
    }
}

/// The trail plus everything keyed by variable that the trail maintains.
#[derive(Debug, Default)]
pub struct Assignment {
    assignment: VarVec<LBool>,
    pub var_data: VarVec<VarData>,
    pub trail: Vec<Lit>,
    pub trail_lim: Vec<usize>,
    pub qhead: usize,
    /// Conflict clock, advanced by the driver; enqueues stamp it into
    /// `last_picked` so unassignment rewards can compute an age.
    pub now: u64,
}

impl Assignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_var(&mut self) {
        self.assignment.push(LBool::Undef);
        self.var_data.push(VarData::default());
    }

    pub fn num_vars(&self) -> usize {
        self.assignment.len()
    }

    pub fn value(&self, lit: Lit) -> LBool {
        self.assignment[lit.var()] ^ lit.sign()
    }
    pub fn value_var(&self, var: Var) -> LBool {
        self.assignment[var]
    }

    pub fn var_data(&self, var: Var) -> &VarData {
        &self.var_data[var]
    }
    pub fn reason(&self, var: Var) -> Option<Reason> {
        self.var_data[var].reason
    }
    pub fn level(&self, var: Var) -> u32 {
        self.var_data[var].level
    }

    /// Value under permanent (level-0) assignments only.
    pub fn fixed(&self, lit: Lit) -> LBool {
        if self.level(lit.var()) > 0 {
            LBool::Undef
        } else {
            self.value(lit)
        }
    }

    pub fn decision_level(&self) -> u32 {
        self.trail_lim.len() as u32
    }
    pub fn new_decision_level(&mut self) {
        self.trail_lim.push(self.trail.len());
    }

    pub fn num_assigned(&self) -> usize {
        self.trail.len()
    }

    pub fn unchecked_enqueue(&mut self, lit: Lit, reason: Option<Reason>) {
        debug_assert_eq!(self.value(lit), LBool::Undef);
        debug_assert_eq!(self.var_data[lit.var()].removed, Removed::None);

        let var = lit.var();
        self.assignment[var] = LBool::from(!lit.sign());
        let level = self.trail_lim.len() as u32;
        let now = self.now;
        let data = &mut self.var_data[var];
        data.reason = reason;
        data.level = level;
        data.polarity = !lit.sign();
        data.last_picked = now;
        data.conflicted = 0;
        self.trail.push(lit);
        trace!("enqueued {:?} @{} by {:?}", lit, data.level, reason);
    }

    /// Enqueue if unassigned; report a conflict if falsified.
    pub fn enqueue(&mut self, lit: Lit, reason: Option<Reason>) -> bool {
        match self.value(lit) {
            LBool::Undef => {
                self.unchecked_enqueue(lit, reason);
                true
            }
            LBool::True => true,
            LBool::False => false,
        }
    }

    pub fn dequeue(&mut self) -> Option<Lit> {
        if self.qhead < self.trail.len() {
            let p = self.trail[self.qhead];
            self.qhead += 1;
            Some(p)
        } else {
            None
        }
    }

    pub fn prop_at_head(&self) -> bool {
        self.qhead == self.trail.len()
    }

    pub fn unassign(&mut self, var: Var) {
        self.assignment[var] = LBool::Undef;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_and_trail() {
        let mut a = Assignment::new();
        for _ in 0..3 {
            a.push_var();
        }
        let x = Lit::positive(Var::new(0));
        let y = Lit::negative(Var::new(1));
        a.unchecked_enqueue(x, None);
        assert_eq!(a.level(x.var()), 0);
        a.new_decision_level();
        a.unchecked_enqueue(y, None);
        assert_eq!(a.decision_level(), 1);
        assert_eq!(a.level(y.var()), 1);
        assert_eq!(a.value(y), LBool::True);
        assert_eq!(a.value(!y), LBool::False);
        assert!(a.enqueue(y, None));
        assert!(!a.enqueue(!y, None));
    }
}
