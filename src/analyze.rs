use std::mem;

use tracing::{debug, trace};

use crate::assignment::Reason;
use crate::clause::{abst_var, Tier};
use crate::cref::ClauseRef;
use crate::idx::{LitVec, VarVec};
use crate::lbool::LBool;
use crate::lit::Lit;
use crate::options::Branching;
use crate::propagate::Conflict;
use crate::solver::Solver;
use crate::var::Var;

/// Scratch state of the conflict analyzer, kept allocated across
/// conflicts. `seen` tracks variables of the resolution frontier,
/// `seen2` tracks the literal set of the partial learnt clause for
/// on-the-fly subsumption, and the stamp tables serve glue counting and
/// watch-based minimization.
#[derive(Debug, Default)]
pub(crate) struct AnalyzeTmp {
    seen: VarVec<bool>,
    seen2: LitVec<bool>,
    seen2_set: Vec<Lit>,
    to_clear: Vec<Lit>,
    stack: Vec<Lit>,
    antecedent: Vec<Lit>,
    pub(crate) learnt: Vec<Lit>,
    implied_by_learnts: Vec<Var>,
    pub(crate) otfs_long: Vec<ClauseRef>,
    pub(crate) otfs_implicit: Vec<[Lit; 2]>,
    tmp_size: u32,
    tmp_abst: u32,
    level_stamp: Vec<u32>,
    level_stamp_counter: u32,
    var_stamp: VarVec<u32>,
    var_stamp_counter: u32,
    lit_mark: LitVec<bool>,
}

impl AnalyzeTmp {
    pub(crate) fn push_var(&mut self) {
        self.seen.push(false);
        self.seen2.push(false);
        self.seen2.push(false);
        self.var_stamp.push(0);
        self.lit_mark.push(false);
        self.lit_mark.push(false);
    }

    fn mark_seen2(&mut self, lit: Lit) {
        if !self.seen2[lit] {
            self.seen2[lit] = true;
            self.seen2_set.push(lit);
            self.tmp_size += 1;
            self.tmp_abst |= abst_var(&lit);
        }
    }

    fn clear_seen2(&mut self) {
        for lit in self.seen2_set.drain(..) {
            self.seen2[lit] = false;
        }
        self.tmp_size = 0;
        self.tmp_abst = 0;
    }
}

pub(crate) struct AnalyzeResult {
    pub backtrack_level: u32,
    pub glue: u32,
    /// Last resolved clause found subsumed by the learnt clause; the
    /// learnt is written into it instead of allocating a fresh clause.
    pub subsumed: Option<ClauseRef>,
}

impl Solver {
    /// Derive the 1-UIP clause for `confl`, minimize it, and compute the
    /// backtrack level. On return `learnt[0]` is the asserting literal
    /// and `learnt[1]` (when present) carries the backtrack level.
    pub(crate) fn analyze(&mut self, confl: Conflict) -> AnalyzeResult {
        debug_assert!(self.assignment.decision_level() > 0);

        let last_resolved = self.resolve_into_learnt(confl);
        self.minimize_learnt();

        let mut glue = u32::MAX;
        if self.analyze.learnt.len() <= self.opts.max_size_more_minim {
            glue = self.calc_glue_of_learnt();
            if glue <= self.opts.max_glue_more_minim {
                self.watch_based_minim();
            }
        }
        if glue == u32::MAX {
            glue = self.calc_glue_of_learnt();
        }

        if self.analyze.learnt.len() > self.opts.max_size_more_minim
            && glue <= self.opts.glue_tier0_if_below_or_eq + 2
            && self.opts.do_cache_minim
        {
            self.cache_and_binary_minim();
        }

        let backtrack_level = self.find_backtrack_level();
        self.bump_after_analyze(backtrack_level);

        let subsumed = self.last_resolved_subsumed(last_resolved);
        self.analyze.clear_seen2();

        trace!(
            "learnt {:?} (glue {}, btlevel {})",
            self.analyze.learnt,
            glue,
            backtrack_level
        );
        AnalyzeResult {
            backtrack_level,
            glue,
            subsumed,
        }
    }

    /// Trail-walking resolution until the first UIP.
    fn resolve_into_learnt(&mut self, confl: Conflict) -> Option<ClauseRef> {
        let otfs = self.opts.do_otf_subsume;
        self.analyze.learnt.clear();
        self.analyze.learnt.push(Lit::UNDEF); // room for the asserting literal
        self.analyze.implied_by_learnts.clear();
        debug_assert!(self.analyze.otfs_long.is_empty());
        debug_assert!(self.analyze.otfs_implicit.is_empty());
        debug_assert_eq!(self.analyze.tmp_size, 0);

        let mut pathc: u32 = 0;
        let mut index = self.assignment.trail.len();
        let mut pivot: Option<Lit> = None;
        let mut last_resolved: Option<ClauseRef> = None;
        let mut source: Option<Reason> = None;

        loop {
            // The pivot leaves the partial learnt clause.
            if let Some(p) = pivot {
                if otfs && self.analyze.seen2[!p] {
                    self.analyze.seen2[!p] = false;
                    self.analyze.tmp_size -= 1;
                    // The abstraction must under-approximate the set.
                    self.analyze.tmp_abst &= !abst_var(&!p);
                }
            }

            // Collect the antecedent literals and touch clause stats.
            debug_assert!(self.analyze.antecedent.is_empty());
            let resolved_cref = match (pivot, source, confl) {
                (None, _, Conflict::Binary { a, b }) => {
                    self.analyze.antecedent.push(a);
                    self.analyze.antecedent.push(b);
                    None
                }
                (None, _, Conflict::Long(cref)) => {
                    self.touch_resolved_clause(cref);
                    let clause = self.ca.clause(cref);
                    self.analyze.antecedent.extend(clause.iter().copied());
                    Some(cref)
                }
                (Some(_), Some(Reason::Binary { other, .. }), _) => {
                    self.analyze.antecedent.push(other);
                    None
                }
                (Some(p), Some(Reason::Long(cref)), _) => {
                    self.touch_resolved_clause(cref);
                    let clause = self.ca.clause(cref);
                    debug_assert_eq!(clause[0], p);
                    self.analyze.antecedent.extend(clause.iter().skip(1).copied());
                    Some(cref)
                }
                _ => unreachable!("UIP literal without a reason"),
            };
            last_resolved = resolved_cref;

            let buf = mem::take(&mut self.analyze.antecedent);
            for &lit in &buf {
                self.add_lit_to_learnt(lit, &mut pathc, otfs);
            }
            self.analyze.antecedent = {
                let mut buf = buf;
                buf.clear();
                buf
            };

            // Select the next literal to resolve on.
            loop {
                index -= 1;
                if self.analyze.seen[self.assignment.trail[index].var()] {
                    break;
                }
            }
            let p = self.assignment.trail[index];

            // The clause just resolved may be subsumed by the partial
            // learnt clause; check while the set is still current.
            if otfs && pathc > 1 {
                if let Some(cref) = last_resolved {
                    self.check_otf_subsume(cref);
                }
            }

            pivot = Some(p);
            self.analyze.seen[p.var()] = false;
            pathc -= 1;
            if pathc == 0 {
                break;
            }
            source = Some(self.assignment.reason(p.var()).expect("non-UIP must have a reason"));
        }

        let p = pivot.unwrap();
        self.analyze.learnt[0] = !p;
        last_resolved
    }

    fn add_lit_to_learnt(&mut self, lit: Lit, pathc: &mut u32, otfs: bool) {
        let var = lit.var();
        let level = self.assignment.level(var);
        if self.analyze.seen[var] || level == 0 {
            return;
        }
        self.analyze.seen[var] = true;

        match self.var_order.branching() {
            Branching::Vsids => {
                self.var_order.bump_vsids(var, 0.5);
                self.analyze.implied_by_learnts.push(var);
            }
            Branching::Maple => {
                self.assignment.var_data[var].conflicted += 1;
            }
        }

        if otfs {
            self.analyze.mark_seen2(lit);
        }

        if level >= self.assignment.decision_level() {
            *pathc += 1;
        } else {
            self.analyze.learnt.push(lit);
        }
    }

    /// Stats updates for a clause consumed by resolution: recency, UIP
    /// participation, glue re-computation (promotions only), activity.
    fn touch_resolved_clause(&mut self, cref: ClauseRef) {
        let sum_conflicts = self.sum_conflicts;
        let clause = self.ca.clause(cref);
        if !clause.is_red() {
            return;
        }
        let tier = clause.stats.tier;

        if tier != Tier::T0 && self.opts.do_update_glue_on_analysis {
            let new_glue = self.calc_glue_of_clause(cref);
            let clause = self.ca.clause_mut(cref);
            if new_glue < clause.stats.glue {
                clause.stats.glue = new_glue;
                let better = self.db.tier_for_glue(new_glue, &self.opts);
                if better < clause.stats.tier {
                    clause.stats.tier = better;
                }
            }
        }

        let clause = self.ca.clause_mut(cref);
        clause.stats.last_touched = sum_conflicts;
        clause.stats.used_for_uip_creation += 1;
        if matches!(clause.stats.tier, Tier::T2 | Tier::T3) {
            self.db.bump_activity(cref, &mut self.ca);
        }
    }

    /// If the literal set of `cref` collapses onto the partial learnt
    /// clause, replace it: shrink long clauses in place (detached now,
    /// re-attached after backtracking), or record an implicit clause.
    fn check_otf_subsume(&mut self, cref: ClauseRef) {
        let tmp_size = self.analyze.tmp_size as usize;
        {
            let clause = self.ca.clause(cref);
            if clause.len() <= tmp_size {
                return;
            }
            if clause.is_red() && clause.stats.glue > self.opts.glue_tier1_if_below_or_eq {
                return;
            }
            if (clause.abstraction() & self.analyze.tmp_abst) != self.analyze.tmp_abst {
                return;
            }
            let from_clause = clause.iter().filter(|&&l| self.analyze.seen2[l]).count();
            if from_clause != tmp_size {
                return;
            }
        }

        if tmp_size <= 2 {
            let clause = self.ca.clause(cref);
            let mut lits = [Lit::UNDEF; 2];
            let mut n = 0;
            for &l in clause.iter() {
                if self.analyze.seen2[l] {
                    debug_assert!(n < 2);
                    lits[n] = l;
                    n += 1;
                }
            }
            debug_assert_eq!(n, 2, "level-0 literals never enter the learnt set");
            debug!("OTF subsume: implicit {:?} replaces {:?}", lits, cref);
            self.drat.add_clause(&lits);
            self.analyze.otfs_implicit.push(lits);
        } else {
            let (w0, w1) = {
                let clause = self.ca.clause(cref);
                (clause[0], clause[1])
            };
            if self.drat.enabled() {
                let old = self.ca.clause(cref).lits().to_vec();
                self.drat.delete_delayed(&old);
            }
            self.watches.detach_long(cref, w0, w1);
            let seen2 = &self.analyze.seen2;
            let clause = self.ca.clause_mut(cref);
            clause.retain_lits(|&l| seen2[l]);
            clause.mark_strengthened();
            debug_assert_eq!(clause.len(), tmp_size);
            self.drat.add_clause(self.ca.clause(cref).lits());
            self.drat.finalize_delete();
            debug!("OTF subsume: shrunk {:?} to {} lits", cref, tmp_size);
            self.analyze.otfs_long.push(cref);
        }
    }

    /// Self-subsumption minimization over the learnt clause.
    fn minimize_learnt(&mut self) {
        debug_assert!(self.analyze.to_clear.is_empty());
        let mut to_clear: Vec<Lit> = self.analyze.learnt[1..].to_vec();

        if self.opts.do_recursive_minim {
            self.recursive_minim();
        } else {
            self.basic_minim();
        }

        // `lit_redundant` parks extra marked literals in `to_clear`.
        to_clear.append(&mut self.analyze.to_clear);
        for lit in to_clear {
            self.analyze.seen[lit.var()] = false;
        }
        debug_assert!(self.analyze.seen.iter().all(|&x| !x));
    }

    /// A literal is droppable if its whole reason is already absorbed by
    /// the clause, transitively, within the levels the clause mentions.
    fn recursive_minim(&mut self) {
        let mut abstract_levels = 0u32;
        for i in 1..self.analyze.learnt.len() {
            abstract_levels |= self.abstract_level(self.analyze.learnt[i].var());
        }

        let mut learnt = mem::take(&mut self.analyze.learnt);
        let mut j = 1;
        for i in 1..learnt.len() {
            let lit = learnt[i];
            if self.assignment.reason(lit.var()).is_none() || !self.lit_redundant(lit, abstract_levels) {
                learnt[j] = lit;
                j += 1;
            }
        }
        learnt.truncate(j);
        self.analyze.learnt = learnt;
    }

    fn abstract_level(&self, var: Var) -> u32 {
        1u32 << (self.assignment.level(var) & 31)
    }

    fn lit_redundant(&mut self, lit: Lit, abstract_levels: u32) -> bool {
        debug_assert!(self.analyze.stack.is_empty());
        self.analyze.stack.push(lit);
        let top = self.analyze.to_clear.len();

        while let Some(p) = self.analyze.stack.pop() {
            let reason = self.assignment.reason(p.var()).expect("must have a reason");
            debug_assert!(self.analyze.antecedent.is_empty());
            match reason {
                Reason::Binary { other, .. } => self.analyze.antecedent.push(other),
                Reason::Long(cref) => {
                    let clause = self.ca.clause(cref);
                    self.analyze.antecedent.extend(clause.iter().skip(1).copied());
                }
            }

            let buf = mem::take(&mut self.analyze.antecedent);
            for &q in &buf {
                let var = q.var();
                if self.analyze.seen[var] || self.assignment.level(var) == 0 {
                    continue;
                }
                if self.assignment.reason(var).is_some()
                    && (self.abstract_level(var) & abstract_levels) != 0
                {
                    self.analyze.seen[var] = true;
                    self.analyze.stack.push(q);
                    self.analyze.to_clear.push(q);
                } else {
                    // Not redundant; roll back the marks made here.
                    for j in top..self.analyze.to_clear.len() {
                        let v = self.analyze.to_clear[j].var();
                        self.analyze.seen[v] = false;
                    }
                    self.analyze.to_clear.truncate(top);
                    self.analyze.stack.clear();
                    self.analyze.antecedent = {
                        let mut buf = buf;
                        buf.clear();
                        buf
                    };
                    return false;
                }
            }
            self.analyze.antecedent = {
                let mut buf = buf;
                buf.clear();
                buf
            };
        }

        true
    }

    /// One-step variant: keep the literal unless its entire reason is
    /// already seen.
    fn basic_minim(&mut self) {
        let mut learnt = mem::take(&mut self.analyze.learnt);
        let mut j = 1;
        'lits: for i in 1..learnt.len() {
            let lit = learnt[i];
            let Some(reason) = self.assignment.reason(lit.var()) else {
                learnt[j] = lit;
                j += 1;
                continue;
            };
            let redundant = match reason {
                Reason::Binary { other, .. } => {
                    self.analyze.seen[other.var()] || self.assignment.level(other.var()) == 0
                }
                Reason::Long(cref) => {
                    let clause = self.ca.clause(cref);
                    for &q in clause.iter().skip(1) {
                        if !self.analyze.seen[q.var()] && self.assignment.level(q.var()) > 0 {
                            learnt[j] = lit;
                            j += 1;
                            continue 'lits;
                        }
                    }
                    true
                }
            };
            if !redundant {
                learnt[j] = lit;
                j += 1;
            }
        }
        learnt.truncate(j);
        self.analyze.learnt = learnt;
    }

    /// Glucose-style minimization against the binary watches of the
    /// asserting literal's negation.
    fn watch_based_minim(&mut self) {
        if self.analyze.learnt.len() <= 1 {
            return;
        }
        self.analyze.var_stamp_counter += 1;
        let flag = self.analyze.var_stamp_counter;
        for i in 1..self.analyze.learnt.len() {
            let var = self.analyze.learnt[i].var();
            self.analyze.var_stamp[var] = flag;
        }

        // Binaries `head ∨ imp` let a true `imp` resolve `¬imp` away.
        let head = self.analyze.learnt[0];
        let mut removed = 0u32;
        let n_bins = self.watches.bins(head).len();
        for at in 0..n_bins {
            let w = self.watches.bins(head)[at];
            let imp = w.other;
            if self.analyze.var_stamp[imp.var()] == flag && self.assignment.value(imp) == LBool::True
            {
                removed += 1;
                self.analyze.var_stamp[imp.var()] = flag - 1;
            }
        }

        if removed > 0 {
            let var_stamp = &self.analyze.var_stamp;
            let before = self.analyze.learnt.len();
            let mut keep_head = true;
            self.analyze.learnt.retain(|l| {
                let first = keep_head;
                keep_head = false;
                first || var_stamp[l.var()] == flag
            });
            debug_assert_eq!(before - self.analyze.learnt.len(), removed as usize);
        }
    }

    /// Shrink an oversized learnt clause through the implication cache
    /// and the binary occurrences of its own literals.
    fn cache_and_binary_minim(&mut self) {
        for &lit in &self.analyze.learnt {
            self.analyze.lit_mark[lit] = true;
        }

        let scan = self.analyze.learnt.len().min(self.opts.max_num_lits_more_minim);

        // Cache pass: `¬lit → x` makes `¬x` droppable next to `lit`.
        for at in 0..scan {
            let lit = self.analyze.learnt[at];
            if !self.analyze.lit_mark[lit] {
                continue;
            }
            for at2 in 0..self.cache.implied_by(!lit).len() {
                let entry = self.cache.implied_by(!lit)[at2];
                let drop = !entry.lit;
                if self.analyze.lit_mark[drop] {
                    self.analyze.lit_mark[drop] = false;
                }
            }
        }

        // Binary pass: a clause `lit ∨ b` resolves `¬b` away.
        for at in 0..scan {
            let lit = self.analyze.learnt[at];
            if !self.analyze.lit_mark[lit] {
                continue;
            }
            for at2 in 0..self.watches.bins(lit).len() {
                let drop = !self.watches.bins(lit)[at2].other;
                if self.analyze.lit_mark[drop] {
                    self.analyze.lit_mark[drop] = false;
                }
            }
        }

        // The asserting literal stays no matter what.
        self.analyze.lit_mark[self.analyze.learnt[0]] = true;

        let lit_mark = &self.analyze.lit_mark;
        let before = self.analyze.learnt.len();
        self.analyze.learnt.retain(|&l| lit_mark[l]);
        if self.analyze.learnt.len() < before {
            debug!(
                "cache/binary minimization removed {} lits",
                before - self.analyze.learnt.len()
            );
        }

        // Survivors still carry their marks.
        let learnt = mem::take(&mut self.analyze.learnt);
        for &lit in &learnt {
            self.analyze.lit_mark[lit] = false;
        }
        self.analyze.learnt = learnt;
    }

    fn calc_glue_of_learnt(&mut self) -> u32 {
        let lits = mem::take(&mut self.analyze.learnt);
        let glue = self.calc_glue_of(&lits);
        self.analyze.learnt = lits;
        glue
    }

    fn calc_glue_of_clause(&mut self, cref: ClauseRef) -> u32 {
        let lits = self.ca.clause(cref).lits().to_vec();
        self.calc_glue_of(&lits)
    }

    /// Number of distinct decision levels among `lits`.
    fn calc_glue_of(&mut self, lits: &[Lit]) -> u32 {
        let levels = self.assignment.decision_level() as usize + 1;
        if self.analyze.level_stamp.len() < levels {
            self.analyze.level_stamp.resize(levels, 0);
        }
        self.analyze.level_stamp_counter += 1;
        let flag = self.analyze.level_stamp_counter;
        let mut glue = 0;
        for lit in lits {
            let level = self.assignment.level(lit.var()) as usize;
            if self.analyze.level_stamp[level] != flag {
                self.analyze.level_stamp[level] = flag;
                glue += 1;
            }
        }
        glue
    }

    /// Highest level among `learnt[1..]`; that literal moves to slot 1 so
    /// the clause watches correctly right after backtracking.
    fn find_backtrack_level(&mut self) -> u32 {
        let learnt = &mut self.analyze.learnt;
        if learnt.len() <= 1 {
            return 0;
        }
        let mut max_i = 1;
        for i in 2..learnt.len() {
            if self.assignment.level(learnt[i].var()) > self.assignment.level(learnt[max_i].var()) {
                max_i = i;
            }
        }
        learnt.swap(1, max_i);
        self.assignment.level(learnt[1].var())
    }

    fn bump_after_analyze(&mut self, backtrack_level: u32) {
        match self.var_order.branching() {
            Branching::Vsids => {
                let implied = mem::take(&mut self.analyze.implied_by_learnts);
                for &var in &implied {
                    if self.assignment.level(var) >= backtrack_level {
                        self.var_order.bump_vsids(var, 1.0);
                    }
                }
                self.analyze.implied_by_learnts = {
                    let mut v = implied;
                    v.clear();
                    v
                };
            }
            Branching::Maple => self.bump_almost_conflicted(),
        }
    }

    /// Variables adjacent to the learnt clause through reasons took part
    /// in the conflict too; give them a double participation credit.
    fn bump_almost_conflicted(&mut self) {
        const BUMP_BY: u32 = 2;
        debug_assert!(self.analyze.to_clear.is_empty());
        let head = self.analyze.learnt[0];
        self.analyze.seen[head.var()] = true;
        self.analyze.to_clear.push(head);

        for i in (0..self.analyze.learnt.len()).rev() {
            let var = self.analyze.learnt[i].var();
            match self.assignment.reason(var) {
                Some(Reason::Long(cref)) => {
                    debug_assert!(self.analyze.antecedent.is_empty());
                    let clause = self.ca.clause(cref);
                    self.analyze.antecedent.extend(clause.iter().copied());
                    let buf = mem::take(&mut self.analyze.antecedent);
                    for &l in &buf {
                        if !self.analyze.seen[l.var()] {
                            self.analyze.seen[l.var()] = true;
                            self.analyze.to_clear.push(l);
                            self.assignment.var_data[l.var()].conflicted += BUMP_BY;
                        }
                    }
                    self.analyze.antecedent = {
                        let mut buf = buf;
                        buf.clear();
                        buf
                    };
                }
                Some(Reason::Binary { other, .. }) => {
                    for l in [other, Lit::positive(var)] {
                        if !self.analyze.seen[l.var()] {
                            self.analyze.seen[l.var()] = true;
                            self.analyze.to_clear.push(l);
                            self.assignment.var_data[l.var()].conflicted += BUMP_BY;
                        }
                    }
                }
                None => {}
            }
        }

        for lit in mem::take(&mut self.analyze.to_clear) {
            self.analyze.seen[lit.var()] = false;
        }
    }

    /// Final check whether the last resolved clause can absorb the learnt
    /// clause instead of a fresh allocation.
    fn last_resolved_subsumed(&mut self, last_resolved: Option<ClauseRef>) -> Option<ClauseRef> {
        if !self.opts.do_otf_subsume {
            return None;
        }
        let cref = last_resolved?;
        if self.analyze.learnt.len() <= 2 {
            return None;
        }
        // A clause already shrunk this round is spoken for.
        if self.analyze.otfs_long.contains(&cref) {
            return None;
        }
        let clause = self.ca.clause(cref);
        if clause.is_deleted() || clause.len() <= self.analyze.learnt.len() {
            return None;
        }

        // Subset test via literal marks.
        for &l in clause.iter() {
            self.analyze.lit_mark[l] = true;
        }
        let subset = self.analyze.learnt.iter().all(|&l| self.analyze.lit_mark[l]);
        let clause = self.ca.clause(cref);
        for i in 0..clause.len() {
            let l = clause[i];
            self.analyze.lit_mark[l] = false;
        }
        subset.then_some(cref)
    }

    /// Walk back from a falsified assumption to the set of assumptions
    /// that jointly derived the conflict; `self.conflict` receives the
    /// core as assumption literals.
    pub(crate) fn analyze_final(&mut self, failed_assumption: Lit) {
        debug_assert_eq!(self.assignment.value(failed_assumption), LBool::False);
        self.conflict.clear();
        self.conflict.push(failed_assumption);

        // Falsified at level 0 means the formula alone refutes it.
        if self.assignment.decision_level() == 0
            || self.assignment.level(failed_assumption.var()) == 0
        {
            return;
        }

        self.analyze.seen[failed_assumption.var()] = true;

        let bottom = self.assignment.trail_lim[0];
        for i in (bottom..self.assignment.trail.len()).rev() {
            let lit = self.assignment.trail[i];
            let var = lit.var();
            if !self.analyze.seen[var] {
                continue;
            }
            match self.assignment.reason(var) {
                None => {
                    debug_assert!(self.assignment.level(var) > 0);
                    // An assumption decision in the derivation.
                    self.conflict.push(lit);
                }
                Some(Reason::Binary { other, .. }) => {
                    if self.assignment.level(other.var()) > 0 {
                        self.analyze.seen[other.var()] = true;
                    }
                }
                Some(Reason::Long(cref)) => {
                    debug_assert!(self.analyze.antecedent.is_empty());
                    let clause = self.ca.clause(cref);
                    self.analyze.antecedent.extend(clause.iter().copied());
                    let buf = mem::take(&mut self.analyze.antecedent);
                    for &l in &buf {
                        if self.assignment.level(l.var()) > 0 {
                            self.analyze.seen[l.var()] = true;
                        }
                    }
                    self.analyze.antecedent = {
                        let mut buf = buf;
                        buf.clear();
                        buf
                    };
                }
            }
            self.analyze.seen[var] = false;
        }
        self.analyze.seen[failed_assumption.var()] = false;
        debug_assert!(self.analyze.seen.iter().all(|&x| !x));
    }
}
