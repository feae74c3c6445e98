use std::mem;

use tracing::{debug, trace};

use crate::assignment::Reason;
use crate::cref::ClauseRef;
use crate::idx::VarVec;
use crate::lbool::LBool;
use crate::lit::Lit;
use crate::solver::Solver;
use crate::watch::{BinWatch, LongWatch};

/// The clause that falsified the trail, reported by the propagator.
#[derive(Debug, Copy, Clone)]
pub enum Conflict {
    /// A binary clause `a ∨ b` with both literals false. `a` is the
    /// literal whose negation was being propagated.
    Binary { a: Lit, b: Lit },
    Long(ClauseRef),
}

/// Implication bookkeeping for one probing pass: a spanning tree of the
/// propagation rooted at the probe literal, plus the binaries it proved
/// addable (hyper-binary resolvents) or removable (transitive reduction).
#[derive(Debug)]
pub struct ProbeTree {
    pub root: Lit,
    parent: VarVec<Option<Lit>>,
    touched: Vec<Lit>,
    pub pending_bins: Vec<(Lit, Lit)>,
    pub useless_bins: Vec<(Lit, Lit, bool)>,
    /// Work units consumed: one per visited watch plus a surcharge per
    /// tree-walk step and per recorded binary.
    pub bogo: u64,
}

impl Default for ProbeTree {
    fn default() -> Self {
        Self {
            root: Lit::UNDEF,
            parent: VarVec::new(),
            touched: Vec::new(),
            pending_bins: Vec::new(),
            useless_bins: Vec::new(),
            bogo: 0,
        }
    }
}

impl ProbeTree {
    pub fn push_var(&mut self) {
        self.parent.push(None);
    }

    pub fn begin_pass(&mut self, root: Lit) {
        debug_assert!(self.touched.is_empty());
        self.root = root;
        self.pending_bins.clear();
        self.useless_bins.clear();
    }

    pub fn end_pass(&mut self) {
        for lit in self.touched.drain(..) {
            self.parent[lit.var()] = None;
        }
    }

    fn set_parent(&mut self, lit: Lit, from: Lit) {
        self.parent[lit.var()] = Some(from);
        self.touched.push(lit);
    }

    /// Is `ancestor` on the tree path from `lit` back to the root?
    fn on_chain(&mut self, lit: Lit, ancestor: Lit) -> bool {
        let mut cur = self.parent[lit.var()];
        while let Some(q) = cur {
            self.bogo += 1;
            if q == ancestor {
                return true;
            }
            cur = self.parent[q.var()];
        }
        false
    }
}

impl Solver {
    /// Unit propagation to saturation. Binary watches are visited before
    /// the long block of each literal. Deterministic given trail and
    /// watch order; the blocker cache and slot-1 normalization change
    /// only the inspection order, never the set of detected conflicts.
    pub(crate) fn propagate(&mut self) -> Option<Conflict> {
        let mut conflict = None;

        'queue: while let Some(p) = self.assignment.dequeue() {
            self.sum_propagations += 1;
            let false_lit = !p;

            // Binary block.
            let n_bins = self.watches.bins(false_lit).len();
            for at in 0..n_bins {
                let BinWatch { other, red } = self.watches.bins(false_lit)[at];
                match self.assignment.value(other) {
                    LBool::True => {}
                    LBool::Undef => {
                        self.assignment
                            .unchecked_enqueue(other, Some(Reason::Binary { other: false_lit, red }));
                    }
                    LBool::False => {
                        debug!("binary conflict: {:?} {:?}", false_lit, other);
                        conflict = Some(Conflict::Binary { a: false_lit, b: other });
                        self.assignment.qhead = self.assignment.trail.len();
                        break 'queue;
                    }
                }
            }

            conflict = self.propagate_longs_of(false_lit);
            if conflict.is_some() {
                break;
            }
        }

        conflict
    }

    fn propagate_longs_of(&mut self, false_lit: Lit) -> Option<Conflict> {
        let mut conflict = None;
        let mut longs = mem::take(self.watches.longs_mut(false_lit));

        let mut i = 0;
        let mut j = 0;
        'watches: while i < longs.len() {
            let LongWatch { blocker, cref } = longs[i];
            i += 1;

            // Watches of freed clauses are dropped lazily.
            if self.ca.clause(cref).is_deleted() {
                continue;
            }

            if self.assignment.value(blocker) == LBool::True {
                longs[j] = LongWatch { blocker, cref };
                j += 1;
                continue;
            }

            // Normalize: the falsified watch sits in slot 1.
            let clause = self.ca.clause_mut(cref);
            if clause[0] == false_lit {
                clause.swap(0, 1);
            }
            debug_assert_eq!(clause[1], false_lit);

            let first = clause[0];
            if first != blocker && self.assignment.value(first) == LBool::True {
                longs[j] = LongWatch { blocker: first, cref };
                j += 1;
                continue;
            }

            // Look for a replacement watch.
            for k in 2..clause.len() {
                let other = clause[k];
                if self.assignment.value(other) != LBool::False {
                    clause.swap(1, k);
                    self.watches.longs_mut(other).push(LongWatch { blocker: first, cref });
                    continue 'watches;
                }
            }

            // Clause is unit or falsified under the trail.
            longs[j] = LongWatch { blocker: first, cref };
            j += 1;
            match self.assignment.value(first) {
                LBool::Undef => {
                    trace!("propagated {:?} by {:?}", first, cref);
                    self.assignment.unchecked_enqueue(first, Some(Reason::Long(cref)));
                }
                LBool::False => {
                    debug!("long conflict: {:?}", cref);
                    conflict = Some(Conflict::Long(cref));
                    self.assignment.qhead = self.assignment.trail.len();
                    while i < longs.len() {
                        longs[j] = longs[i];
                        j += 1;
                        i += 1;
                    }
                }
                LBool::True => unreachable!(),
            }
            if conflict.is_some() {
                break;
            }
        }

        longs.truncate(j);
        debug_assert!(self.watches.longs(false_lit).is_empty());
        *self.watches.longs_mut(false_lit) = longs;
        conflict
    }

    /// Probing propagator: same saturation loop, but it maintains the
    /// implication tree of the pass, performs on-the-fly hyper-binary
    /// resolution for long-clause propagations, and flags binaries made
    /// redundant by another tree path (transitive reduction candidates).
    pub(crate) fn propagate_probe(&mut self, tree: &mut ProbeTree) -> Option<Conflict> {
        let do_hyper = self.opts.do_hyper_bin;
        let do_tred = self.opts.do_trans_red;
        let mut conflict = None;

        'queue: while let Some(p) = self.assignment.dequeue() {
            self.sum_propagations += 1;
            let false_lit = !p;

            let n_bins = self.watches.bins(false_lit).len();
            for at in 0..n_bins {
                tree.bogo += 1;
                let BinWatch { other, red } = self.watches.bins(false_lit)[at];
                match self.assignment.value(other) {
                    LBool::True => {
                        // `other` was reached some other way; if that way
                        // already passes through `p`, this edge is
                        // transitively redundant.
                        if do_tred
                            && self.assignment.level(other.var()) > 0
                            && tree.parent[other.var()] != Some(p)
                            && tree.on_chain(other, p)
                        {
                            tree.bogo += 2;
                            tree.useless_bins.push((false_lit, other, red));
                        }
                    }
                    LBool::Undef => {
                        self.assignment
                            .unchecked_enqueue(other, Some(Reason::Binary { other: false_lit, red }));
                        tree.set_parent(other, p);
                    }
                    LBool::False => {
                        conflict = Some(Conflict::Binary { a: false_lit, b: other });
                        self.assignment.qhead = self.assignment.trail.len();
                        break 'queue;
                    }
                }
            }

            conflict = self.propagate_probe_longs_of(false_lit, tree, do_hyper);
            if conflict.is_some() {
                break;
            }
        }

        conflict
    }

    fn propagate_probe_longs_of(
        &mut self,
        false_lit: Lit,
        tree: &mut ProbeTree,
        do_hyper: bool,
    ) -> Option<Conflict> {
        let mut conflict = None;
        let mut longs = mem::take(self.watches.longs_mut(false_lit));

        let mut i = 0;
        let mut j = 0;
        'watches: while i < longs.len() {
            tree.bogo += 1;
            let LongWatch { blocker, cref } = longs[i];
            i += 1;

            if self.ca.clause(cref).is_deleted() {
                continue;
            }
            if self.assignment.value(blocker) == LBool::True {
                longs[j] = LongWatch { blocker, cref };
                j += 1;
                continue;
            }

            let clause = self.ca.clause_mut(cref);
            if clause[0] == false_lit {
                clause.swap(0, 1);
            }
            let first = clause[0];
            if first != blocker && self.assignment.value(first) == LBool::True {
                longs[j] = LongWatch { blocker: first, cref };
                j += 1;
                continue;
            }

            for k in 2..clause.len() {
                let other = clause[k];
                if self.assignment.value(other) != LBool::False {
                    clause.swap(1, k);
                    self.watches.longs_mut(other).push(LongWatch { blocker: first, cref });
                    continue 'watches;
                }
            }

            longs[j] = LongWatch { blocker: first, cref };
            j += 1;
            match self.assignment.value(first) {
                LBool::Undef => {
                    // Every falsified literal descends from the probe
                    // decision, so the probe literal dominates this
                    // propagation: resolve the chain into one binary.
                    let root = tree.root;
                    if do_hyper && self.assignment.decision_level() > 0 {
                        tree.bogo += 2;
                        if !self.watches.contains_bin(!root, first) {
                            tree.pending_bins.push((!root, first));
                        }
                        self.assignment
                            .unchecked_enqueue(first, Some(Reason::Binary { other: !root, red: true }));
                    } else {
                        self.assignment.unchecked_enqueue(first, Some(Reason::Long(cref)));
                    }
                    tree.set_parent(first, root);
                }
                LBool::False => {
                    conflict = Some(Conflict::Long(cref));
                    self.assignment.qhead = self.assignment.trail.len();
                    while i < longs.len() {
                        longs[j] = longs[i];
                        j += 1;
                        i += 1;
                    }
                }
                LBool::True => unreachable!(),
            }
            if conflict.is_some() {
                break;
            }
        }

        longs.truncate(j);
        *self.watches.longs_mut(false_lit) = longs;
        conflict
    }
}
