use std::borrow::Cow;

use tracing::debug;

use crate::assignment::{Assignment, Reason};
use crate::clause::Tier;
use crate::clause_allocator::{ClauseAllocator, ClauseRemap};
use crate::cref::ClauseRef;
use crate::drat::DratSink;
use crate::lit::Lit;
use crate::options::Options;

/// Long-clause bookkeeping: the irredundant list plus one list per learnt
/// tier, clause activity, and the reduction cadences.
///
/// Tier membership of record is `stats.tier` on the clause; re-analysis
/// may improve it (never worsen it), and the lists are re-bucketed at the
/// start of every reduction.
#[derive(Debug)]
pub struct ClauseDatabase {
    pub long_irred: Vec<ClauseRef>,
    pub long_red: [Vec<ClauseRef>; 4],
    pub num_bin_irred: u64,
    pub num_bin_red: u64,

    cla_inc: f64,
    cla_decay: f64,

    next_tier1_reduce: u64,
    next_tier2_reduce: u64,
    cur_max_tier2: usize,
}

const DEFAULT_CLA_DECAY: f64 = 0.999;

impl ClauseDatabase {
    pub fn new(opts: &Options) -> Self {
        Self {
            long_irred: Vec::new(),
            long_red: Default::default(),
            num_bin_irred: 0,
            num_bin_red: 0,
            cla_inc: 1.0,
            cla_decay: DEFAULT_CLA_DECAY,
            next_tier1_reduce: opts.every_tier1_reduce,
            next_tier2_reduce: opts.every_tier2_reduce,
            cur_max_tier2: opts.max_tier2_clauses,
        }
    }

    pub fn num_long_irred(&self) -> usize {
        self.long_irred.len()
    }
    pub fn num_long_red(&self) -> usize {
        self.long_red.iter().map(Vec::len).sum()
    }

    /// Birth tier from glue. Tier 3 is predictor territory and no
    /// predictor is wired in, so nothing is born there.
    pub fn tier_for_glue(&self, glue: u32, opts: &Options) -> Tier {
        if glue <= opts.glue_tier0_if_below_or_eq {
            Tier::T0
        } else if opts.glue_tier1_if_below_or_eq != 0 && glue <= opts.glue_tier1_if_below_or_eq {
            Tier::T1
        } else {
            Tier::T2
        }
    }

    pub fn add_long_irred<'a, L>(&mut self, lits: L, ca: &mut ClauseAllocator) -> ClauseRef
    where
        L: Into<Cow<'a, [Lit]>>,
    {
        let cref = ca.alloc(lits.into().into_owned());
        self.long_irred.push(cref);
        cref
    }

    pub fn add_long_learnt<'a, L>(
        &mut self,
        lits: L,
        glue: u32,
        sum_conflicts: u64,
        opts: &Options,
        ca: &mut ClauseAllocator,
    ) -> ClauseRef
    where
        L: Into<Cow<'a, [Lit]>>,
    {
        let cref = ca.alloc(lits.into().into_owned());
        let tier = self.tier_for_glue(glue, opts);
        let clause = ca.clause_mut(cref);
        clause.make_red(glue);
        clause.stats.tier = tier;
        clause.stats.introduced_at_conflict = sum_conflicts;
        clause.stats.last_touched = sum_conflicts;
        self.long_red[tier as usize].push(cref);
        cref
    }

    /// Register an already-configured redundant clause (state restore).
    pub fn register_red(&mut self, cref: ClauseRef, tier: Tier) {
        self.long_red[tier as usize].push(cref);
    }

    pub fn decay_activity(&mut self) {
        self.cla_inc *= 1.0 / self.cla_decay;
    }

    pub fn bump_activity(&mut self, cref: ClauseRef, ca: &mut ClauseAllocator) {
        let clause = ca.clause_mut(cref);
        if !clause.is_red() {
            return;
        }
        clause.stats.activity += self.cla_inc;

        if clause.stats.activity > 1e20 {
            self.cla_inc *= 1e-20;
            for tier in &self.long_red {
                for &c in tier {
                    ca.clause_mut(c).stats.activity *= 1e-20;
                }
            }
        }
    }

    /// Move every clause into the list its `stats.tier` says it belongs
    /// to (promotions recorded by re-analysis), dropping deleted entries.
    fn rebucket(&mut self, ca: &ClauseAllocator) {
        let mut moved: Vec<(ClauseRef, Tier)> = Vec::new();
        for tier in Tier::ALL {
            self.long_red[tier as usize].retain(|&cref| {
                let clause = ca.clause(cref);
                if clause.is_deleted() {
                    return false;
                }
                if clause.stats.tier != tier {
                    moved.push((cref, clause.stats.tier));
                    return false;
                }
                true
            });
        }
        for (cref, tier) in moved {
            self.long_red[tier as usize].push(cref);
        }
    }

    fn is_reason(assignment: &Assignment, ca: &ClauseAllocator, cref: ClauseRef) -> bool {
        let first = ca.clause(cref)[0];
        assignment.reason(first.var()) == Some(Reason::Long(cref))
    }

    /// Run whichever reductions are due. Returns true if any clause was
    /// freed (the caller then consolidates the arena).
    pub fn reduce_if_needed(
        &mut self,
        sum_conflicts: u64,
        assignment: &Assignment,
        ca: &mut ClauseAllocator,
        drat: &mut dyn DratSink,
        opts: &Options,
    ) -> bool {
        let mut freed = false;

        if opts.every_tier1_reduce != 0 && sum_conflicts >= self.next_tier1_reduce {
            self.rebucket(ca);
            freed |= self.reduce_tier1(sum_conflicts, assignment, ca, drat, opts);
            self.next_tier1_reduce = sum_conflicts + opts.every_tier1_reduce;
        }

        // Tiers 2 and 3 share a policy; tier 3 is predictor-managed and
        // degrades to the tier-2 treatment when no predictor is present.
        let tier2_due = if opts.every_tier2_reduce != 0 {
            sum_conflicts >= self.next_tier2_reduce
        } else {
            self.long_red[Tier::T2 as usize].len() > self.cur_max_tier2
        };
        if tier2_due {
            self.rebucket(ca);
            for tier in [Tier::T2, Tier::T3] {
                freed |= self.reduce_temporary(tier, assignment, ca, drat, opts);
            }
            if opts.every_tier2_reduce != 0 {
                self.next_tier2_reduce = sum_conflicts + opts.every_tier2_reduce;
            } else {
                self.cur_max_tier2 =
                    (self.cur_max_tier2 as f64 * opts.inc_max_tier2_clauses) as usize;
            }
        }

        freed
    }

    /// Tier-1 bulk reduction: clauses that have not resolved in a conflict
    /// for a long stretch are dropped; glue improvements promote instead.
    fn reduce_tier1(
        &mut self,
        sum_conflicts: u64,
        assignment: &Assignment,
        ca: &mut ClauseAllocator,
        drat: &mut dyn DratSink,
        opts: &Options,
    ) -> bool {
        let before = self.long_red[Tier::T1 as usize].len();
        let mut list = std::mem::take(&mut self.long_red[Tier::T1 as usize]);
        list.retain(|&cref| {
            if Self::is_reason(assignment, ca, cref) {
                return true;
            }
            let clause = ca.clause(cref);
            if clause.stats.last_touched + opts.must_touch_tier1_within >= sum_conflicts {
                return true;
            }
            drat.delete_clause(clause.lits());
            ca.free(cref);
            false
        });
        let removed = before - list.len();
        self.long_red[Tier::T1 as usize] = list;
        debug!("tier1 reduce removed {} of {}", removed, before);
        removed > 0
    }

    /// Temporary-tier reduction: order by survival score and keep the
    /// configured fraction; reasons are always kept.
    fn reduce_temporary(
        &mut self,
        tier: Tier,
        assignment: &Assignment,
        ca: &mut ClauseAllocator,
        drat: &mut dyn DratSink,
        opts: &Options,
    ) -> bool {
        let mut list = std::mem::take(&mut self.long_red[tier as usize]);
        let before = list.len();
        if before == 0 {
            return false;
        }

        // Best survivors first: activity, then recency, then handle order
        // for a deterministic total order.
        list.sort_by(|&a, &b| {
            let x = ca.clause(a);
            let y = ca.clause(b);
            y.stats
                .activity
                .total_cmp(&x.stats.activity)
                .then(y.stats.last_touched.cmp(&x.stats.last_touched))
                .then(a.index().cmp(&b.index()))
        });

        let keep_limit = (before as f64 * opts.tier2_keep_ratio) as usize;
        let mut kept = 0usize;
        list.retain(|&cref| {
            if Self::is_reason(assignment, ca, cref) {
                kept += 1;
                return true;
            }
            if kept < keep_limit {
                kept += 1;
                return true;
            }
            let clause = ca.clause(cref);
            drat.delete_clause(clause.lits());
            ca.free(cref);
            false
        });

        let removed = before - list.len();
        self.long_red[tier as usize] = list;
        debug!("{:?} reduce removed {} of {}", tier, removed, before);
        removed > 0
    }

    /// Rewrite every stored handle after arena consolidation.
    pub fn remap(&mut self, remap: &ClauseRemap) {
        for cref in self.long_irred.iter_mut() {
            *cref = remap.translate(*cref);
        }
        for tier in self.long_red.iter_mut() {
            for cref in tier.iter_mut() {
                *cref = remap.translate(*cref);
            }
        }
    }

    /// Drop deleted handles without consolidating (used by level-0 cleaning).
    pub fn drop_deleted(&mut self, ca: &ClauseAllocator) {
        self.long_irred.retain(|&c| !ca.clause(c).is_deleted());
        for tier in self.long_red.iter_mut() {
            tier.retain(|&c| !ca.clause(c).is_deleted());
        }
    }
}
