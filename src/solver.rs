use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use itertools::Itertools;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info};

use crate::analyze::AnalyzeTmp;
use crate::assignment::{Assignment, Reason};
use crate::clause::Tier;
use crate::clause_allocator::ClauseAllocator;
use crate::clause_database::ClauseDatabase;
use crate::cref::ClauseRef;
use crate::datasync::{DataSync, NoSync};
use crate::drat::{DratSink, NoDrat};
use crate::history::SearchHistory;
use crate::implcache::ImplCache;
use crate::lbool::LBool;
use crate::lit::Lit;
use crate::options::{Branching, Options, RestartMode};
use crate::probe::ProbeStats;
use crate::propagate::{Conflict, ProbeTree};
use crate::restart::RestartState;
use crate::utils::{parse_dimacs, DisplaySlice};
use crate::var::{Removed, Var};
use crate::var_order::VarOrder;
use crate::watch::WatchList;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub enum SolveResult {
    Sat,
    Unsat,
    Unknown,
}

/// Per-`solve`-call limits and the stop latch of the running phase.
#[derive(Debug, Default)]
pub(crate) struct SearchParams {
    pub stop: bool,
    pub conflicts_this_phase: u64,
    pub confl_at_call_start: u64,
    pub max_confl_this_call: u64,
}

/// CDCL search engine with assumptions, tiered learnt-clause database,
/// and failed-literal probing.
pub struct Solver {
    pub(crate) opts: Options,
    pub(crate) ca: ClauseAllocator,
    pub(crate) db: ClauseDatabase,
    pub(crate) watches: WatchList,
    pub(crate) assignment: Assignment,
    pub(crate) var_order: VarOrder,
    pub(crate) restart: RestartState,
    pub(crate) hist: SearchHistory,
    pub(crate) analyze: AnalyzeTmp,
    pub(crate) cache: ImplCache,
    pub(crate) probe_tree: ProbeTree,
    pub(crate) probe_stats: ProbeStats,
    pub(crate) drat: Box<dyn DratSink>,
    pub(crate) datasync: Box<dyn DataSync>,
    pub(crate) rng: StdRng,

    pub(crate) ok: bool,
    next_var: u32,
    assumptions: Vec<Lit>,
    pub(crate) conflict: Vec<Lit>,
    model: Vec<LBool>,
    must_interrupt: Arc<AtomicBool>,
    start_time: Instant,
    poll_tick: u32,

    // Statistics:
    pub(crate) sum_conflicts: u64,
    sum_decisions: u64,
    pub(crate) sum_propagations: u64,
    sum_restarts: u64,
    sum_reduces: u64,
    learnt_units: u64,
    learnt_bins: u64,
    learnt_longs: u64,

    last_clean_marker: usize,
    pub(crate) next_probe: u64,
    tier0_cut_adjusted: bool,

    pub(crate) params: SearchParams,
}

enum Decision {
    Made,
    Sat,
    AssumpConflict,
}

impl Solver {
    pub fn new(opts: Options) -> Self {
        let rng = StdRng::seed_from_u64(opts.seed);
        Self {
            ca: ClauseAllocator::new(),
            db: ClauseDatabase::new(&opts),
            watches: WatchList::new(),
            assignment: Assignment::new(),
            var_order: VarOrder::new(&opts),
            restart: RestartState::new(&opts),
            hist: SearchHistory::new(opts.short_history_size, opts.blocking_restart_trail_window),
            analyze: AnalyzeTmp::default(),
            cache: ImplCache::new(1000),
            probe_tree: ProbeTree::default(),
            probe_stats: ProbeStats::default(),
            drat: Box::new(NoDrat),
            datasync: Box::new(NoSync),
            rng,
            ok: true,
            next_var: 0,
            assumptions: Vec::new(),
            conflict: Vec::new(),
            model: Vec::new(),
            must_interrupt: Arc::new(AtomicBool::new(false)),
            start_time: Instant::now(),
            poll_tick: 0,
            sum_conflicts: 0,
            sum_decisions: 0,
            sum_propagations: 0,
            sum_restarts: 0,
            sum_reduces: 0,
            learnt_units: 0,
            learnt_bins: 0,
            learnt_longs: 0,
            last_clean_marker: 0,
            next_probe: 0,
            tier0_cut_adjusted: false,
            params: SearchParams::default(),
            opts,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut solver = Self::new(Options::default());
        for lits in parse_dimacs(path)? {
            solver.add_clause(&lits);
        }
        Ok(solver)
    }

    pub fn set_drat(&mut self, drat: Box<dyn DratSink>) {
        self.drat = drat;
    }
    pub fn set_datasync(&mut self, datasync: Box<dyn DataSync>) {
        self.datasync = datasync;
    }

    /// Flag polled during search; setting it makes the engine finish the
    /// current conflict, roll back to level 0, and return `Unknown`.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.must_interrupt)
    }

    pub fn ok(&self) -> bool {
        self.ok
    }
    pub fn num_vars(&self) -> usize {
        self.next_var as usize
    }
    pub fn num_long_clauses(&self) -> usize {
        self.db.num_long_irred()
    }
    pub fn num_learnts(&self) -> usize {
        self.db.num_long_red()
    }
    pub fn num_bin_irred(&self) -> u64 {
        self.db.num_bin_irred
    }
    pub fn num_bin_red(&self) -> u64 {
        self.db.num_bin_red
    }
    pub fn num_decisions(&self) -> u64 {
        self.sum_decisions
    }
    pub fn num_propagations(&self) -> u64 {
        self.sum_propagations
    }
    pub fn num_conflicts(&self) -> u64 {
        self.sum_conflicts
    }
    pub fn num_restarts(&self) -> u64 {
        self.sum_restarts
    }
    pub fn num_reduces(&self) -> u64 {
        self.sum_reduces
    }
    /// Learnt clauses by shape: units, implicit binaries, long clauses.
    pub fn num_learnt_kinds(&self) -> (u64, u64, u64) {
        (self.learnt_units, self.learnt_bins, self.learnt_longs)
    }

    pub fn new_variable(&mut self) -> Var {
        let var = Var::new(self.next_var);
        self.next_var += 1;

        self.watches.init(var);
        self.assignment.push_var();
        self.var_order.push_var();
        self.var_order.insert(var);
        self.analyze.push_var();
        self.cache.init(var);
        self.probe_tree.push_var();

        var
    }

    pub fn value(&self, lit: Lit) -> LBool {
        self.assignment.value(lit)
    }
    pub fn value_var(&self, var: Var) -> LBool {
        self.assignment.value_var(var)
    }

    /// The satisfying assignment; valid after `solve` returned `Sat`.
    pub fn model(&self) -> &[LBool] {
        &self.model
    }
    pub fn model_value(&self, lit: Lit) -> LBool {
        self.model[lit.var().index()] ^ lit.sign()
    }

    /// After `Unsat` under assumptions: the subset of the assumptions
    /// whose conjunction is already unsatisfiable with the formula.
    pub fn final_conflict(&self) -> &[Lit] {
        &self.conflict
    }

    pub fn set_assumptions(&mut self, assumptions: &[Lit]) {
        if let Some(max_var) = assumptions.iter().map(|lit| lit.var().inner() + 1).max() {
            while self.next_var < max_var {
                self.new_variable();
            }
        }
        self.assumptions = assumptions.to_vec();
    }

    /// Add a clause of the input formula. Returns false iff the solver
    /// is already in the latched unsatisfiable state.
    pub fn add_clause(&mut self, lits: &[Lit]) -> bool {
        if !self.ok {
            return false;
        }
        if self.assignment.decision_level() > 0 {
            self.cancel_until(0);
        }

        // Auto-create missing variables.
        if let Some(max_var) = lits.iter().map(|lit| lit.var().inner() + 1).max() {
            while self.next_var < max_var {
                self.new_variable();
            }
        }

        // Normalize: sort, dedup, drop tautologies and false unit context.
        let mut lits = lits.to_vec();
        lits.sort();
        lits.dedup();
        for pair in lits.windows(2) {
            if pair[0].var() == pair[1].var() {
                return true; // tautology: x ∨ ¬x
            }
        }
        if lits.iter().any(|&l| self.assignment.fixed(l) == LBool::True) {
            return true;
        }
        lits.retain(|&l| self.assignment.fixed(l) != LBool::False);

        match lits.len() {
            0 => {
                info!("empty clause on input");
                self.ok = false;
            }
            1 => {
                if self.assignment.enqueue(lits[0], None) {
                    if self.propagate().is_some() {
                        self.ok = false;
                    }
                } else {
                    self.ok = false;
                }
            }
            2 => {
                self.watches.attach_bin(lits[0], lits[1], false);
                self.db.num_bin_irred += 1;
            }
            _ => {
                let cref = self.db.add_long_irred(&lits[..], &mut self.ca);
                self.attach_long(cref);
            }
        }
        self.ok
    }

    pub(crate) fn attach_long(&mut self, cref: ClauseRef) {
        let clause = self.ca.clause(cref);
        debug_assert!(clause.len() >= 3);
        let a = clause[0];
        let b = clause[1];
        self.watches.attach_long(cref, a, b);
    }

    fn report(&self, stage: &str) {
        info!(
            "{} lvl={} rst={} red={} dec={} prp={} cfl={} lrn={} cls={} vrs={}",
            stage,
            self.assignment.decision_level(),
            self.sum_restarts,
            self.sum_reduces,
            self.sum_decisions,
            self.sum_propagations,
            self.sum_conflicts,
            self.num_learnts(),
            self.num_long_clauses(),
            self.num_vars(),
        );
    }

    /// Solve under the installed assumptions, up to `max_confls`
    /// conflicts (0 = unbounded).
    pub fn solve(&mut self, max_confls: u64) -> SolveResult {
        if !self.ok {
            self.conflict.clear();
            return SolveResult::Unsat;
        }
        self.start_time = Instant::now();
        self.conflict.clear();
        if self.assignment.decision_level() > 0 {
            self.cancel_until(0);
        }
        debug_assert!(self.assignment.prop_at_head());

        self.params = SearchParams {
            stop: false,
            conflicts_this_phase: 0,
            confl_at_call_start: self.sum_conflicts,
            max_confl_this_call: if max_confls == 0 { u64::MAX } else { max_confls },
        };
        self.restart.setup(&self.opts);
        self.fill_assumption_marks();

        if self.opts.do_probe && self.sum_conflicts >= self.next_probe {
            if !self.probe() {
                let status = SolveResult::Unsat;
                self.finish_up(status);
                return status;
            }
            self.next_probe = self.sum_conflicts + self.opts.probe_interval;
        }

        let mut status = None;
        while status.is_none() {
            if self.spent_conflicts() >= self.params.max_confl_this_call
                || self.over_time_limit()
                || self.must_interrupt.load(Ordering::Relaxed)
            {
                status = Some(SolveResult::Unknown);
                break;
            }
            self.params.stop = false;
            self.params.conflicts_this_phase = 0;
            status = self.search();
            if status.is_none() {
                self.sum_restarts += 1;
                self.restart.next_phase(self.params.conflicts_this_phase, &self.opts);
                self.report("restart");

                // The prober rides the restart boundary on its own cadence.
                if self.opts.do_probe && self.sum_conflicts >= self.next_probe {
                    if !self.probe() {
                        status = Some(SolveResult::Unsat);
                    }
                    self.next_probe = self.sum_conflicts + self.opts.probe_interval;
                }
            }
        }

        let status = status.unwrap();
        self.finish_up(status);
        status
    }

    fn spent_conflicts(&self) -> u64 {
        self.sum_conflicts - self.params.confl_at_call_start
    }

    fn over_time_limit(&self) -> bool {
        match self.opts.max_time_secs {
            Some(secs) => self.start_time.elapsed() > Duration::from_secs_f64(secs),
            None => false,
        }
    }

    fn finish_up(&mut self, status: SolveResult) {
        match status {
            SolveResult::Sat => {
                self.model = (0..self.num_vars())
                    .map(|v| self.assignment.value_var(Var::new(v as u32)))
                    .collect();
            }
            SolveResult::Unsat => {
                if self.conflict.is_empty() {
                    self.ok = false;
                }
            }
            SolveResult::Unknown => {}
        }
        self.cancel_until(0);
        self.unfill_assumption_marks();
        let _ = self.drat.flush();
        debug!("solve finished: {:?} at {} conflicts", status, self.sum_conflicts);
    }

    /// One restart phase of the CDCL loop.
    fn search(&mut self) -> Option<SolveResult> {
        debug_assert!(self.ok);
        self.hist.reset_short();
        self.restart.blocked = false;

        loop {
            if self.params.stop {
                break;
            }

            let confl = self.propagate();
            // Propagation reached a fixpoint: cooperative yield point.
            self.poll_for_stop();

            if let Some(confl) = confl {
                self.sum_conflicts += 1;
                self.params.conflicts_this_phase += 1;
                self.assignment.now = self.sum_conflicts;
                self.hist.trail_depth.push(self.assignment.num_assigned() as u32);

                if self.assignment.decision_level() == 0 {
                    info!("UNSAT: conflict at level 0");
                    self.conflict.clear();
                    return Some(SolveResult::Unsat);
                }

                // A noticed interrupt still finishes the current conflict.
                self.adjust_heuristic_parameters();
                self.handle_conflict(confl);
                self.check_need_restart();
            } else {
                if self.params.stop {
                    break;
                }
                if self.assignment.decision_level() == 0 {
                    if !self.clean_clauses_if_needed() {
                        return Some(SolveResult::Unsat);
                    }
                    self.reduce_db_if_needed();
                }
                match self.new_decision() {
                    Decision::Made => {}
                    Decision::Sat => {
                        info!("SAT");
                        return Some(SolveResult::Sat);
                    }
                    Decision::AssumpConflict => {
                        info!("UNSAT under assumptions, core {}", DisplaySlice(&self.conflict));
                        return Some(SolveResult::Unsat);
                    }
                }
            }
        }

        // Phase epilogue: roll back and exchange clauses with peers.
        self.cancel_until(0);
        if self.propagate().is_some() {
            self.conflict.clear();
            return Some(SolveResult::Unsat);
        }
        if !self.sync_data() {
            self.conflict.clear();
            return Some(SolveResult::Unsat);
        }
        None
    }

    /// Warm-up/decay schedules tied to the conflict counter.
    fn adjust_heuristic_parameters(&mut self) {
        match self.var_order.branching() {
            Branching::Vsids => {
                if self.sum_conflicts & 0xfff == 0xfff {
                    self.var_order.warmup_var_decay();
                }
            }
            Branching::Maple => self.var_order.decay_step_size(),
        }

        // Tier-0 cutoff adaptation: if barely anything proved worth
        // keeping permanently, loosen the cutoff once.
        if !self.tier0_cut_adjusted
            && self.sum_conflicts >= 100_000
            && self.opts.glue_tier0_if_below_or_eq != 0
            && self.db.long_red[Tier::T0 as usize].len() < 100
        {
            self.tier0_cut_adjusted = true;
            self.opts.glue_tier0_if_below_or_eq += 2;
        }
    }

    fn handle_conflict(&mut self, confl: Conflict) {
        let res = self.analyze(confl);

        // Histories feeding the restart policies.
        self.hist.glue_short.push(res.glue);
        if self.restart.active == RestartMode::Glue {
            self.hist.glue_lt_limited.push(res.glue.min(50) as f64);
        }

        self.cancel_until(res.backtrack_level);

        self.attach_otfs_long_clauses();
        self.attach_otfs_implicit_clauses();

        debug_assert_eq!(self.value(self.analyze.learnt[0]), LBool::Undef);
        self.attach_and_enqueue_learnt(res.glue, res.subsumed);

        if self.var_order.branching() == Branching::Vsids {
            self.var_order.decay_vsids();
        }
        self.db.decay_activity();
    }

    /// Install the learnt clause: unit, implicit binary, a fresh long
    /// clause, or written into the clause it subsumed.
    fn attach_and_enqueue_learnt(&mut self, glue: u32, subsumed: Option<ClauseRef>) {
        let learnt = std::mem::take(&mut self.analyze.learnt);
        match learnt.len() {
            0 => unreachable!("learnt clause is never empty"),
            1 => {
                debug_assert_eq!(self.assignment.decision_level(), 0);
                self.learnt_units += 1;
                self.drat.add_clause(&learnt);
                self.datasync.signal_unit(learnt[0]);
                self.assignment.unchecked_enqueue(learnt[0], None);
                self.report("unit");
            }
            2 => {
                self.learnt_bins += 1;
                self.drat.add_clause(&learnt);
                self.datasync.signal_binary(learnt[0], learnt[1]);
                self.watches.attach_bin(learnt[0], learnt[1], true);
                self.db.num_bin_red += 1;
                self.assignment.unchecked_enqueue(
                    learnt[0],
                    Some(Reason::Binary { other: learnt[1], red: true }),
                );
            }
            _ => {
                self.learnt_longs += 1;
                let cref = if let Some(cref) = subsumed {
                    // The on-the-fly subsumed clause becomes the learnt
                    // clause: rewrite it in place.
                    let (w0, w1, old) = {
                        let clause = self.ca.clause(cref);
                        (clause[0], clause[1], clause.lits().to_vec())
                    };
                    self.drat.delete_delayed(&old);
                    self.watches.detach_long(cref, w0, w1);
                    let clause = self.ca.clause_mut(cref);
                    clause.retain_lits(|l| learnt.contains(l));
                    debug_assert_eq!(clause.len(), learnt.len());
                    // Restore the analyzer's ordering (asserting literal
                    // first, backtrack-level literal second).
                    for (i, &lit) in learnt.iter().enumerate() {
                        let clause = self.ca.clause_mut(cref);
                        let at = (i..clause.len()).find(|&j| clause[j] == lit).unwrap();
                        clause.swap(i, at);
                    }
                    let clause = self.ca.clause_mut(cref);
                    clause.mark_strengthened();
                    if clause.is_red() && clause.stats.glue > glue {
                        clause.stats.glue = glue;
                        let better = self.db.tier_for_glue(glue, &self.opts);
                        let clause = self.ca.clause_mut(cref);
                        if better < clause.stats.tier {
                            clause.stats.tier = better;
                        }
                    }
                    self.drat.add_clause(self.ca.clause(cref).lits());
                    self.drat.finalize_delete();
                    cref
                } else {
                    let cref = self.db.add_long_learnt(
                        &learnt[..],
                        glue,
                        self.sum_conflicts,
                        &self.opts,
                        &mut self.ca,
                    );
                    self.drat.add_clause(&learnt);
                    cref
                };
                self.attach_long(cref);
                self.db.bump_activity(cref, &mut self.ca);
                self.assignment.unchecked_enqueue(learnt[0], Some(Reason::Long(cref)));
            }
        }
        self.analyze.learnt = learnt;
    }

    /// Re-attach clauses shrunk by on-the-fly subsumption, now that the
    /// trail has retreated.
    fn attach_otfs_long_clauses(&mut self) {
        let crefs = std::mem::take(&mut self.analyze.otfs_long);
        for cref in crefs {
            let len = self.ca.clause(cref).len();
            debug_assert!(len >= 3);

            let undef_at = (0..len)
                .find(|&i| self.value(self.ca.clause(cref)[i]) == LBool::Undef)
                .expect("a shrunk clause keeps an unassigned literal");
            self.ca.clause_mut(cref).swap(0, undef_at);

            let second = (1..len).find(|&i| {
                let v = self.value(self.ca.clause(cref)[i]);
                v == LBool::Undef || v == LBool::True
            });
            match second {
                Some(at) => {
                    self.ca.clause_mut(cref).swap(1, at);
                }
                None => {
                    // All others false: the clause propagates right here.
                    let first = self.ca.clause(cref)[0];
                    if self.assignment.decision_level() == 0 {
                        self.drat.add_clause(&[first]);
                        self.assignment.unchecked_enqueue(first, None);
                    } else {
                        self.assignment.unchecked_enqueue(first, Some(Reason::Long(cref)));
                    }
                }
            }
            self.attach_long(cref);
        }
    }

    /// Install implicit clauses recorded by on-the-fly subsumption.
    fn attach_otfs_implicit_clauses(&mut self) {
        let pairs = std::mem::take(&mut self.analyze.otfs_implicit);
        for mut lits in pairs {
            let undef_at = (0..2)
                .find(|&i| self.value(lits[i]) == LBool::Undef)
                .expect("an implicit replacement keeps an unassigned literal");
            lits.swap(0, undef_at);

            self.watches.attach_bin(lits[0], lits[1], true);
            self.db.num_bin_red += 1;
            self.datasync.signal_binary(lits[0], lits[1]);

            if self.value(lits[1]) == LBool::False {
                if self.assignment.decision_level() == 0 {
                    self.drat.add_clause(&lits[..1]);
                    self.assignment.unchecked_enqueue(lits[0], None);
                } else {
                    self.assignment
                        .unchecked_enqueue(lits[0], Some(Reason::Binary { other: lits[1], red: true }));
                }
            }
        }
    }

    /// Undo the trail down to `level`, rewarding unassigned variables in
    /// step-size mode and returning them to the branching heap.
    pub(crate) fn cancel_until(&mut self, level: u32) {
        if self.assignment.decision_level() <= level {
            return;
        }
        debug!("backtrack from {} to {}", self.assignment.decision_level(), level);
        let lim = self.assignment.trail_lim[level as usize];
        let maple = self.var_order.branching() == Branching::Maple;
        for i in (lim..self.assignment.trail.len()).rev() {
            let var = self.assignment.trail[i].var();
            if maple {
                let data = &mut self.assignment.var_data[var];
                self.var_order.reward_on_unassign(var, data, self.sum_conflicts);
            }
            self.assignment.unassign(var);
            self.var_order.insert(var);
        }
        self.assignment.qhead = lim;
        self.assignment.trail.truncate(lim);
        self.assignment.trail_lim.truncate(level as usize);
    }

    /// Reads the interrupt flag on every call; probes the wall clock
    /// only once per 256 polls.
    fn poll_for_stop(&mut self) {
        if self.must_interrupt.load(Ordering::Relaxed) {
            self.params.stop = true;
        }
        self.poll_tick = self.poll_tick.wrapping_add(1);
        if self.poll_tick & 0xff == 0 && self.over_time_limit() {
            self.params.stop = true;
        }
    }

    /// Restart checks, run after every handled conflict.
    fn check_need_restart(&mut self) {
        if self.restart.active == RestartMode::Glue {
            self.check_blocking_restart();
            if self.restart.glue_triggered(&self.hist, self.opts.glue_restart_multip) {
                self.params.stop = true;
            }
        }
        if self.restart.budget_exhausted(self.params.conflicts_this_phase) {
            self.params.stop = true;
        }
        if self.spent_conflicts() >= self.params.max_confl_this_call {
            self.params.stop = true;
        }
    }

    /// A deep trail suggests the current direction is productive; clear
    /// the short-term glue window so it cannot force a restart yet.
    fn check_blocking_restart(&mut self) {
        if self.opts.do_blocking_restart
            && self.sum_conflicts > self.opts.blocking_restart_min_confl
            && self.hist.glue_short.is_valid()
            && self.hist.trail_depth.is_valid()
            && self.assignment.decision_level() > 0
            && self.assignment.num_assigned() as f64
                > self.hist.trail_depth.avg() * self.opts.blocking_restart_multip
        {
            self.hist.glue_short.clear();
            self.restart.blocked = true;
        }
    }

    /// Pick what to do next at a conflict-free point: enqueue the next
    /// assumption, branch, or conclude SAT.
    fn new_decision(&mut self) -> Decision {
        let mut next = Lit::UNDEF;
        while (self.assignment.decision_level() as usize) < self.assumptions.len() {
            let p = self.assumptions[self.assignment.decision_level() as usize];
            debug_assert_eq!(self.assignment.var_data(p.var()).removed, Removed::None);
            match self.value(p) {
                LBool::True => {
                    // Already satisfied: dummy decision level.
                    self.assignment.new_decision_level();
                }
                LBool::False => {
                    self.analyze_final(p);
                    return Decision::AssumpConflict;
                }
                LBool::Undef => {
                    next = p;
                    break;
                }
            }
        }

        if next.is_undef() {
            let Some(var) = self.var_order.pick_branching_variable(
                &mut self.assignment,
                self.sum_conflicts,
                &mut self.rng,
            ) else {
                return Decision::Sat;
            };
            self.sum_decisions += 1;
            next = self
                .var_order
                .pick_phase(var, self.assignment.var_data(var), &mut self.rng);
            debug!("decision {:?}", next);
        }

        debug_assert_eq!(self.value(next), LBool::Undef);
        self.assignment.new_decision_level();
        self.assignment.unchecked_enqueue(next, None);
        Decision::Made
    }

    fn fill_assumption_marks(&mut self) {
        for i in 0..self.assumptions.len() {
            let lit = self.assumptions[i];
            self.assignment.var_data[lit.var()].assumption =
                if lit.sign() { LBool::False } else { LBool::True };
        }
    }

    fn unfill_assumption_marks(&mut self) {
        for i in 0..self.assumptions.len() {
            let lit = self.assumptions[i];
            self.assignment.var_data[lit.var()].assumption = LBool::Undef;
        }
    }

    /// Level-0 housekeeping: once enough new top-level units piled up,
    /// strip satisfied clauses and falsified literals everywhere, then
    /// compact the arena and rebuild the branching heap.
    fn clean_clauses_if_needed(&mut self) -> bool {
        debug_assert_eq!(self.assignment.decision_level(), 0);
        debug_assert!(self.assignment.prop_at_head());

        let new_units = self.assignment.num_assigned() - self.last_clean_marker;
        if new_units == 0
            || (new_units as f64) <= self.num_vars() as f64 * self.opts.clean_after_frac_units
        {
            return true;
        }
        self.last_clean_marker = self.assignment.num_assigned();
        self.clean_fixed_clauses();
        self.consolidate();
        self.rebuild_order_heap();
        true
    }

    fn reduce_db_if_needed(&mut self) {
        let freed = self.db.reduce_if_needed(
            self.sum_conflicts,
            &self.assignment,
            &mut self.ca,
            self.drat.as_mut(),
            &self.opts,
        );
        if freed {
            self.sum_reduces += 1;
            self.report("reduce");
            self.consolidate();
        }
    }

    /// Arena compaction; the single point where clause handles move.
    pub(crate) fn consolidate(&mut self) {
        let remap = self.ca.consolidate();
        self.watches.remap_crefs(|cref| remap.try_translate(cref));
        self.db.remap(&remap);
        // Reasons of live assignments are rewritten; stale reasons of
        // unassigned variables and of permanent (level-0) assignments
        // are cleared instead — level-0 facts stand on their own.
        for v in 0..self.next_var {
            let var = Var::new(v);
            let assigned = !self.assignment.value_var(var).is_undef();
            let data = &mut self.assignment.var_data[var];
            match data.reason {
                Some(Reason::Long(cref)) if assigned && data.level > 0 => {
                    data.reason = Some(Reason::Long(remap.translate(cref)));
                }
                Some(_) if !assigned || data.level == 0 => {
                    data.reason = None;
                }
                _ => {}
            }
        }
    }

    /// Remove satisfied clauses, strip false literals, and demote long
    /// clauses that shrank to two literals into the watch lists.
    fn clean_fixed_clauses(&mut self) {
        debug_assert_eq!(self.assignment.decision_level(), 0);

        // Binaries: one true literal satisfies the clause; a false
        // literal would have propagated the other one to true already.
        let mut sat_bins: Vec<(Lit, Lit, bool)> = Vec::new();
        self.watches.for_each_bin_once(|a, b, red| {
            if self.assignment.value(a) == LBool::True || self.assignment.value(b) == LBool::True {
                sat_bins.push((a, b, red));
            }
        });
        for (a, b, red) in sat_bins {
            self.watches.detach_bin(a, b, red);
            if red {
                self.db.num_bin_red -= 1;
            } else {
                self.db.num_bin_irred -= 1;
            }
            self.drat.delete_clause(&[a, b]);
        }

        for cref in self.ca.iter_refs().collect_vec() {
            if self.ca.clause(cref).is_deleted() {
                continue;
            }
            let satisfied = self
                .ca
                .clause(cref)
                .iter()
                .any(|&l| self.assignment.value(l) == LBool::True);
            if satisfied {
                let (w0, w1) = {
                    let c = self.ca.clause(cref);
                    (c[0], c[1])
                };
                self.drat.delete_clause(self.ca.clause(cref).lits());
                self.watches.detach_long(cref, w0, w1);
                self.ca.free(cref);
                continue;
            }
            let any_false = self
                .ca
                .clause(cref)
                .iter()
                .any(|&l| self.assignment.value(l) == LBool::False);
            if !any_false {
                continue;
            }

            // Strip falsified literals.
            let (w0, w1, old) = {
                let c = self.ca.clause(cref);
                (c[0], c[1], c.lits().to_vec())
            };
            self.drat.delete_delayed(&old);
            self.watches.detach_long(cref, w0, w1);
            {
                let assignment = &self.assignment;
                let clause = self.ca.clause_mut(cref);
                clause.retain_lits(|&l| assignment.value(l) != LBool::False);
                clause.mark_strengthened();
            }
            debug_assert!(self.ca.clause(cref).len() >= 2);
            self.drat.add_clause(self.ca.clause(cref).lits());
            self.drat.finalize_delete();

            if self.ca.clause(cref).len() == 2 {
                // Shrunk to implicit storage.
                let (a, b, red) = {
                    let c = self.ca.clause(cref);
                    (c[0], c[1], c.is_red())
                };
                self.watches.attach_bin(a, b, red);
                if red {
                    self.db.num_bin_red += 1;
                } else {
                    self.db.num_bin_irred += 1;
                }
                self.ca.free(cref);
            } else {
                self.attach_long(cref);
            }
        }
        self.db.drop_deleted(&self.ca);
    }

    /// Heap rebuild after cleaning: exactly the unassigned, non-removed
    /// variables.
    pub(crate) fn rebuild_order_heap(&mut self) {
        let vars = (0..self.next_var)
            .map(Var::new)
            .filter(|&v| {
                self.assignment.value_var(v).is_undef()
                    && self.assignment.var_data(v).removed == Removed::None
            })
            .collect_vec();
        self.var_order.rebuild(vars);
    }

    /// Phase-boundary exchange with sibling instances.
    fn sync_data(&mut self) -> bool {
        debug_assert_eq!(self.assignment.decision_level(), 0);
        let intake = self.datasync.exchange();
        for lit in intake.units {
            if !self.assignment.enqueue(lit, None) {
                self.ok = false;
                return false;
            }
        }
        for (a, b) in intake.binaries {
            if !self.watches.contains_bin(a, b) {
                self.watches.attach_bin(a, b, true);
                self.db.num_bin_red += 1;
            }
        }
        if self.propagate().is_some() {
            self.ok = false;
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn lit(x: i32) -> Lit {
        Lit::from_external(x)
    }

    #[test]
    fn tie_shirt() {
        let mut solver = Solver::new(Options::default());
        let tie = Lit::positive(solver.new_variable());
        let shirt = Lit::positive(solver.new_variable());
        solver.add_clause(&[-tie, shirt]);
        solver.add_clause(&[tie, shirt]);
        solver.add_clause(&[-tie, -shirt]);

        assert_eq!(solver.solve(0), SolveResult::Sat);
        assert_eq!(solver.model_value(tie), LBool::False);
        assert_eq!(solver.model_value(shirt), LBool::True);

        // Forcing TIE makes it unsatisfiable.
        solver.add_clause(&[tie]);
        assert_eq!(solver.solve(0), SolveResult::Unsat);
        assert!(!solver.ok());
    }

    #[test]
    fn unsat_latch_is_sticky() {
        let mut solver = Solver::new(Options::default());
        solver.add_clause(&[lit(1)]);
        assert!(!solver.add_clause(&[lit(-1)]) || solver.solve(0) == SolveResult::Unsat);
        assert_eq!(solver.solve(0), SolveResult::Unsat);
        // Once latched, everything keeps reporting UNSAT.
        assert!(!solver.add_clause(&[lit(2)]));
        assert_eq!(solver.solve(0), SolveResult::Unsat);
    }
}
