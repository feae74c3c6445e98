use serde::Serialize;

/// Restart policy selection.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub enum RestartMode {
    /// Each phase budget is the previous times `restart_inc`.
    Geom,
    /// Phase budgets follow the Luby sequence times `restart_first`.
    Luby,
    /// Restart when the short-term glue average overtakes the long-term one.
    Glue,
    /// Alternate `Glue` and `Geom` phases.
    GlueGeom,
}

/// Branching heuristic selection.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub enum Branching {
    /// Activity-decay branching (bump on conflict, geometric increment).
    Vsids,
    /// Step-size moving-average branching (reward on unassignment).
    Maple,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub enum PolarityMode {
    /// Last assigned value (phase saving).
    Saved,
    AlwaysFalse,
    AlwaysTrue,
    Random,
}

#[derive(Debug, Clone)]
pub struct Options {
    pub seed: u64,

    // Restart:
    pub restart: RestartMode,
    pub restart_first: u64,
    pub restart_inc: f64,
    /// Glue sub-phase budget, as a multiple of the geometric phase budget,
    /// in `GlueGeom` mode.
    pub ratio_glue_geom: f64,
    /// Short-term glue window must exceed `glue_restart_multip` times the
    /// long-term average to trigger a glue restart.
    pub glue_restart_multip: f64,
    pub short_history_size: usize,
    // Blocking restarts:
    pub do_blocking_restart: bool,
    pub blocking_restart_multip: f64,
    pub blocking_restart_min_confl: u64,
    pub blocking_restart_trail_window: usize,

    // Branching:
    pub branching: Branching,
    pub polarity_mode: PolarityMode,
    pub random_var_freq: f64,
    pub var_decay_start: f64,
    pub var_decay_max: f64,
    pub step_size_start: f64,
    pub step_size_min: f64,
    pub step_size_dec: f64,

    // Learnt DB:
    pub glue_tier0_if_below_or_eq: u32,
    pub glue_tier1_if_below_or_eq: u32,
    /// Conflicts between tier-1 bulk reductions.
    pub every_tier1_reduce: u64,
    /// Conflicts between tier-2 reductions; 0 switches to the soft cap.
    pub every_tier2_reduce: u64,
    pub max_tier2_clauses: usize,
    pub inc_max_tier2_clauses: f64,
    /// A tier-1 clause untouched for this many conflicts is dropped.
    pub must_touch_tier1_within: u64,
    /// Fraction of tier-2 clauses surviving a reduction.
    pub tier2_keep_ratio: f64,

    // Conflict analysis:
    pub do_recursive_minim: bool,
    pub do_otf_subsume: bool,
    /// Watch-based minimization applies below this size...
    pub max_size_more_minim: usize,
    /// ...and at or below this glue.
    pub max_glue_more_minim: u32,
    pub do_cache_minim: bool,
    /// Literal budget for cache/binary based shrinking of big clauses.
    pub max_num_lits_more_minim: usize,
    pub do_update_glue_on_analysis: bool,

    // Probing:
    pub do_probe: bool,
    pub do_hyper_bin: bool,
    pub do_trans_red: bool,
    pub probe_bogo_base: u64,
    pub probe_multiplier_max: f64,
    /// Conflicts between probe rounds.
    pub probe_interval: u64,

    // Level-0 housekeeping:
    /// Clean clauses once new level-0 units exceed this fraction of vars.
    pub clean_after_frac_units: f64,

    // Limits:
    pub max_time_secs: Option<f64>,
}

pub const DEFAULT_OPTIONS: Options = Options {
    seed: 0,

    restart: RestartMode::GlueGeom,
    restart_first: 100,
    restart_inc: 1.5,
    ratio_glue_geom: 5.0,
    glue_restart_multip: 0.8,
    short_history_size: 50,
    do_blocking_restart: true,
    blocking_restart_multip: 1.4,
    blocking_restart_min_confl: 10_000,
    blocking_restart_trail_window: 5_000,

    branching: Branching::Vsids,
    polarity_mode: PolarityMode::Saved,
    random_var_freq: 0.0,
    var_decay_start: 0.80,
    var_decay_max: 0.95,
    step_size_start: 0.40,
    step_size_min: 0.06,
    step_size_dec: 1e-6,

    glue_tier0_if_below_or_eq: 3,
    glue_tier1_if_below_or_eq: 6,
    every_tier1_reduce: 10_000,
    every_tier2_reduce: 0,
    max_tier2_clauses: 30_000,
    inc_max_tier2_clauses: 1.04,
    must_touch_tier1_within: 30_000,
    tier2_keep_ratio: 0.5,

    do_recursive_minim: true,
    do_otf_subsume: true,
    max_size_more_minim: 30,
    max_glue_more_minim: 6,
    do_cache_minim: true,
    max_num_lits_more_minim: 20,
    do_update_glue_on_analysis: true,

    do_probe: true,
    do_hyper_bin: true,
    do_trans_red: true,
    probe_bogo_base: 1_000_000,
    probe_multiplier_max: 4.0,
    probe_interval: 50_000,

    clean_after_frac_units: 0.05,

    max_time_secs: None,
};

impl Default for Options {
    fn default() -> Self {
        DEFAULT_OPTIONS
    }
}
