use tracing::debug;

use crate::history::SearchHistory;
use crate::options::{Options, RestartMode};
use crate::utils::luby;

/// Restart phase controller.
///
/// Tracks the active phase type (for `GlueGeom` this alternates between
/// the glue and geometric sub-phases), the remaining conflict budget of
/// the phase, and the blocking-restart latch. Budget deficits of an
/// overrun phase carry over into the next one.
#[derive(Debug)]
pub struct RestartState {
    configured: RestartMode,
    pub active: RestartMode,
    max_confl_phase: f64,
    pub max_confl_this_phase: i64,
    luby_loop: u32,
    pub blocked: bool,
}

impl RestartState {
    pub fn new(opts: &Options) -> Self {
        let mut st = Self {
            configured: opts.restart,
            active: RestartMode::Geom,
            max_confl_phase: opts.restart_first as f64,
            max_confl_this_phase: opts.restart_first as i64,
            luby_loop: 0,
            blocked: false,
        };
        st.setup(opts);
        st
    }

    /// Reset to the configured policy at the start of a `solve` call.
    pub fn setup(&mut self, opts: &Options) {
        self.max_confl_phase = opts.restart_first as f64;
        self.max_confl_this_phase = opts.restart_first as i64;
        self.luby_loop = 0;
        self.blocked = false;
        self.active = match opts.restart {
            RestartMode::Geom => RestartMode::Geom,
            RestartMode::Luby => RestartMode::Luby,
            RestartMode::Glue => RestartMode::Glue,
            // The alternation starts in the glue sub-phase.
            RestartMode::GlueGeom => RestartMode::Glue,
        };
    }

    /// Whether the budget-counted phase types have run out of conflicts.
    pub fn budget_exhausted(&self, conflicts_this_phase: u64) -> bool {
        match self.active {
            RestartMode::Geom | RestartMode::Luby => {
                conflicts_this_phase as i64 > self.max_confl_this_phase
            }
            _ => false,
        }
    }

    /// Whether the glue-comparison trigger fires.
    pub fn glue_triggered(&self, hist: &SearchHistory, multip: f64) -> bool {
        self.active == RestartMode::Glue
            && hist.glue_short.is_valid()
            && hist.glue_lt_limited.is_valid()
            && multip * hist.glue_short.avg() > hist.glue_lt_limited.avg()
    }

    /// Carry an overrun into the next phase and advance the phase machine.
    pub fn next_phase(&mut self, conflicts_done: u64, opts: &Options) {
        self.max_confl_this_phase -= conflicts_done as i64;
        self.blocked = false;

        if self.max_confl_this_phase > 0 {
            // Phase interrupted early (blocking trigger, interrupt, or
            // conflict ceiling); keep rolling on the remaining budget.
            return;
        }

        match self.configured {
            RestartMode::Glue => {}
            RestartMode::Geom => {
                self.max_confl_phase *= opts.restart_inc;
                self.max_confl_this_phase = self.max_confl_phase as i64;
            }
            RestartMode::Luby => {
                self.max_confl_this_phase =
                    (luby(opts.restart_inc * 1.5, self.luby_loop) * opts.restart_first as f64 / 2.0)
                        as i64;
                self.luby_loop += 1;
            }
            RestartMode::GlueGeom => {
                self.active = match self.active {
                    RestartMode::Geom => RestartMode::Glue,
                    _ => RestartMode::Geom,
                };
                match self.active {
                    RestartMode::Geom => {
                        self.max_confl_phase *= opts.restart_inc;
                        self.max_confl_this_phase = self.max_confl_phase as i64;
                    }
                    _ => {
                        self.max_confl_this_phase =
                            (opts.ratio_glue_geom * self.max_confl_phase) as i64;
                    }
                }
                debug!(
                    "restart phase is now {:?}, budget {}",
                    self.active, self.max_confl_this_phase
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::DEFAULT_OPTIONS;

    #[test]
    fn geometric_budget_grows() {
        let mut opts = DEFAULT_OPTIONS;
        opts.restart = RestartMode::Geom;
        opts.restart_first = 100;
        opts.restart_inc = 2.0;
        let mut st = RestartState::new(&opts);
        assert_eq!(st.max_confl_this_phase, 100);
        st.next_phase(150, &opts);
        assert_eq!(st.max_confl_this_phase, 200);
        st.next_phase(250, &opts);
        assert_eq!(st.max_confl_this_phase, 400);
    }

    #[test]
    fn glue_geom_alternates() {
        let opts = DEFAULT_OPTIONS; // GlueGeom by default
        let mut st = RestartState::new(&opts);
        assert_eq!(st.active, RestartMode::Glue);
        st.next_phase(st.max_confl_this_phase as u64 + 1, &opts);
        assert_eq!(st.active, RestartMode::Geom);
        st.next_phase(st.max_confl_this_phase as u64 + 1, &opts);
        assert_eq!(st.active, RestartMode::Glue);
    }
}
