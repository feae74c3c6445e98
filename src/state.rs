use std::io::{Read, Write};

use snafu::{ResultExt, Snafu};
use tracing::debug;

use crate::clause::{ClauseStats, Tier};
use crate::lit::Lit;
use crate::options::Options;
use crate::solver::Solver;
use crate::var::{Removed, Var};

const MAGIC: u32 = 0x464C_5354; // "FLST"
const VERSION: u32 = 1;

#[derive(Debug, Snafu)]
pub enum StateError {
    #[snafu(display("i/o error while (de)serializing state: {source}"))]
    Io { source: std::io::Error },
    #[snafu(display("bad magic {got:#010x}, not a solver state file"))]
    BadMagic { got: u32 },
    #[snafu(display("unsupported state version {got}"))]
    BadVersion { got: u32 },
    #[snafu(display("malformed state: {what}"))]
    Malformed { what: String },
}

struct Writer<'a, W: Write> {
    w: &'a mut W,
}

impl<W: Write> Writer<'_, W> {
    fn u8(&mut self, x: u8) -> Result<(), StateError> {
        self.w.write_all(&[x]).context(IoSnafu)
    }
    fn u32(&mut self, x: u32) -> Result<(), StateError> {
        self.w.write_all(&x.to_le_bytes()).context(IoSnafu)
    }
    fn u64(&mut self, x: u64) -> Result<(), StateError> {
        self.w.write_all(&x.to_le_bytes()).context(IoSnafu)
    }
    fn f64(&mut self, x: f64) -> Result<(), StateError> {
        self.w.write_all(&x.to_le_bytes()).context(IoSnafu)
    }
    fn lit(&mut self, lit: Lit) -> Result<(), StateError> {
        self.u32(lit.inner())
    }
    fn stats(&mut self, stats: &ClauseStats) -> Result<(), StateError> {
        self.u32(stats.glue)?;
        self.u64(stats.introduced_at_conflict)?;
        self.u64(stats.last_touched)?;
        self.u32(stats.used_for_uip_creation)?;
        self.u8(stats.tier as u8)?;
        self.f64(stats.activity)
    }
}

struct Reader<'a, R: Read> {
    r: &'a mut R,
    n_vars: u32,
}

impl<R: Read> Reader<'_, R> {
    fn u8(&mut self) -> Result<u8, StateError> {
        let mut buf = [0u8; 1];
        self.r.read_exact(&mut buf).context(IoSnafu)?;
        Ok(buf[0])
    }
    fn u32(&mut self) -> Result<u32, StateError> {
        let mut buf = [0u8; 4];
        self.r.read_exact(&mut buf).context(IoSnafu)?;
        Ok(u32::from_le_bytes(buf))
    }
    fn u64(&mut self) -> Result<u64, StateError> {
        let mut buf = [0u8; 8];
        self.r.read_exact(&mut buf).context(IoSnafu)?;
        Ok(u64::from_le_bytes(buf))
    }
    fn f64(&mut self) -> Result<f64, StateError> {
        let mut buf = [0u8; 8];
        self.r.read_exact(&mut buf).context(IoSnafu)?;
        Ok(f64::from_le_bytes(buf))
    }
    fn lit(&mut self) -> Result<Lit, StateError> {
        let code = self.u32()?;
        if code >= self.n_vars * 2 {
            return MalformedSnafu { what: format!("literal code {code} out of range") }.fail();
        }
        Ok(Lit::from_inner(code))
    }
    fn stats(&mut self) -> Result<ClauseStats, StateError> {
        let glue = self.u32()?;
        let introduced_at_conflict = self.u64()?;
        let last_touched = self.u64()?;
        let used_for_uip_creation = self.u32()?;
        let tier_raw = self.u8()?;
        let tier = Tier::from_u8(tier_raw)
            .ok_or_else(|| MalformedSnafu { what: format!("bad tier {tier_raw}") }.build())?;
        let activity = self.f64()?;
        Ok(ClauseStats {
            glue,
            introduced_at_conflict,
            last_touched,
            used_for_uip_creation,
            tier,
            activity,
        })
    }
}

impl Solver {
    /// Serialize the level-0 state: header, per-variable data, the
    /// permanent trail, implicit binaries, and all long clauses by tier.
    pub fn save_state<W: Write>(&self, sink: &mut W) -> Result<(), StateError> {
        assert_eq!(
            self.assignment.decision_level(),
            0,
            "state is only saved at level 0"
        );
        let mut w = Writer { w: sink };

        w.u32(MAGIC)?;
        w.u32(VERSION)?;
        w.u32(self.num_vars() as u32)?;
        w.u64(self.opts.seed)?;
        w.u8(self.ok() as u8)?;

        for v in 0..self.num_vars() as u32 {
            let var = Var::new(v);
            let (vsids, maple) = self.var_order.activities(var);
            let data = self.assignment.var_data(var);
            w.f64(vsids)?;
            w.f64(maple)?;
            w.u8(data.polarity as u8)?;
            w.u8(data.removed as u8)?;
        }

        w.u64(self.assignment.trail.len() as u64)?;
        for &lit in &self.assignment.trail {
            w.lit(lit)?;
        }

        for red in [false, true] {
            let mut bins: Vec<(Lit, Lit)> = Vec::new();
            self.watches.for_each_bin_once(|a, b, r| {
                if r == red {
                    bins.push((a, b));
                }
            });
            w.u64(bins.len() as u64)?;
            for (a, b) in bins {
                w.lit(a)?;
                w.lit(b)?;
            }
        }

        let write_section = |w: &mut Writer<W>, crefs: &[crate::cref::ClauseRef]| {
            w.u64(crefs.len() as u64)?;
            for &cref in crefs {
                let clause = self.ca.clause(cref);
                debug_assert!(!clause.is_deleted());
                w.u32(clause.len() as u32)?;
                for &lit in clause.iter() {
                    w.lit(lit)?;
                }
                w.stats(&clause.stats)?;
            }
            Ok::<(), StateError>(())
        };

        write_section(&mut w, &self.db.long_irred)?;
        // Group by the tier of record; promotions recorded on the clause
        // may not have been re-bucketed into the database lists yet.
        let mut by_tier: [Vec<crate::cref::ClauseRef>; 4] = Default::default();
        for list in &self.db.long_red {
            for &cref in list {
                by_tier[self.ca.clause(cref).stats.tier as usize].push(cref);
            }
        }
        for tier in Tier::ALL {
            write_section(&mut w, &by_tier[tier as usize])?;
        }
        Ok(())
    }

    /// Rebuild a solver from a stream produced by [`save_state`].
    ///
    /// [`save_state`]: Solver::save_state
    pub fn load_state<R: Read>(source: &mut R, mut opts: Options) -> Result<Solver, StateError> {
        let mut r = Reader { r: source, n_vars: 0 };

        let magic = r.u32()?;
        if magic != MAGIC {
            return BadMagicSnafu { got: magic }.fail();
        }
        let version = r.u32()?;
        if version != VERSION {
            return BadVersionSnafu { got: version }.fail();
        }
        let n_vars = r.u32()?;
        r.n_vars = n_vars;
        opts.seed = r.u64()?;
        let ok = r.u8()? != 0;

        let mut solver = Solver::new(opts);
        for _ in 0..n_vars {
            solver.new_variable();
        }

        for v in 0..n_vars {
            let var = Var::new(v);
            let vsids = r.f64()?;
            let maple = r.f64()?;
            let polarity = r.u8()? != 0;
            let removed_raw = r.u8()?;
            let removed = Removed::from_u8(removed_raw)
                .ok_or_else(|| MalformedSnafu { what: format!("bad removed tag {removed_raw}") }.build())?;
            solver.var_order.set_activities(var, vsids, maple);
            let data = &mut solver.assignment.var_data[var];
            data.polarity = polarity;
            data.removed = removed;
        }

        let n_trail = r.u64()?;
        for _ in 0..n_trail {
            let lit = r.lit()?;
            if !solver.assignment.enqueue(lit, None) {
                return MalformedSnafu { what: format!("contradictory trail literal {lit}") }.fail();
            }
        }
        // The stored trail is already propagation-saturated.
        solver.assignment.qhead = solver.assignment.trail.len();

        for red in [false, true] {
            let n_bins = r.u64()?;
            for _ in 0..n_bins {
                let a = r.lit()?;
                let b = r.lit()?;
                if a.var() == b.var() {
                    return MalformedSnafu { what: format!("degenerate binary {a} {b}") }.fail();
                }
                solver.watches.attach_bin(a, b, red);
                if red {
                    solver.db.num_bin_red += 1;
                } else {
                    solver.db.num_bin_irred += 1;
                }
            }
        }

        for section in 0..=Tier::ALL.len() {
            let red_tier = if section == 0 { None } else { Some(Tier::ALL[section - 1]) };
            let n_cls = r.u64()?;
            for _ in 0..n_cls {
                let size = r.u32()?;
                if size < 3 {
                    return MalformedSnafu { what: format!("long clause of size {size}") }.fail();
                }
                let mut lits = Vec::with_capacity(size as usize);
                for _ in 0..size {
                    lits.push(r.lit()?);
                }
                let stats = r.stats()?;
                match red_tier {
                    None => {
                        let cref = solver.db.add_long_irred(&lits[..], &mut solver.ca);
                        solver.ca.clause_mut(cref).stats = stats;
                        solver.attach_long(cref);
                    }
                    Some(tier) => {
                        if stats.tier != tier {
                            return MalformedSnafu {
                                what: format!("clause in tier {tier:?} section tagged {:?}", stats.tier),
                            }
                            .fail();
                        }
                        let cref = solver.ca.alloc(lits);
                        {
                            let clause = solver.ca.clause_mut(cref);
                            clause.make_red(stats.glue);
                            clause.stats = stats;
                        }
                        solver.db.register_red(cref, tier);
                        solver.attach_long(cref);
                    }
                }
            }
        }

        if !ok {
            solver.ok = false;
        }
        solver.rebuild_order_heap();
        debug!("loaded state: {} vars, ok={}", n_vars, ok);
        Ok(solver)
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
    fn round_trip_preserves_answer() {
        let mut solver = Solver::new(Options::default());
        solver.add_clause(&[lit(1), lit(2), lit(3)]);
        solver.add_clause(&[lit(-1), lit(2)]);
        solver.add_clause(&[lit(-2), lit(3)]);
        solver.add_clause(&[lit(-3), lit(-1)]);

        let mut buf = Vec::new();
        solver.save_state(&mut buf).unwrap();

        let mut restored = Solver::load_state(&mut buf.as_slice(), Options::default()).unwrap();
        assert_eq!(restored.num_vars(), solver.num_vars());
        assert_eq!(restored.solve(0), solver.solve(0));
    }

    #[test]
    fn rejects_garbage() {
        let garbage = b"p cnf 3 2";
        assert!(matches!(
            Solver::load_state(&mut &garbage[..], Options::default()),
            Err(StateError::BadMagic { .. }) | Err(StateError::Io { .. })
        ));
    }
}
