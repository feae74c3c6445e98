use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use test_log::test;

use flint_sat::lbool::LBool;
use flint_sat::lit::Lit;
use flint_sat::options::{Branching, Options, RestartMode, DEFAULT_OPTIONS};
use flint_sat::solver::{SolveResult, Solver};

fn lit(x: i32) -> Lit {
    Lit::from_external(x)
}

fn clause(xs: &[i32]) -> Vec<Lit> {
    xs.iter().map(|&x| lit(x)).collect()
}

fn solver_with(clauses: &[&[i32]], opts: Options) -> Solver {
    let mut solver = Solver::new(opts);
    for c in clauses {
        solver.add_clause(&clause(c));
    }
    solver
}

fn model_satisfies(solver: &Solver, clauses: &[&[i32]]) -> bool {
    clauses.iter().all(|c| {
        c.iter()
            .any(|&x| solver.model_value(lit(x)) == LBool::True)
    })
}

#[test]
fn scenario_1_two_var_unsat_empty_core() {
    let clauses: &[&[i32]] = &[&[1, 2], &[-1, 2], &[1, -2], &[-1, -2]];
    let mut solver = solver_with(clauses, Options::default());
    assert_eq!(solver.solve(0), SolveResult::Unsat);
    assert!(solver.final_conflict().is_empty());
    assert!(!solver.ok());
}

#[test]
fn scenario_2_two_clauses_sat() {
    let clauses: &[&[i32]] = &[&[1, 2], &[-1, 2]];
    let mut solver = solver_with(clauses, Options::default());
    assert_eq!(solver.solve(0), SolveResult::Sat);
    assert!(model_satisfies(&solver, clauses));
}

#[test]
fn scenario_3_propagation_chain() {
    // ¬3 fixes 3, then ¬2, then ¬1, and the first clause forces 1:
    // the instance is contradictory by unit propagation alone.
    let clauses: &[&[i32]] = &[&[1, 2, 3], &[-1, 2], &[-2, 3], &[-3]];
    let mut solver = solver_with(clauses, Options::default());
    assert_eq!(solver.solve(0), SolveResult::Unsat);
}

#[test]
fn scenario_4_pigeonhole_3_2() {
    // Pigeon i sits in hole j ⇔ var p(i,j); 3 pigeons, 2 holes, 9 clauses.
    let p = |i: i32, j: i32| (i - 1) * 2 + j; // 1-based var numbering
    let mut clauses: Vec<Vec<i32>> = Vec::new();
    for i in 1..=3 {
        clauses.push(vec![p(i, 1), p(i, 2)]);
    }
    for j in 1..=2 {
        for i1 in 1..=3 {
            for i2 in (i1 + 1)..=3 {
                clauses.push(vec![-p(i1, j), -p(i2, j)]);
            }
        }
    }
    assert_eq!(clauses.len(), 9);

    let mut solver = Solver::new(Options::default());
    for c in &clauses {
        solver.add_clause(&clause(c));
    }
    assert_eq!(solver.solve(0), SolveResult::Unsat);
}

#[test]
fn scenario_5_unit_cascade() {
    let clauses: &[&[i32]] = &[&[1], &[-1, 2], &[-2, 3]];
    let mut solver = solver_with(clauses, Options::default());
    assert_eq!(solver.solve(0), SolveResult::Sat);
    for x in 1..=3 {
        assert_eq!(solver.model_value(lit(x)), LBool::True);
    }
    // The cascade is forced without a single decision.
    assert_eq!(solver.num_decisions(), 0);
}

#[test]
fn scenario_6_assumption_core() {
    let clauses: &[&[i32]] = &[&[1, 2], &[-1, 2], &[1, -2]];
    let mut solver = solver_with(clauses, Options::default());

    // Satisfiable without assumptions.
    assert_eq!(solver.solve(0), SolveResult::Sat);

    solver.set_assumptions(&[lit(-2)]);
    assert_eq!(solver.solve(0), SolveResult::Unsat);
    assert_eq!(solver.final_conflict(), &[lit(-2)]);
    // The latch is not set: the formula itself stays satisfiable.
    assert!(solver.ok());

    solver.set_assumptions(&[]);
    assert_eq!(solver.solve(0), SolveResult::Sat);
}

#[test]
fn p2_core_is_unsat_with_formula() {
    let clauses: &[&[i32]] = &[&[1, 2], &[-1, 2], &[1, -2]];
    let assumptions = [lit(-2), lit(1)];
    let mut solver = solver_with(clauses, Options::default());
    solver.set_assumptions(&assumptions);
    assert_eq!(solver.solve(0), SolveResult::Unsat);

    let core: Vec<Lit> = solver.final_conflict().to_vec();
    assert!(core.iter().all(|l| assumptions.contains(l)));

    // Re-solve with the core literals as hard units.
    let mut check = solver_with(clauses, Options::default());
    for &l in &core {
        check.add_clause(&[l]);
    }
    assert_eq!(check.solve(0), SolveResult::Unsat);
}

#[test]
fn p4_state_round_trip() {
    let clauses: &[&[i32]] = &[
        &[1, 2, 3],
        &[-1, -2],
        &[-1, -3],
        &[-2, -3],
        &[4, 5],
        &[-4, 5],
        &[1, 4, -5],
    ];
    let mut direct = solver_with(clauses, Options::default());
    let mut buf = Vec::new();
    direct.save_state(&mut buf).unwrap();

    let mut restored = Solver::load_state(&mut buf.as_slice(), Options::default()).unwrap();
    assert_eq!(restored.solve(0), direct.solve(0));
}

#[test]
fn p6_determinism_same_seed() {
    let clauses = random_3sat(12, 48, 7);
    let run = || {
        let mut solver = Solver::new(Options::default());
        for c in &clauses {
            solver.add_clause(c);
        }
        let res = solver.solve(0);
        (res, solver.num_conflicts(), solver.num_decisions(), solver.model().to_vec())
    };
    assert_eq!(run(), run());
}

#[test]
fn p7_probing_preserves_satisfiability() {
    for seed in 0..8 {
        let clauses = random_3sat(10, 42, seed);

        let mut with_probe = Solver::new(Options { do_probe: true, ..DEFAULT_OPTIONS });
        let mut without_probe = Solver::new(Options { do_probe: false, ..DEFAULT_OPTIONS });
        for c in &clauses {
            with_probe.add_clause(c);
            without_probe.add_clause(c);
        }
        assert_eq!(
            with_probe.solve(0),
            without_probe.solve(0),
            "probing changed the answer for seed {seed}"
        );
    }
}

#[test]
fn interrupt_returns_unknown() {
    let clauses = random_3sat(14, 60, 3);
    let mut solver = Solver::new(Options { do_probe: false, ..DEFAULT_OPTIONS });
    for c in &clauses {
        solver.add_clause(c);
    }
    let flag = solver.interrupt_flag();
    flag.store(true, std::sync::atomic::Ordering::Relaxed);
    assert_eq!(solver.solve(0), SolveResult::Unknown);

    // Clearing the flag resumes normal operation.
    flag.store(false, std::sync::atomic::Ordering::Relaxed);
    let res = solver.solve(0);
    assert_ne!(res, SolveResult::Unknown);
}

#[test]
fn conflict_budget_returns_unknown_or_finishes() {
    let clauses = random_3sat(16, 70, 11);
    let mut solver = Solver::new(Options::default());
    for c in &clauses {
        solver.add_clause(c);
    }
    let res = solver.solve(1);
    // One conflict is allowed; whatever came out, the solver must still
    // be usable and finish without the budget.
    if res == SolveResult::Unknown {
        assert!(solver.num_conflicts() >= 1);
    }
    let final_res = solver.solve(0);
    assert_ne!(final_res, SolveResult::Unknown);
}

/// Reference check: brute-force satisfiability for small formulas.
fn brute_force_sat(num_vars: usize, clauses: &[Vec<Lit>]) -> bool {
    'outer: for bits in 0u32..(1 << num_vars) {
        for c in clauses {
            let sat = c.iter().any(|l| {
                let val = bits >> l.var().index() & 1 == 1;
                val != l.sign()
            });
            if !sat {
                continue 'outer;
            }
        }
        return true;
    }
    false
}

fn random_3sat(num_vars: i32, num_clauses: usize, seed: u64) -> Vec<Vec<Lit>> {
    let mut rng = StdRng::seed_from_u64(0xF11A7 ^ seed);
    let mut clauses = Vec::with_capacity(num_clauses);
    for _ in 0..num_clauses {
        let mut c = Vec::new();
        while c.len() < 3 {
            let v = rng.gen_range(1..=num_vars);
            let l = if rng.gen() { v } else { -v };
            if !c.contains(&l) && !c.contains(&-l) {
                c.push(l);
            }
        }
        clauses.push(clause(&c));
    }
    clauses
}

#[test]
fn agrees_with_brute_force() {
    for seed in 0..24 {
        let num_vars = 9;
        let clauses = random_3sat(num_vars, 36 + (seed as usize % 9), seed);
        let expected = brute_force_sat(num_vars as usize, &clauses);

        let mut solver = Solver::new(Options::default());
        for c in &clauses {
            solver.add_clause(c);
        }
        let res = solver.solve(0);
        assert_eq!(
            res,
            if expected { SolveResult::Sat } else { SolveResult::Unsat },
            "wrong answer on seed {seed}"
        );
        if res == SolveResult::Sat {
            let as_i32: Vec<Vec<i32>> = clauses
                .iter()
                .map(|c| c.iter().map(|l| l.to_external()).collect())
                .collect();
            let refs: Vec<&[i32]> = as_i32.iter().map(|c| c.as_slice()).collect();
            assert!(model_satisfies(&solver, &refs), "bad model on seed {seed}");
        }
    }
}

#[test]
fn all_configurations_agree() {
    let configs = [
        Options { branching: Branching::Vsids, restart: RestartMode::GlueGeom, ..DEFAULT_OPTIONS },
        Options { branching: Branching::Maple, restart: RestartMode::Luby, ..DEFAULT_OPTIONS },
        Options { branching: Branching::Vsids, restart: RestartMode::Geom, do_otf_subsume: false, ..DEFAULT_OPTIONS },
        Options { branching: Branching::Maple, restart: RestartMode::Glue, do_recursive_minim: false, ..DEFAULT_OPTIONS },
    ];
    for seed in 0..6 {
        let clauses = random_3sat(11, 46, 100 + seed);
        let mut answers = Vec::new();
        for opts in &configs {
            let mut solver = Solver::new(opts.clone());
            for c in &clauses {
                solver.add_clause(c);
            }
            answers.push(solver.solve(0));
        }
        assert!(
            answers.windows(2).all(|w| w[0] == w[1]),
            "configurations disagree on seed {seed}: {answers:?}"
        );
    }
}

#[test]
fn incremental_solving_with_new_clauses() {
    let mut solver = solver_with(&[&[1, 2], &[-1, 2]], Options::default());
    assert_eq!(solver.solve(0), SolveResult::Sat);
    assert_eq!(solver.model_value(lit(2)), LBool::True);

    solver.add_clause(&clause(&[-2, 3]));
    solver.add_clause(&clause(&[-3, -2, 4]));
    assert_eq!(solver.solve(0), SolveResult::Sat);
    assert!(model_satisfies(&solver, &[&[1, 2], &[-1, 2], &[-2, 3], &[-3, -2, 4]]));

    solver.add_clause(&clause(&[-2]));
    assert_eq!(solver.solve(0), SolveResult::Unsat);
}
