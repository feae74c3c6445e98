use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use flint_sat::drat::DratWriter;
use flint_sat::lit::Lit;
use flint_sat::options::{Branching, Options, PolarityMode, RestartMode, DEFAULT_OPTIONS};
use flint_sat::solver::{SolveResult, Solver};
use flint_sat::utils::parse_dimacs;

const HEADING_RESTART: &str = "RESTART OPTIONS";
const HEADING_REDUCE_DB: &str = "REDUCE-DB OPTIONS";
const HEADING_BRANCHING: &str = "BRANCHING OPTIONS";
const HEADING_PROBING: &str = "PROBING OPTIONS";
const HEADING_MINIM: &str = "MINIMIZATION OPTIONS";

#[derive(Parser)]
#[command(author, version, about = "CDCL SAT solver with failed-literal probing")]
struct Cli {
    /// Path to input CNF (plain or gzipped). Omit when loading a state.
    #[arg(value_name = "PATH")]
    input: Option<PathBuf>,

    /// Path to output a machine-readable result summary.
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Write a DRAT proof trace to this file.
    #[arg(long, value_name = "PATH")]
    drat: Option<PathBuf>,

    /// Restore the solver from a saved state instead of reading a CNF.
    #[arg(long, value_name = "PATH", conflicts_with = "input")]
    load_state: Option<PathBuf>,

    /// Save the solver state to this file after solving.
    #[arg(long, value_name = "PATH")]
    save_state: Option<PathBuf>,

    /// Assumption literals (DIMACS numbering), may be repeated.
    #[arg(long = "assume", value_name = "LIT", allow_hyphen_values = true)]
    assumptions: Vec<i32>,

    /// Conflict budget; 0 means no limit.
    #[arg(long, value_name = "NUM", default_value_t = 0)]
    max_conflicts: u64,

    /// Wall-clock budget in seconds.
    #[arg(long, value_name = "SECS")]
    max_time: Option<f64>,

    /// Random seed.
    #[arg(long, value_name = "NUM", default_value_t = DEFAULT_OPTIONS.seed)]
    seed: u64,

    /// Restart policy: geom, luby, glue, glue-geom.
    #[arg(help_heading = HEADING_RESTART)]
    #[arg(long, value_name = "POLICY", default_value = "glue-geom")]
    restart: String,

    /// Base number of conflicts between restarts.
    #[arg(help_heading = HEADING_RESTART)]
    #[arg(long, value_name = "NUM", default_value_t = DEFAULT_OPTIONS.restart_first)]
    restart_first: u64,

    /// Growth factor of the geometric restart budget.
    #[arg(help_heading = HEADING_RESTART)]
    #[arg(long, value_name = "NUM", default_value_t = DEFAULT_OPTIONS.restart_inc)]
    restart_inc: f64,

    /// Disable blocking restarts.
    #[arg(help_heading = HEADING_RESTART)]
    #[arg(long)]
    no_blocking_restart: bool,

    /// Glue cutoff for tier 0 (kept forever).
    #[arg(help_heading = HEADING_REDUCE_DB)]
    #[arg(long, value_name = "NUM", default_value_t = DEFAULT_OPTIONS.glue_tier0_if_below_or_eq)]
    glue_tier0: u32,

    /// Glue cutoff for tier 1.
    #[arg(help_heading = HEADING_REDUCE_DB)]
    #[arg(long, value_name = "NUM", default_value_t = DEFAULT_OPTIONS.glue_tier1_if_below_or_eq)]
    glue_tier1: u32,

    /// Conflicts between tier-1 reductions.
    #[arg(help_heading = HEADING_REDUCE_DB)]
    #[arg(long, value_name = "NUM", default_value_t = DEFAULT_OPTIONS.every_tier1_reduce)]
    every_tier1_reduce: u64,

    /// Soft cap on tier-2 clauses before a reduction triggers.
    #[arg(help_heading = HEADING_REDUCE_DB)]
    #[arg(long, value_name = "NUM", default_value_t = DEFAULT_OPTIONS.max_tier2_clauses)]
    max_tier2_clauses: usize,

    /// Branching heuristic: vsids or maple.
    #[arg(help_heading = HEADING_BRANCHING)]
    #[arg(long, value_name = "NAME", default_value = "vsids")]
    branching: String,

    /// Polarity policy: saved, false, true, random.
    #[arg(help_heading = HEADING_BRANCHING)]
    #[arg(long, value_name = "NAME", default_value = "saved")]
    polarity: String,

    /// Probability of a random branching variable.
    #[arg(help_heading = HEADING_BRANCHING)]
    #[arg(long, value_name = "NUM", default_value_t = DEFAULT_OPTIONS.random_var_freq)]
    random_var_freq: f64,

    /// Disable failed-literal probing.
    #[arg(help_heading = HEADING_PROBING)]
    #[arg(long)]
    no_probe: bool,

    /// Base probing budget in bogo-counts.
    #[arg(help_heading = HEADING_PROBING)]
    #[arg(long, value_name = "NUM", default_value_t = DEFAULT_OPTIONS.probe_bogo_base)]
    probe_budget: u64,

    /// Disable recursive learnt-clause minimization.
    #[arg(help_heading = HEADING_MINIM)]
    #[arg(long)]
    no_recursive_minim: bool,

    /// Disable on-the-fly subsumption.
    #[arg(help_heading = HEADING_MINIM)]
    #[arg(long)]
    no_otf_subsume: bool,
}

#[derive(Debug, Serialize)]
struct TheResult {
    name: String,
    result: SolveResult,
    time_total_secs: f64,
    num_vars: usize,
    num_long_clauses: usize,
    num_bin_clauses: u64,
    num_learnts: usize,
    num_decisions: u64,
    num_propagations: u64,
    num_conflicts: u64,
    num_restarts: u64,
    num_reduces: u64,
}

fn build_options(cli: &Cli) -> color_eyre::Result<Options> {
    let restart = match cli.restart.as_str() {
        "geom" => RestartMode::Geom,
        "luby" => RestartMode::Luby,
        "glue" => RestartMode::Glue,
        "glue-geom" => RestartMode::GlueGeom,
        other => color_eyre::eyre::bail!("unknown restart policy '{other}'"),
    };
    let branching = match cli.branching.as_str() {
        "vsids" => Branching::Vsids,
        "maple" => Branching::Maple,
        other => color_eyre::eyre::bail!("unknown branching heuristic '{other}'"),
    };
    let polarity_mode = match cli.polarity.as_str() {
        "saved" => PolarityMode::Saved,
        "false" => PolarityMode::AlwaysFalse,
        "true" => PolarityMode::AlwaysTrue,
        "random" => PolarityMode::Random,
        other => color_eyre::eyre::bail!("unknown polarity policy '{other}'"),
    };
    Ok(Options {
        seed: cli.seed,
        restart,
        restart_first: cli.restart_first,
        restart_inc: cli.restart_inc,
        do_blocking_restart: !cli.no_blocking_restart,
        branching,
        polarity_mode,
        random_var_freq: cli.random_var_freq,
        glue_tier0_if_below_or_eq: cli.glue_tier0,
        glue_tier1_if_below_or_eq: cli.glue_tier1,
        every_tier1_reduce: cli.every_tier1_reduce,
        max_tier2_clauses: cli.max_tier2_clauses,
        do_probe: !cli.no_probe,
        probe_bogo_base: cli.probe_budget,
        do_recursive_minim: !cli.no_recursive_minim,
        do_otf_subsume: !cli.no_otf_subsume,
        max_time_secs: cli.max_time,
        ..DEFAULT_OPTIONS
    })
}

fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = build_options(&cli)?;

    let time_start = Instant::now();
    let mut solver = match (&cli.input, &cli.load_state) {
        (Some(path), None) => {
            let mut solver = Solver::new(options);
            for lits in parse_dimacs(path)? {
                solver.add_clause(&lits);
            }
            solver
        }
        (None, Some(path)) => {
            let mut file = File::open(path)?;
            Solver::load_state(&mut file, options)?
        }
        _ => color_eyre::eyre::bail!("exactly one of an input CNF or --load-state is required"),
    };

    if let Some(path) = &cli.drat {
        solver.set_drat(Box::new(DratWriter::new(File::create(path)?)));
    }

    let assumptions: Vec<Lit> = cli.assumptions.iter().map(|&x| Lit::from_external(x)).collect();
    solver.set_assumptions(&assumptions);

    let result = solver.solve(cli.max_conflicts);
    let time_total = time_start.elapsed();

    if let Some(path) = &cli.save_state {
        let mut file = File::create(path)?;
        solver.save_state(&mut file)?;
    }

    print_result(&solver, result);
    print_stats(&solver, time_total);

    if let Some(output) = &cli.output {
        let name = cli
            .input
            .as_ref()
            .or(cli.load_state.as_ref())
            .and_then(|p| p.file_name())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let summary = TheResult {
            name,
            result,
            time_total_secs: time_total.as_secs_f64(),
            num_vars: solver.num_vars(),
            num_long_clauses: solver.num_long_clauses(),
            num_bin_clauses: solver.num_bin_irred() + solver.num_bin_red(),
            num_learnts: solver.num_learnts(),
            num_decisions: solver.num_decisions(),
            num_propagations: solver.num_propagations(),
            num_conflicts: solver.num_conflicts(),
            num_restarts: solver.num_restarts(),
            num_reduces: solver.num_reduces(),
        };
        serde_json::to_writer_pretty(File::create(output)?, &summary)?;
    }

    Ok(match result {
        SolveResult::Sat => ExitCode::from(10),
        SolveResult::Unsat => ExitCode::from(20),
        SolveResult::Unknown => ExitCode::from(0),
    })
}

fn print_result(solver: &Solver, result: SolveResult) {
    match result {
        SolveResult::Sat => {
            println!("s SATISFIABLE");
            let mut line = String::from("v");
            for (v, &value) in solver.model().iter().enumerate() {
                let lit = if value == flint_sat::lbool::LBool::False {
                    -((v + 1) as i64)
                } else {
                    (v + 1) as i64
                };
                line.push_str(&format!(" {lit}"));
                if line.len() > 70 {
                    println!("{line}");
                    line = String::from("v");
                }
            }
            println!("{line} 0");
        }
        SolveResult::Unsat => {
            println!("s UNSATISFIABLE");
            if !solver.final_conflict().is_empty() {
                let core = solver
                    .final_conflict()
                    .iter()
                    .map(|l| l.to_external().to_string())
                    .collect::<Vec<_>>()
                    .join(" ");
                println!("c core {core}");
            }
        }
        SolveResult::Unknown => println!("s UNKNOWN"),
    }
}

fn print_stats(solver: &Solver, time_total: Duration) {
    eprintln!("c vars:         {}", solver.num_vars());
    eprintln!(
        "c clauses:      {} long, {} binary",
        solver.num_long_clauses(),
        solver.num_bin_irred()
    );
    let (units, bins, longs) = solver.num_learnt_kinds();
    eprintln!(
        "c learnts:      {} live ({} units, {} binary, {} long learnt)",
        solver.num_learnts(),
        units,
        bins,
        longs
    );
    eprintln!("c decisions:    {}", solver.num_decisions());
    eprintln!("c propagations: {}", solver.num_propagations());
    eprintln!("c conflicts:    {}", solver.num_conflicts());
    eprintln!("c restarts:     {}", solver.num_restarts());
    eprintln!("c reduces:      {}", solver.num_reduces());
    eprintln!("c time:         {time_total:?}");
}
