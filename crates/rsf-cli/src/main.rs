mod settings;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rsf_core::{Basis, Grid, RecursionEngine, SolverOutcome, TracingObserver, trace_particles};
use rsf_store::{ArtifactStore, RunReport};

use crate::settings::FileConfig;

#[derive(Parser)]
#[command(name = "rsf", about = "Resonant scalar field solver")]
struct Cli {
    /// TOML file with [solver] and [tracer] tables
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the recursion and write field, gradient map, and report
    Run {
        /// Output directory
        #[arg(long, default_value = "rsf-out")]
        out: PathBuf,

        /// Override the iteration budget
        #[arg(long)]
        iterations: Option<usize>,

        /// Log a checkpoint every K iterations (0 disables)
        #[arg(long)]
        report_every: Option<usize>,
    },

    /// Run the recursion, then trace test particles through the final field
    Trace {
        /// Output directory
        #[arg(long, default_value = "rsf-out")]
        out: PathBuf,

        /// Override the iteration budget
        #[arg(long)]
        iterations: Option<usize>,

        #[arg(long)]
        particles: Option<usize>,

        #[arg(long)]
        steps: Option<usize>,

        /// RNG seed for launch positions
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Build the grid and basis only, and print each mode's squared norm
    Basis,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = FileConfig::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::Run {
            out,
            iterations,
            report_every,
        } => cmd_run(config, out, *iterations, *report_every),
        Commands::Trace {
            out,
            iterations,
            particles,
            steps,
            seed,
        } => cmd_trace(config, out, *iterations, *particles, *steps, *seed),
        Commands::Basis => cmd_basis(&config),
    }
}

fn run_solver(
    mut config: FileConfig,
    iterations: Option<usize>,
    report_every: Option<usize>,
) -> Result<SolverOutcome> {
    if let Some(n) = iterations {
        config.solver.n_iterations = n;
    }
    if let Some(k) = report_every {
        config.solver.report_every = k;
    }
    let engine = RecursionEngine::new(config.solver).context("failed to build solver")?;
    tracing::info!(coherence = engine.observe().coherence, "initial field built");
    engine
        .run_with(&mut TracingObserver)
        .context("recursion failed")
}

fn cmd_run(
    config: FileConfig,
    out: &Path,
    iterations: Option<usize>,
    report_every: Option<usize>,
) -> Result<()> {
    let outcome = run_solver(config, iterations, report_every)?;

    let store = ArtifactStore::open(out)
        .with_context(|| format!("failed to open output dir {}", out.display()))?;
    store
        .write_field(outcome.field.view())
        .context("failed to write field")?;
    store
        .write_gradient_map(&outcome.grid, outcome.field.view())
        .context("failed to export gradient map")?;
    let report = RunReport::from_outcome(&outcome);
    store
        .write_report(&report)
        .context("failed to write report")?;

    if let Some(initial) = report.initial_coherence {
        println!("initial coherence: {initial:.9}");
    }
    println!("final coherence:   {:.12}", report.final_coherence);
    for (l, c) in report.final_coefficients.iter() {
        println!("  l={l:<3} c={c:+.6e}");
    }
    println!("iterations:        {}", report.iterations);
    println!("artifacts:         {}", store.root().display());
    Ok(())
}

fn cmd_trace(
    config: FileConfig,
    out: &Path,
    iterations: Option<usize>,
    particles: Option<usize>,
    steps: Option<usize>,
    seed: Option<u64>,
) -> Result<()> {
    let mut tracer = config.tracer.clone();
    if let Some(n) = particles {
        tracer.n_particles = n;
    }
    if let Some(n) = steps {
        tracer.n_steps = n;
    }
    if let Some(s) = seed {
        tracer.seed = s;
    }
    tracer.validate().context("invalid tracer settings")?;

    let outcome = run_solver(config, iterations, None)?;
    let trajectories = trace_particles(&outcome.grid, outcome.field.view(), &tracer)
        .context("particle tracing failed")?;

    let store = ArtifactStore::open(out)
        .with_context(|| format!("failed to open output dir {}", out.display()))?;
    let path = store
        .write_trajectories(trajectories.view())
        .context("failed to write trajectories")?;

    println!("final coherence:   {:.12}", outcome.final_coherence());
    println!(
        "traced {} particles x {} steps → {}",
        tracer.n_particles,
        tracer.n_steps,
        path.display()
    );
    Ok(())
}

fn cmd_basis(config: &FileConfig) -> Result<()> {
    let solver = &config.solver;
    solver.validate().context("invalid solver settings")?;
    let grid = Grid::new(solver.outer_radius, solver.nr, solver.ntheta)
        .context("failed to build grid")?;
    let basis = Basis::build(&grid, &solver.modes).context("failed to build basis")?;

    println!("grid:        {} x {} (ntheta x nr), a={}", grid.ntheta, grid.nr, grid.outer_radius);
    for mode in basis.modes() {
        println!("  l={:<3} ‖B‖²={:.6e}", mode.l, mode.norm_sq);
    }
    println!("max overlap: {:.3e}", basis.max_overlap());
    Ok(())
}
