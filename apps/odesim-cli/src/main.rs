use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

use odesim_sim::{
    Config, IntegratorType, ResultsLogger, SimError, SimResult, Simulation, load_json, load_yaml,
};

mod systems;

#[derive(Parser)]
#[command(name = "odesim")]
#[command(about = "odesim - ODE simulation with pluggable solvers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a built-in system and print its results table
    Run {
        /// System name (see `odesim systems`)
        system: String,
        /// Solver to use, overriding the configuration file
        #[arg(long)]
        solver: Option<IntegratorType>,
        /// Number of domain steps
        #[arg(long)]
        steps: Option<usize>,
        /// End of the domain
        #[arg(long)]
        t_end: Option<f64>,
        /// Configuration file (JSON when the extension is .json, YAML otherwise)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Column separator
        #[arg(long)]
        separator: Option<String>,
        /// Significant digits for logged values
        #[arg(long)]
        precision: Option<usize>,
        /// Log only the state at each domain step, not every sub-state
        #[arg(long)]
        domain_only: bool,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List built-in systems
    Systems,
    /// List available solvers
    Solvers,
}

struct RunArgs {
    system: String,
    solver: Option<IntegratorType>,
    steps: Option<usize>,
    t_end: Option<f64>,
    config: Option<PathBuf>,
    separator: Option<String>,
    precision: Option<usize>,
    domain_only: bool,
    output: Option<PathBuf>,
}

fn main() -> SimResult<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            system,
            solver,
            steps,
            t_end,
            config,
            separator,
            precision,
            domain_only,
            output,
        } => cmd_run(RunArgs {
            system,
            solver,
            steps,
            t_end,
            config,
            separator,
            precision,
            domain_only,
            output,
        }),
        Commands::Systems => cmd_systems(),
        Commands::Solvers => cmd_solvers(),
    }
}

fn load_config(path: &Path) -> SimResult<Config> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => load_json(path),
        _ => load_yaml(path),
    }
}

/// Merges the configuration file with command-line overrides.
fn build_config(args: &RunArgs) -> SimResult<Config> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    if let Some(solver) = args.solver {
        config.algorithm.solver = Some(solver);
    }
    if let Some(separator) = &args.separator {
        config.log.separator = separator.clone();
    }
    if args.precision.is_some() {
        config.log.precision = args.precision;
    }
    if args.domain_only {
        config.log.all_states = false;
    }
    config.validate()?;
    Ok(config)
}

fn cmd_run(args: RunArgs) -> SimResult<()> {
    let system = systems::lookup(&args.system).ok_or(SimError::InvalidArg {
        what: "unknown system name; see `odesim systems`",
    })?;
    let config = build_config(&args)?;
    let solver = config.algorithm.solver;

    let mut sim = Simulation::with_config(config);
    sim.set_x0_from_map(system.x0);
    sim.set_diff_from_map(system.diffs);
    sim.set_timespan(
        0.0,
        args.t_end.unwrap_or(system.t_end),
        args.steps.unwrap_or(system.steps),
    )?;

    let logger = match &args.output {
        Some(path) => ResultsLogger::new(BufWriter::new(File::create(path)?)),
        None => ResultsLogger::stdout(),
    };
    sim.set_logger(logger);

    let started = Instant::now();
    sim.begin()?;

    eprintln!(
        "✓ {} with {}: {} steps to t = {} in {:.1?}",
        system.name,
        solver.map(IntegratorType::name).unwrap_or("none"),
        sim.steps_taken(),
        sim.current_time(),
        started.elapsed()
    );
    if sim.rejected_sub_steps() > 0 {
        eprintln!("  {} rejected sub-steps", sim.rejected_sub_steps());
    }
    if let Some(path) = &args.output {
        eprintln!("  results written to {}", path.display());
    }
    Ok(())
}

fn cmd_systems() -> SimResult<()> {
    println!("Built-in systems:");
    for name in systems::NAMES {
        if let Some(system) = systems::lookup(name) {
            println!(
                "  {} - {} ({} states, t_end {}, {} steps)",
                system.name,
                system.description,
                system.x0.len(),
                system.t_end,
                system.steps
            );
        }
    }
    Ok(())
}

fn cmd_solvers() -> SimResult<()> {
    println!("Solvers:");
    for solver in IntegratorType::ALL {
        println!("  {solver}");
    }
    Ok(())
}
