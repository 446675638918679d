use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use ring_election::config::{PopulationConfig, RingConfig, SimulationConfig};
use ring_election::population::Population;
use ring_election::ring::ProcessSpec;
use ring_election::shutdown::install_shutdown_handler;
use ring_election::simulation::{RunReport, Simulation};

#[derive(Parser, Debug)]
#[command(name = "ring-election")]
#[command(version)]
#[command(about = "Chang-Roberts leader election on a simulated ring of processes")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Build a ring and run one election plus a watchdog cycle per process
    Run(RunArgs),

    /// Generate and print a population without running it
    Population {
        #[command(flatten)]
        population: PopulationArgs,

        /// Output format
        #[arg(long, short = 'o', default_value = "table")]
        output: OutputFormat,
    },
}

// =============================================================================
// Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct PopulationArgs {
    /// Number of processes in the ring (ignored when --ids is given)
    #[arg(long, short = 'n', default_value = "5")]
    processes: usize,

    /// Explicit identifiers in ring order (comma-separated).
    /// Example: "42,17,83,5,60"
    #[arg(long, value_delimiter = ',')]
    ids: Vec<u64>,

    /// Identifiers of dead processes, only used with --ids (comma-separated)
    #[arg(long, value_delimiter = ',', requires = "ids")]
    dead: Vec<u64>,

    /// Exclusive upper bound for generated identifiers
    #[arg(long, default_value = "100")]
    max_id: u64,

    /// Probability that a generated process starts dead
    #[arg(long, default_value = "0.2")]
    dead_probability: f64,

    /// Seed for reproducible populations
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Parser, Debug)]
struct RunArgs {
    #[command(flatten)]
    population: PopulationArgs,

    /// Process that starts the first election (default: highest live id)
    #[arg(long)]
    initiator: Option<u64>,

    /// Length of one protocol time unit in milliseconds
    #[arg(long, default_value = "1000")]
    time_unit_ms: u64,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

// =============================================================================
// Helper Functions
// =============================================================================

fn build_population(args: &PopulationArgs) -> ring_election::error::Result<Population> {
    if !args.ids.is_empty() {
        return Population::from_ids(&args.ids, &args.dead);
    }

    let mut config = PopulationConfig::new(args.processes)
        .with_max_id(args.max_id)
        .with_dead_probability(args.dead_probability);
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    Population::generate(&config)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_population(specs: &[ProcessSpec]) {
    println!("{:<6} {:<8} {:<6}", "SLOT", "ID", "ALIVE");
    println!("{}", "-".repeat(22));
    for (slot, spec) in specs.iter().enumerate() {
        println!("{:<6} {:<8} {:<6}", slot, spec.id, spec.alive);
    }
}

fn print_report(report: &RunReport) {
    println!("Run:        {}", report.run_id);
    println!("Started:    {}", report.started_at.to_rfc3339());
    println!("Initiator:  {}", report.initiator);
    match report.election {
        Some(outcome) => println!("Election:   {}", outcome),
        None => println!("Election:   failed"),
    }
    println!("Attempts:   {}", report.election_attempts);
    match report.leader_id {
        Some(id) => println!("Leader:     {}", id),
        None => println!("Leader:     none"),
    }
    if report.interrupted {
        println!("(interrupted)");
    }
    println!();
    println!("{:<8} {:<6} {:<20}", "ID", "ALIVE", "LISTENER");
    println!("{}", "-".repeat(36));
    for listener in &report.listeners {
        let outcome = listener
            .outcome
            .map(|o| o.to_string())
            .unwrap_or_else(|| "failed".to_string());
        println!(
            "{:<8} {:<6} {:<20}",
            listener.process_id, listener.alive, outcome
        );
    }
}

// =============================================================================
// Commands
// =============================================================================

async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let population = build_population(&args.population)?;

    let ring = RingConfig::default().with_time_unit(Duration::from_millis(args.time_unit_ms));
    let mut config = SimulationConfig::new(ring);
    if let Some(id) = args.initiator {
        config = config.with_initiator(id);
    }

    for (slot, spec) in population.specs().iter().enumerate() {
        tracing::info!(slot, process_id = spec.id, alive = spec.alive, "Process created");
    }

    let simulation = Simulation::new(config, population)?;
    let report = simulation.run(install_shutdown_handler()).await?;

    match args.output {
        OutputFormat::Table => print_report(&report),
        OutputFormat::Json => print_json(&report)?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Run(run_args) => run(run_args).await?,
        Commands::Population { population, output } => {
            let population = build_population(&population)?;
            match output {
                OutputFormat::Table => print_population(population.specs()),
                OutputFormat::Json => print_json(&population)?,
            }
        }
    }

    Ok(())
}
