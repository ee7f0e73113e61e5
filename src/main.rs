use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;

use priority_allocator::error::{ConfigError, PersistenceError};
use priority_allocator::persistence::JsonFileStore;
use priority_allocator::telemetry::{self, TelemetryError};
use priority_allocator::{AllocationParams, AssignmentReport, Colony, PrioritySession, TierOrder};

#[derive(Parser, Debug)]
#[command(name = "priority_allocator")]
#[command(about = "Assign work priorities to a colony from a tiered allocation table")]
struct Args {
    /// Colony description (categories, workers, skills) as JSON
    #[arg(short, long)]
    colony: PathBuf,

    /// Allocation table state file (created on --save if missing)
    #[arg(short, long)]
    state: Option<PathBuf>,

    /// Allocation parameters as JSON
    #[arg(short, long)]
    params: Option<PathBuf>,

    /// Passion multiplier (overrides the params file)
    #[arg(long)]
    passion_mult: Option<f64>,

    /// Minimum fitness for skilled categories (overrides the params file)
    #[arg(long)]
    min_fitness: Option<f64>,

    /// Process tiers in stored order instead of most urgent first
    #[arg(long)]
    stored_order: bool,

    /// Write assigned priorities back to the colony file and the table to the state file
    #[arg(long, requires = "state")]
    save: bool,

    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("unable to load colony {path}: {source}")]
    Colony {
        path: PathBuf,
        source: PersistenceError,
    },
    #[error("unable to save: {0}")]
    Save(#[from] PersistenceError),
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), CliError> {
    telemetry::init(&args.log_level)?;
    let params = resolve_params(&args)?;

    let mut colony = Colony::load(&args.colony).map_err(|source| CliError::Colony {
        path: args.colony.clone(),
        source,
    })?;
    println!(
        "Colony: {} workers, {} job categories",
        colony.workers.len(),
        colony.categories.len()
    );

    let store = args.state.as_ref().map(JsonFileStore::new);
    let mut session = match &store {
        Some(store) => PrioritySession::load(params, store, &colony),
        None => PrioritySession::new(params),
    };
    let (rebuild, report) = session.run(&mut colony);
    if !rebuild.faults.is_empty() {
        println!("Skipped {} worker/category pairs the colony could not answer", rebuild.faults.len());
    }

    print_report(&session, &report);

    if args.save {
        // clap guarantees --state alongside --save
        if let Some(store) = &store {
            session.save(store)?;
            println!("Saved allocation table to {}", store.path().display());
        }
        colony.save(&args.colony)?;
        println!("Saved priorities to {}", args.colony.display());
    }
    Ok(())
}

fn resolve_params(args: &Args) -> Result<AllocationParams, CliError> {
    let mut params = match &args.params {
        Some(path) => AllocationParams::load(path)?,
        None => AllocationParams::default(),
    };
    if let Some(mult) = args.passion_mult {
        params.passion_multiplier = mult;
    }
    if let Some(min) = args.min_fitness {
        params.minimum_fitness = min;
    }
    if args.stored_order {
        params.tier_order = TierOrder::Stored;
    }
    params.validate()?;
    Ok(params)
}

fn print_report(session: &PrioritySession, report: &AssignmentReport) {
    let table = session.table();
    if table.tiers.is_empty() {
        println!("Allocation table has no tiers, nothing to assign");
        return;
    }

    for (index, tier) in table.tiers.iter().enumerate() {
        println!();
        println!("Tier {} (priority {}, max {} jobs):", index, tier.priority, tier.max_jobs);
        for category in session.categories() {
            let quantity = tier.quantity(&category.id);
            if quantity.is_zero() {
                continue;
            }
            let names: Vec<String> = report
                .plan
                .for_category(&category.id)
                .filter(|a| a.tier == index)
                .map(|a| session.worker_label(a.worker).unwrap_or("?").to_string())
                .collect();
            println!("  {:<14} {:>6}  {}", category.id.as_str(), quantity.to_string(), names.join(", "));
        }
    }

    let shortages: Vec<_> = report.plan.shortages().collect();
    if !shortages.is_empty() {
        println!();
        println!("Shortages:");
        for fill in shortages {
            println!(
                "  tier {} {}: wanted {}, got {}",
                fill.tier, fill.category, fill.target, fill.assigned
            );
        }
    }

    for category in table.over_committed_categories(session.categories()) {
        println!("Warning: {} is allocated above 100% across tiers", category);
    }
    for priority in table.duplicate_priorities() {
        println!("Warning: priority {} is used by more than one tier", priority);
    }

    println!();
    println!(
        "Assigned {} of {} planned priorities",
        report.applied,
        report.total_planned()
    );
}
