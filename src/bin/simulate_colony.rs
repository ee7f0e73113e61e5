//! Generate a seeded random colony and run one allocation pass over it
//!
//! Handy for producing input files for `priority_allocator` and for eyeballing
//! how a table distributes work.

use std::path::PathBuf;

use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use priority_allocator::persistence::JsonFileStore;
use priority_allocator::telemetry;
use priority_allocator::{
    AllocationParams, Colony, JobCategoryId, Priority, PrioritySession, Quantity,
};

#[derive(Parser, Debug)]
#[command(name = "simulate_colony")]
#[command(about = "Allocate work priorities for a random colony")]
struct Args {
    /// Random seed (uses random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of colonists
    #[arg(short, long, default_value = "12")]
    workers: usize,

    /// Passion multiplier
    #[arg(long, default_value = "1.0")]
    passion_mult: f64,

    /// Write the generated colony (with assigned priorities) to this file
    #[arg(long)]
    colony_out: Option<PathBuf>,

    /// Write the allocation table to this file
    #[arg(long)]
    state_out: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Starter table: (priority, max jobs, [(category, fraction)])
const STARTER_TIERS: &[(u32, u32, &[(&str, f64)])] = &[
    (1, 4, &[("Firefighter", 1.0), ("Patient", 1.0), ("Doctor", 0.2), ("Cooking", 0.2)]),
    (2, 3, &[("Construction", 0.3), ("Growing", 0.3), ("Mining", 0.2), ("Hunting", 0.15)]),
    (3, 4, &[("Crafting", 0.2), ("Smithing", 0.1), ("Tailoring", 0.1), ("Research", 0.25)]),
    (4, 19, &[("Hauling", 0.6), ("Cleaning", 0.5), ("PlantCutting", 0.3), ("Basic", 0.4)]),
];

fn main() {
    let args = Args::parse();
    if let Err(e) = telemetry::init(&args.log_level) {
        eprintln!("Logging disabled: {}", e);
    }

    let seed = args.seed.unwrap_or_else(|| rand::random());
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    println!("Generating colony with seed: {}", seed);

    let mut colony = Colony::random(args.workers, &mut rng);
    println!(
        "Created {} colonists over {} job categories",
        colony.workers.len(),
        colony.categories.len()
    );

    let params = AllocationParams {
        passion_multiplier: args.passion_mult,
        ..AllocationParams::default()
    };
    let mut session = PrioritySession::new(params);
    session.rebuild(&colony);
    for &(priority, max_jobs, cells) in STARTER_TIERS {
        let tier = session.add_tier();
        session.table_mut().set_priority(tier, Priority(priority));
        session.set_max_jobs(tier, max_jobs);
        for &(name, fraction) in cells {
            session
                .table_mut()
                .set_quantity(tier, &JobCategoryId::new(name), Quantity::percent(fraction));
        }
    }
    session.table_mut().set_important(&JobCategoryId::new("Firefighter"), true);

    let (_, report) = session.run(&mut colony);

    println!();
    for worker in &colony.workers {
        let jobs: Vec<String> = worker
            .priorities
            .iter()
            .map(|(category, priority)| format!("{}={}", category, priority))
            .collect();
        println!("{:<10} {}", worker.name, jobs.join(" "));
    }

    let shortages = report.plan.shortages().count();
    println!();
    println!(
        "Assigned {} priorities ({} cells short of workers)",
        report.applied, shortages
    );

    if let Some(path) = &args.colony_out {
        match colony.save(path) {
            Ok(()) => println!("Wrote colony to {}", path.display()),
            Err(e) => eprintln!("Failed to write colony: {}", e),
        }
    }
    if let Some(path) = &args.state_out {
        let store = JsonFileStore::new(path);
        if session.save(&store).is_ok() {
            println!("Wrote allocation table to {}", path.display());
        }
    }
}
