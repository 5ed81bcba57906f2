//! Truss Evolution CLI - Run an evolution from a JSON run configuration.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use truss_evolution::{
    compute::evolution::{JsonReporter, LogReporter, Reporter, run_objective},
    schema::RunConfig,
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <run.json> [generations]", args[0]);
        eprintln!();
        eprintln!("Evolve a truss from a JSON run configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  run.json     Path to the run configuration file");
        eprintln!("  generations  Override the configured generation limit");
        eprintln!();
        eprintln!("An example configuration is printed with the --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);

    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let mut config: RunConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    if let Some(generations) = args.get(2) {
        config.evolution.generation_limit = generations.parse().unwrap_or_else(|e| {
            eprintln!("Error parsing generations: {}", e);
            std::process::exit(1);
        });
    }

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    println!("Truss Evolution");
    println!("===============");
    println!("Objective: {}", config.objective.name());
    println!(
        "Population: {} | Generations: {} | Replacement: {:.0}%",
        config.evolution.population_size,
        config.evolution.generation_limit,
        config.evolution.replacement_percentage * 100.0
    );
    println!(
        "Member length: {:.1}..{:.1} m | Elasticity: {:.3e} Pa | Density: {:.0} kg/m³",
        config.topology.min_vertex_distance,
        config.topology.max_edge_length,
        config.topology.elasticity,
        config.topology.density
    );
    println!();

    let reporter: Box<dyn Reporter> = match &config.output_dir {
        Some(dir) => match JsonReporter::new(dir) {
            Ok(reporter) => {
                println!("Writing artifacts to {}", reporter.output_dir().display());
                Box::new(reporter)
            }
            Err(e) => {
                eprintln!("Error creating output directory {}: {}", dir, e);
                std::process::exit(1);
            }
        },
        None => Box::new(LogReporter),
    };

    println!("Running evolution...");
    let start = Instant::now();

    let result = run_objective(&config, reporter).unwrap_or_else(|e| {
        eprintln!("Evolution failed: {}", e);
        std::process::exit(1);
    });

    let elapsed = start.elapsed();

    println!();
    println!("Result after {} generations:", result.generations);
    println!("  Best fitness: {:.6e}", result.best_fitness);
    println!("  Material: {:.1} kg", result.best_material);
    println!("  Max stress: {:.4e} Pa", result.best_max_stress);
    if let Some(summary) = &result.summary {
        println!(
            "  Best top mean: {:.6e} (generation {})",
            summary.best_mean.value, summary.best_mean.generation
        );
        println!(
            "  Lowest top std dev: {:.6e} (generation {})",
            summary.min_std_dev.value, summary.min_std_dev.generation
        );
    }
    println!(
        "Time: {:.2}s ({:.2} generations/s)",
        elapsed.as_secs_f32(),
        result.generations as f32 / elapsed.as_secs_f32()
    );
}

fn print_example_config() {
    match serde_json::to_string_pretty(&RunConfig::default()) {
        Ok(json) => {
            println!("Example configuration (run.json):");
            println!("{}", json);
        }
        Err(e) => {
            eprintln!("Error serializing example config: {}", e);
            std::process::exit(1);
        }
    }
}
