use std::collections::BTreeSet;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info};

use intersection_sim::simulation::{
    ScenarioKind, ScenarioMetrics, ScenarioRunner, StrategyKind, DEFAULT_TICKS,
};

#[derive(Parser)]
#[command(name = "intersection_sim")]
#[command(about = "Compare fixed-time and adaptive signal control at one intersection")]
struct Cli {
    /// Scenarios to run (light, moderate, rush-hour, asymmetric); all when omitted
    #[arg(long, value_delimiter = ',')]
    scenarios: Vec<ScenarioKind>,

    /// Number of simulation ticks per scenario
    #[arg(long, default_value_t = DEFAULT_TICKS)]
    ticks: u64,

    /// Use random arrivals seeded with this value instead of evenly spaced ones
    #[arg(long)]
    seed: Option<u64>,

    /// Run scenarios on separate threads
    #[arg(long)]
    parallel: bool,

    /// Print the full metrics of every run
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let kinds: Vec<ScenarioKind> = if cli.scenarios.is_empty() {
        ScenarioKind::ALL.to_vec()
    } else {
        // Keep the first occurrence of each requested scenario
        let mut seen = BTreeSet::new();
        cli.scenarios
            .iter()
            .copied()
            .filter(|kind| seen.insert(*kind))
            .collect()
    };
    if cli.ticks == 0 {
        bail!("--ticks must be at least 1");
    }

    println!("Running intersection simulation in headless mode...");
    println!("Scenarios: {}, Ticks: {}", kinds.len(), cli.ticks);
    println!();

    let mut runner = ScenarioRunner::new();
    for &kind in &kinds {
        for strategy in StrategyKind::ALL {
            let config = match cli.seed {
                Some(seed) => kind.random_config(strategy, cli.ticks, seed),
                None => kind.config(strategy, cli.ticks),
            };
            runner.add(config)?;
        }
    }

    let results = if cli.parallel {
        runner.run_parallel()
    } else {
        runner.run()
    };

    let mut failures = 0;
    for kind in kinds {
        let fixed_name = format!("{}/{}", kind, StrategyKind::Fixed);
        let adaptive_name = format!("{}/{}", kind, StrategyKind::Adaptive);

        let fixed = results
            .get(&fixed_name)
            .with_context(|| format!("No result for {}", fixed_name))?;
        let adaptive = results
            .get(&adaptive_name)
            .with_context(|| format!("No result for {}", adaptive_name))?;

        match (fixed, adaptive) {
            (Ok(fixed), Ok(adaptive)) => print_comparison(kind, fixed, adaptive, cli.verbose),
            (fixed, adaptive) => {
                for (name, result) in [(&fixed_name, fixed), (&adaptive_name, adaptive)] {
                    if let Err(err) = result {
                        error!("Skipping {}: {}", name, err);
                        failures += 1;
                    }
                }
            }
        }
    }

    info!("=== SIMULATION COMPLETE ===");
    if failures > 0 {
        bail!("{} scenario(s) were misconfigured", failures);
    }
    Ok(())
}

fn print_comparison(
    kind: ScenarioKind,
    fixed: &ScenarioMetrics,
    adaptive: &ScenarioMetrics,
    verbose: bool,
) {
    println!("=== Scenario: {} ===", kind);
    println!(
        "{:<10} {:>10} {:>10} {:>10} {:>10} {:>9}",
        "strategy", "served", "avg wait", "avg queue", "thruput", "max wait"
    );
    for (strategy, metrics) in [(StrategyKind::Fixed, fixed), (StrategyKind::Adaptive, adaptive)] {
        println!(
            "{:<10} {:>10} {:>10.2} {:>10.2} {:>10.3} {:>9}",
            strategy.as_str(),
            metrics.vehicles_served,
            metrics.average_wait,
            metrics.average_queue_length,
            metrics.throughput,
            metrics.max_wait
        );
    }
    println!(
        "Adaptive wait change vs fixed: {:+.1}%",
        -adaptive.wait_improvement_over(fixed)
    );
    if verbose {
        println!("--- fixed ---");
        print!("{}", fixed);
        println!("--- adaptive ---");
        print!("{}", adaptive);
    }
    println!();
}
