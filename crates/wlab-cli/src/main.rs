//! Water-Filling Command-Line Interface
//!
//! This CLI provides tools for:
//! - Solving a water-filling allocation for given channel floors or SNRs
//! - Simulating runs over random Rayleigh sub-channels
//! - Printing the effective or an example configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use wlab_core::observe::{init_logging, LogLevel};
use wlab_core::{
    exact_water_level, Allocation, BracketStrategy, CapacityComparison, SolveTrace, WlabConfig,
};
use wlab_sim::{ChannelConfig, Run, RunConfig, RunResult, SubChannel};

#[derive(Parser)]
#[command(name = "wlab")]
#[command(author, version, about = "Water-filling power allocation explorer", long_about = None)]
struct Cli {
    /// Enable verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (overrides the search path)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Solver overrides shared by `solve` and `simulate`
#[derive(clap::Args, Debug, Clone, Default)]
struct SolverArgs {
    /// Total power budget
    #[arg(short, long)]
    power: Option<f64>,

    /// Convergence tolerance on |allocated - budget|
    #[arg(long)]
    tolerance: Option<f64>,

    /// Bisection iteration cap
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Initial bracket (analytic, snr-range)
    #[arg(long)]
    bracket: Option<BracketStrategy>,
}

/// Output options shared by `solve` and `simulate`
#[derive(clap::Args, Debug, Clone, Default)]
struct OutputArgs {
    /// Print every bisection step
    #[arg(long)]
    trace: bool,

    /// Emit JSON instead of tables
    #[arg(long)]
    json: bool,

    /// Fail if the solve hits the iteration cap
    #[arg(long)]
    strict: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Water-fill a power budget over known channels
    Solve {
        /// Channel floors 1/SNR, comma separated
        #[arg(long, value_delimiter = ',', required_unless_present = "snr", conflicts_with = "snr")]
        inv_snr: Vec<f64>,

        /// Channel SNRs (linear), comma separated
        #[arg(long, value_delimiter = ',')]
        snr: Vec<f64>,

        #[command(flatten)]
        solver: SolverArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Draw Rayleigh sub-channels and water-fill over them
    Simulate {
        /// Number of sub-channels
        #[arg(short, long)]
        channels: Option<usize>,

        /// Noise power per sub-channel
        #[arg(long)]
        noise: Option<f64>,

        /// RNG seed for a reproducible draw
        #[arg(long)]
        seed: Option<u64>,

        /// Number of independent draws
        #[arg(long, default_value = "1")]
        runs: usize,

        #[command(flatten)]
        solver: SolverArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show configuration
    Config {
        /// Print an example configuration instead of the effective one
        #[arg(long)]
        example: bool,

        /// Write the configuration to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// JSON report for `solve`
#[derive(Serialize)]
struct SolveReport<'a> {
    inv_snr: &'a [f64],
    allocation: &'a Allocation,
    exact_water_level: f64,
    comparison: &'a CapacityComparison,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace: Option<&'a SolveTrace>,
}

fn load_config(path: &Option<PathBuf>) -> Result<WlabConfig> {
    let config = match path {
        Some(path) => WlabConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => WlabConfig::load().context("Failed to load config")?,
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn apply_solver_args(config: &mut WlabConfig, args: &SolverArgs) {
    if let Some(power) = args.power {
        config.solver.total_power = power;
    }
    if let Some(tolerance) = args.tolerance {
        config.solver.tolerance = tolerance;
    }
    if let Some(max_iterations) = args.max_iterations {
        config.solver.max_iterations = max_iterations;
    }
    if let Some(bracket) = args.bracket {
        config.solver.bracket = bracket;
    }
}

fn parse_floors(inv_snr: Vec<f64>, snr: Vec<f64>) -> Result<Vec<f64>> {
    if !inv_snr.is_empty() {
        return Ok(inv_snr);
    }
    if let Some(bad) = snr.iter().find(|&&g| !(g.is_finite() && g > 0.0)) {
        anyhow::bail!("Invalid SNR: {}. Must be positive and finite", bad);
    }
    Ok(snr.iter().map(|g| 1.0 / g).collect())
}

fn check_strict(alloc: &Allocation, output: &OutputArgs) -> Result<()> {
    if output.strict && !alloc.converged {
        anyhow::bail!(
            "Solve did not converge after {} iterations (error {:.3e})",
            alloc.iterations,
            alloc.final_error
        );
    }
    Ok(())
}

fn print_trace(trace: &SolveTrace) {
    println!();
    println!("Bisection steps:");
    println!(
        "  {:>5}  {:>12}  {:>12}  {:>12}  {:>12}  {:>12}",
        "iter", "mu_low", "mu_high", "mu_mid", "level", "error"
    );
    for rec in trace.iter() {
        println!(
            "  {:>5}  {:>12.6}  {:>12.6}  {:>12.6}  {:>12.6}  {:>12.3e}",
            rec.iteration,
            rec.mu_low,
            rec.mu_high,
            rec.mu_mid,
            rec.water_level(),
            rec.error
        );
    }
}

fn print_allocation(inv_snr: &[f64], alloc: &Allocation, budget: f64) {
    println!(
        "  {:>3}  {:>10}  {:>10}  {:>10}  {:>10}",
        "ch", "1/SNR", "SNR (dB)", "power", "level"
    );
    for (i, (&floor, &power)) in inv_snr.iter().zip(&alloc.powers).enumerate() {
        let marker = if power > 0.0 { "" } else { "  (dry)" };
        println!(
            "  {:>3}  {:>10.4}  {:>10.2}  {:>10.4}  {:>10.4}{}",
            i + 1,
            floor,
            -10.0 * floor.log10(),
            power,
            alloc.levels[i],
            marker
        );
    }
    println!();
    println!("  Water level:       {:.6}", alloc.water_level);
    println!("  Allocated power:   {:.6} / {:.6}", alloc.total_power, budget);
    println!(
        "  Active channels:   {} / {}",
        alloc.active_channels(),
        alloc.num_channels()
    );
    println!(
        "  Iterations:        {}{}",
        alloc.iterations,
        if alloc.converged { "" } else { " (iteration cap reached)" }
    );
}

fn print_comparison(cmp: &CapacityComparison, trustworthy: bool) {
    println!();
    println!("Capacity (bits/channel use):");
    if !trustworthy {
        println!("  Not converged; comparison withheld");
        return;
    }
    println!("  Water-filling:     {:.4}", cmp.water_filling);
    println!("  Equal power:       {:.4}", cmp.equal_power);
    println!(
        "  Gain:              {:.4} ({:+.2}%)",
        cmp.gain(),
        cmp.improvement_percent()
    );
}

fn cmd_solve(
    config: &mut WlabConfig,
    inv_snr: Vec<f64>,
    snr: Vec<f64>,
    solver_args: SolverArgs,
    output: OutputArgs,
) -> Result<()> {
    apply_solver_args(config, &solver_args);
    let floors = parse_floors(inv_snr, snr)?;
    let solver = config.solver.solver();

    let (alloc, trace) = solver
        .solve_traced(&floors)
        .context("Water-filling solve failed")?;
    let snrs: Vec<f64> = floors.iter().map(|a| 1.0 / a).collect();
    let comparison = CapacityComparison::compute(&snrs, &alloc.powers, solver.total_power)?;
    let exact = exact_water_level(&floors, solver.total_power)?;

    if output.json {
        let report = SolveReport {
            inv_snr: &floors,
            allocation: &alloc,
            exact_water_level: exact,
            comparison: &comparison,
            trace: output.trace.then_some(&trace),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return check_strict(&alloc, &output);
    }

    println!("=== Water-Filling Solve ===");
    println!(
        "Budget {:.4}, tolerance {:.1e}, cap {}, bracket {}",
        solver.total_power, solver.tolerance, solver.max_iterations, solver.bracket
    );
    println!();
    print_allocation(&floors, &alloc, solver.total_power);
    println!("  Exact water level: {:.6}", exact);
    print_comparison(&comparison, alloc.converged);
    if output.trace {
        print_trace(&trace);
    }

    check_strict(&alloc, &output)
}

fn print_run(index: usize, result: &RunResult, budget: f64) {
    let floors: Vec<f64> = result.channels.iter().map(|ch| ch.inv_snr).collect();
    println!("--- Draw {} ---", index + 1);
    print_channels(&result.channels);
    println!();
    print_allocation(&floors, &result.allocation, budget);
    print_comparison(&result.comparison, result.is_trustworthy());
}

fn print_channels(channels: &[SubChannel]) {
    println!("  {:>3}  {:>10}  {:>10}", "ch", "|h|^2", "SNR");
    for ch in channels {
        println!("  {:>3}  {:>10.4}  {:>10.4}", ch.index, ch.gain, ch.snr);
    }
}

fn cmd_simulate(
    config: &mut WlabConfig,
    channels: Option<usize>,
    noise: Option<f64>,
    seed: Option<u64>,
    runs: usize,
    solver_args: SolverArgs,
    output: OutputArgs,
) -> Result<()> {
    apply_solver_args(config, &solver_args);
    if let Some(n) = channels {
        config.channels.num_channels = n;
    }
    if let Some(noise) = noise {
        config.channels.noise_power = noise;
    }
    if seed.is_some() {
        config.channels.seed = seed;
    }
    if runs == 0 {
        anyhow::bail!("--runs must be at least 1");
    }

    let run_config = RunConfig::from(&*config);
    let budget = run_config.solver.total_power;
    let mut run = Run::new(run_config).context("Invalid channel settings")?;

    let mut results = Vec::with_capacity(runs);
    for _ in 0..runs {
        results.push(run.reset().context("Run failed")?);
    }

    if output.json {
        if output.trace {
            println!("{}", serde_json::to_string_pretty(&results)?);
        } else {
            let trimmed: Vec<_> = results
                .iter()
                .map(|r| RunResult {
                    trace: SolveTrace::default(),
                    ..r.clone()
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&trimmed)?);
        }
    } else {
        let ChannelConfig {
            num_channels,
            noise_power,
            seed,
        } = ChannelConfig::from(&config.channels);
        println!("=== Water-Filling Simulation ===");
        println!(
            "{} Rayleigh sub-channels, noise power {:.3}, budget {:.3}, seed {}",
            num_channels,
            noise_power,
            budget,
            seed.map_or_else(|| "random".to_string(), |s| s.to_string())
        );
        println!();
        for (i, result) in results.iter().enumerate() {
            print_run(i, result, budget);
            if output.trace {
                print_trace(&result.trace);
            }
            println!();
        }

        if runs > 1 {
            let trusted: Vec<_> = results.iter().filter(|r| r.is_trustworthy()).collect();
            if !trusted.is_empty() {
                let mean_gain = trusted.iter().map(|r| r.comparison.gain()).sum::<f64>()
                    / trusted.len() as f64;
                println!("Mean gain over {} draws: {:.4} bits", trusted.len(), mean_gain);
            }
        }
    }

    for result in &results {
        check_strict(&result.allocation, &output)?;
    }
    Ok(())
}

fn cmd_config(config: &WlabConfig, example: bool, output: Option<PathBuf>) -> Result<()> {
    let yaml = if example {
        WlabConfig::example_yaml()
    } else {
        config.to_yaml()?
    };

    match output {
        Some(path) => {
            std::fs::write(&path, yaml)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => print!("{}", yaml),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;

    let mut log_config = config.logging.clone();
    if cli.verbose > 0 {
        log_config.level = LogLevel::from_verbosity(cli.verbose);
    }
    init_logging(&log_config);
    tracing::debug!(
        total_power = config.solver.total_power,
        bracket = %config.solver.bracket,
        channels = config.channels.num_channels,
        "configuration loaded"
    );

    match cli.command {
        Commands::Solve {
            inv_snr,
            snr,
            solver,
            output,
        } => cmd_solve(&mut config, inv_snr, snr, solver, output),

        Commands::Simulate {
            channels,
            noise,
            seed,
            runs,
            solver,
            output,
        } => cmd_simulate(&mut config, channels, noise, seed, runs, solver, output),

        Commands::Config { example, output } => cmd_config(&config, example, output),
    }
}
