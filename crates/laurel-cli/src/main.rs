//! Laurel CLI
//!
//! Operator command-line interface for the Laurel payout engine.

mod config;
mod simulate;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "laurel")]
#[command(version = "0.1.0")]
#[command(about = "Laurel - referral commission and leaderboard incentive engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Output path for the configuration
        #[arg(short, long, default_value = "laurel.toml")]
        output: PathBuf,
    },

    /// Validate the configuration and the commission plan it describes
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "laurel.toml")]
        config: PathBuf,
    },

    /// Run an end-to-end payout simulation
    Simulate {
        /// Configuration file path
        #[arg(short, long, default_value = "laurel.toml")]
        config: PathBuf,

        /// Number of participants in the referral network
        #[arg(short, long, default_value = "12")]
        participants: usize,

        /// Number of investment events to replay
        #[arg(short, long, default_value = "40")]
        investments: usize,

        /// RNG seed for a reproducible run
        #[arg(short, long)]
        seed: Option<u64>,
    },
}

fn init_tracing(verbose: bool, logging: &config::LoggingConfig) {
    let fallback = if verbose { "debug" } else { &logging.level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { output } => {
            init_tracing(cli.verbose, &config::LoggingConfig::default());
            let rendered = toml::to_string_pretty(&config::CliConfig::default())
                .context("rendering default configuration")?;
            std::fs::write(&output, rendered)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("wrote default configuration to {}", output.display());
        }

        Commands::Check { config: path } => {
            let cfg = config::load(&path)?;
            init_tracing(cli.verbose, &cfg.logging);

            let plan = cfg.plan.to_plan(chrono::Utc::now());
            plan.validate().context("commission plan invalid")?;
            println!(
                "plan '{}': {} levels, unit price {}",
                plan.name, plan.max_levels, plan.unit_price
            );
            println!(
                "leaderboard: threshold {}, top {} win prizes",
                cfg.leaderboard.qualification_threshold, cfg.leaderboard.max_winners
            );
            println!("configuration OK");
        }

        Commands::Simulate {
            config: path,
            participants,
            investments,
            seed,
        } => {
            let cfg = config::load(&path)?;
            init_tracing(cli.verbose, &cfg.logging);

            simulate::run(
                &cfg,
                &simulate::SimulationParams {
                    participants,
                    investments,
                    seed,
                },
            )?;
        }
    }

    Ok(())
}
