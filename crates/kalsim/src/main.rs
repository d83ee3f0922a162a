use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kalsim::engine::LogWriter;
use kalsim::models::{ActionType, KalsimConfig};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "config/kalsim.toml";

#[derive(Parser, Debug)]
#[command(name = "kalsim", about = "Layered psychological agent simulation of a meme-stock squeeze")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one simulation and print its metadata as JSON
    Run {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,

        /// Simulated days
        #[arg(long)]
        days: Option<u32>,

        /// Number of agents
        #[arg(long)]
        agents: Option<usize>,

        /// Seed for every random draw
        #[arg(long)]
        seed: Option<u64>,

        /// Where to write the simulation log
        #[arg(short, long)]
        output: Option<String>,

        /// Use the offline mock model
        #[arg(long)]
        mock: bool,
    },
    /// Summarize a saved simulation log
    Summarize {
        /// Path to a simulation log
        #[arg(short, long)]
        log: String,
    },
}

fn load_config(path: Option<&str>) -> Result<KalsimConfig> {
    let path = match path {
        Some(p) => p,
        None if Path::new(DEFAULT_CONFIG).exists() => DEFAULT_CONFIG,
        None => return Ok(KalsimConfig::default()),
    };
    let config_str =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read config: {path}"))?;
    toml::from_str(&config_str).with_context(|| format!("Failed to parse config: {path}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            config,
            days,
            agents,
            seed,
            output,
            mock,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(days) = days {
                config.simulation.days = days;
            }
            if let Some(agents) = agents {
                config.simulation.agent_count = agents;
            }
            if seed.is_some() {
                config.simulation.seed = seed;
            }
            if let Some(output) = output {
                config.simulation.output_path = output;
            }

            let mut simulation =
                kalsim::build_simulation(&config, mock).context("Failed to build simulation")?;

            let cancel = simulation.cancel_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Received Ctrl-C, stopping after the current step");
                    cancel.cancel();
                }
            });

            let log = simulation
                .run()
                .await
                .context("Simulation failed")?;

            println!("{}", serde_json::to_string_pretty(&log.metadata)?);
        }
        Command::Summarize { log } => {
            let log = LogWriter::new(&log)
                .load()
                .with_context(|| format!("Failed to load simulation log: {log}"))?;
            let summary = serde_json::json!({
                "metadata": log.metadata,
                "tweets": log.count_of(ActionType::Tweet),
                "holds": log.count_of(ActionType::Hold),
                "lurks": log.count_of(ActionType::Lurk),
                "final_price": log.final_price(),
                "peak_price": log.peak_price(),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
