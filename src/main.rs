mod console;

use chorus_core::{
    config::{self, Config},
    participant::Participant,
};
use chorus_providers::build_generator;
use chorus_scheduler::{Orchestrator, Registration};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser)]
#[command(
    name = "chorus",
    version,
    about = "Chorus — a room full of AI participants that talk to you and to each other"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a conversation on the console.
    Start {
        /// Opening topic.
        #[arg(short, long)]
        topic: Option<String>,
    },
    /// Print the resolved configuration and participant table.
    Status,
    /// Validate the configuration and check backend availability.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;
    let _log_guard = init_logging(&cfg)?;

    match cli.command {
        Commands::Start { topic } => {
            let (registrations, excluded) = build_registrations(&cfg);
            for (id, err) in &excluded {
                warn!("participant '{id}' excluded: {err}");
            }
            if registrations.is_empty() {
                anyhow::bail!(
                    "No usable participants. Add [[participants]] entries to {}.",
                    cli.config
                );
            }
            for reg in &registrations {
                if !reg.generator.is_available().await {
                    warn!(
                        "participant '{}': backend '{}' is not reachable yet",
                        reg.participant.id,
                        reg.generator.name()
                    );
                }
            }

            println!("Chorus — {} participants in #{}", registrations.len(), cfg.chorus.room);
            let orch = Orchestrator::new(cfg, registrations);
            orch.start();
            if let Some(topic) = topic {
                let author = orch.config().chorus.human_label.clone();
                orch.change_topic(&topic, &author).await?;
            }

            let result = console::run(orch.clone()).await;
            orch.teardown().await;
            info!("chorus: stopped");
            result?;
        }
        Commands::Status => {
            println!("Chorus — Status\n");
            println!("Config: {}", cli.config);
            println!("Room: #{} (human: {})", cfg.chorus.room, cfg.chorus.human_label);
            println!(
                "Sleep after {} unattended agent messages; context window {}",
                cfg.scheduler.sleep_threshold, cfg.scheduler.context_capacity
            );
            println!(
                "Autonomous chatter: {} (every {}-{}s, silent after {}s)",
                if cfg.autonomous.enabled { "on" } else { "off" },
                cfg.autonomous.min_delay_secs,
                cfg.autonomous.max_delay_secs,
                cfg.autonomous.silence_timeout_secs
            );
            println!();
            if cfg.participants.is_empty() {
                println!("  (no participants configured)");
            }
            for p in &cfg.participants {
                println!(
                    "  {:<12} {:<10} {:<9} {}{}",
                    p.id,
                    p.alias,
                    p.provider,
                    p.model.as_deref().unwrap_or("-"),
                    if p.active { "" } else { "  (inactive)" }
                );
            }
        }
        Commands::Check => {
            let (registrations, excluded) = build_registrations(&cfg);
            let (admitted, duplicates) = Orchestrator::admit(registrations);
            println!("Chorus — Config Check\n");
            for reg in &admitted {
                let reachable = reg.generator.is_available().await;
                println!(
                    "  {:<12} ok   {} ({})",
                    reg.participant.id,
                    reg.generator.name(),
                    if reachable { "reachable" } else { "not reachable" }
                );
            }
            for (id, err) in &excluded {
                println!("  {id:<12} FAIL {err}");
            }
            for err in &duplicates {
                println!("  {:<12} FAIL {err}", "-");
            }
            if admitted.is_empty() || !excluded.is_empty() || !duplicates.is_empty() {
                anyhow::bail!(
                    "{} participant(s) excluded",
                    excluded.len() + duplicates.len()
                );
            }
        }
    }

    Ok(())
}

/// Initialise tracing: `RUST_LOG` wins over the configured level; logs go to
/// stderr, or to a daily rolling file when `log_dir` is set.
fn init_logging(cfg: &Config) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.chorus.log_level));

    match cfg.chorus.log_dir.as_deref() {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, "chorus.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}

/// Build a registration per configured participant. Participants whose
/// setup fails are returned separately with the reason.
fn build_registrations(cfg: &Config) -> (Vec<Registration>, Vec<(String, String)>) {
    let mut registrations = Vec::new();
    let mut excluded = Vec::new();
    for pc in &cfg.participants {
        let built = Participant::from_config(pc)
            .and_then(|p| build_generator(pc, &cfg.provider).map(|g| Registration::new(p, g)));
        match built {
            Ok(reg) => registrations.push(reg),
            Err(e) => excluded.push((pc.id.clone(), e.to_string())),
        }
    }
    (registrations, excluded)
}
