//! Agent Orchestrator CLI
//!
//! Command-line interface for the autonomous agent orchestrator.
//! This CLI validates policy files, runs decision cycles for the agents they
//! declare, inspects persisted agent memory and manages configuration.

use std::path::{Path, PathBuf};

use agent_orchestrator_agent::{MemoryStore, PolicyFile};
use agent_orchestrator_core::config::{LogFormat, LoggingSettings};
use agent_orchestrator_core::OrchestratorConfig;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};

/// Agent Orchestrator CLI
#[derive(Parser, Debug)]
#[command(
    name = "agent-orchestrator",
    version = env!("CARGO_PKG_VERSION"),
    about = "Command-line interface for the autonomous agent orchestrator",
    long_about = "Run rule-driven autonomous agents against a blockchain: validate \
                 policies, execute decision cycles and inspect agent memory."
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "AGENT_ORCHESTRATOR_CONFIG")]
    config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

/// Main CLI commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Policy file commands
    #[command(subcommand, alias = "p")]
    Policy(PolicyCommands),

    /// Run decision cycles for the agents of a policy
    Run {
        /// Policy file (.yaml, .yml or .json)
        policy: PathBuf,

        /// Only run this agent
        #[arg(short, long)]
        agent: Option<String>,

        /// Number of cycles to run
        #[arg(short = 'n', long, default_value_t = 1)]
        cycles: u32,

        /// Seconds between cycles
        #[arg(short, long, default_value_t = 60)]
        interval: u64,

        /// Restore agent memory from snapshots before the first cycle
        #[arg(long)]
        restore: bool,
    },

    /// Agent memory snapshots
    #[command(subcommand, alias = "mem")]
    Memory(MemoryCommands),

    /// Configuration management
    #[command(subcommand, alias = "cfg")]
    Config(ConfigCommands),

    /// Show current version
    Version,
}

/// Policy subcommands
#[derive(Subcommand, Debug)]
enum PolicyCommands {
    /// Check that a policy loads and all references resolve
    Validate {
        /// Policy file
        file: PathBuf,
    },
}

/// Memory subcommands
#[derive(Subcommand, Debug)]
enum MemoryCommands {
    /// List agents with a snapshot
    List,

    /// Show one agent's memory
    Show {
        /// Agent ID
        agent: String,

        /// Print the full snapshot as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Configuration management subcommands
#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Write a default configuration file
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration
    Show {
        /// Show as JSON instead of YAML
        #[arg(short, long)]
        json: bool,
    },

    /// Check the configuration for invalid values
    Validate,
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("agent-orchestrator")
        .join("config.yaml")
}

/// Load the configuration file, falling back to defaults when it is missing
fn load_config(path: &Path) -> Result<OrchestratorConfig> {
    if path.exists() {
        OrchestratorConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))
    } else {
        Ok(OrchestratorConfig::default())
    }
}

/// Initialize logging from verbosity and the logging settings
fn init_logging(verbose: bool, settings: &LoggingSettings) {
    let level = if verbose {
        Level::DEBUG
    } else {
        settings.level.into()
    };

    let builder = tracing_subscriber::fmt().with_max_level(level);
    let installed = match settings.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    if let Err(e) = installed {
        eprintln!("Failed to install log subscriber: {}", e);
    }
}

/// Main entry point
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = load_config(&config_path)?;
    init_logging(cli.verbose, &config.monitoring.logging);

    info!("Agent Orchestrator CLI v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Policy(cmd) => handle_policy_command(cmd)?,
        Commands::Run {
            policy,
            agent,
            cycles,
            interval,
            restore,
        } => run_policy(config, &policy, agent.as_deref(), cycles, interval, restore).await?,
        Commands::Memory(cmd) => handle_memory_command(cmd, &config)?,
        Commands::Config(cmd) => handle_config_command(cmd, &config, &config_path)?,
        Commands::Version => {
            println!("Agent Orchestrator CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Core library: {}", agent_orchestrator_core::VERSION);
            println!("Agent library: {}", agent_orchestrator_agent::VERSION);
            println!("dApp library: {}", agent_orchestrator_dapp::VERSION);
        }
    }

    Ok(())
}

/// Handle policy commands
fn handle_policy_command(cmd: PolicyCommands) -> Result<()> {
    match cmd {
        PolicyCommands::Validate { file } => {
            let policy = PolicyFile::from_file(&file)
                .with_context(|| format!("Failed to load policy {}", file.display()))?;
            let catalog = policy.to_catalog().context("Policy references do not resolve")?;
            let (triggers, rules, models) = catalog.counts();
            println!(
                "{}: {} triggers, {} rules, {} models, {} agents",
                file.display(),
                triggers,
                rules,
                models,
                policy.agents.len()
            );
        }
    }
    Ok(())
}

/// Run decision cycles against the configured Solana endpoints
#[cfg(feature = "solana")]
async fn run_policy(
    config: OrchestratorConfig,
    policy: &Path,
    agent: Option<&str>,
    cycles: u32,
    interval: u64,
    restore: bool,
) -> Result<()> {
    use std::sync::Arc;
    use std::time::Duration;

    use agent_orchestrator_agent::AgentExecutionEngine;
    use agent_orchestrator_core::SolanaClient;

    let client = Arc::new(SolanaClient::from_settings(&config.chain)?);
    let policy = PolicyFile::from_file(policy)
        .with_context(|| format!("Failed to load policy {}", policy.display()))?;
    let engine = policy
        .apply_to(AgentExecutionEngine::new(client, &config)?)
        .await?;

    if restore {
        for agent_id in engine.agent_ids().await {
            if engine.restore_memory(&agent_id).await? {
                info!(agent_id = %agent_id, "Memory restored");
            }
        }
    }

    for cycle in 1..=cycles {
        let results = match agent {
            Some(agent_id) => vec![engine.execute_agent(agent_id).await?],
            None => engine.execute_all().await,
        };
        for result in &results {
            println!("{}", serde_json::to_string(result)?);
        }
        info!(cycle, agents = results.len(), "Cycle finished");

        if cycle < cycles {
            tokio::time::sleep(Duration::from_secs(interval)).await;
        }
    }

    print_metrics(&engine)?;
    Ok(())
}

#[cfg(not(feature = "solana"))]
async fn run_policy(
    _config: OrchestratorConfig,
    _policy: &Path,
    _agent: Option<&str>,
    _cycles: u32,
    _interval: u64,
    _restore: bool,
) -> Result<()> {
    bail!("the run command needs a blockchain client; rebuild with `--features solana`")
}

#[cfg(all(feature = "solana", feature = "metrics"))]
fn print_metrics(engine: &agent_orchestrator_agent::AgentExecutionEngine) -> Result<()> {
    if let Some(metrics) = engine.metrics() {
        print!("{}", metrics.render()?);
    }
    Ok(())
}

#[cfg(all(feature = "solana", not(feature = "metrics")))]
fn print_metrics(_engine: &agent_orchestrator_agent::AgentExecutionEngine) -> Result<()> {
    Ok(())
}

/// Handle memory commands
fn handle_memory_command(cmd: MemoryCommands, config: &OrchestratorConfig) -> Result<()> {
    let store = MemoryStore::new(&config.memory.snapshot_dir)?;
    match cmd {
        MemoryCommands::List => {
            let ids = store.list()?;
            if ids.is_empty() {
                println!("No memory snapshots in {}", store.dir().display());
            }
            for agent_id in ids {
                println!("{}", agent_id);
            }
        }
        MemoryCommands::Show { agent, json } => {
            let Some(memory) = store.load(&agent, config.memory_limits())? else {
                bail!("no memory snapshot for agent '{}'", agent);
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&memory)?);
                return Ok(());
            }

            println!("Agent: {}", memory.agent_id);
            println!("Last run: {}", memory.last_run);
            println!("Observations: {}", memory.observations.len());
            println!(
                "Actions: {} ({:.0}% successful)",
                memory.actions.len(),
                memory.success_rate() * 100.0
            );
            for record in memory.actions.iter().rev().take(10) {
                let status = if record.success { "ok" } else { "failed" };
                println!(
                    "  {} {:<8} {:<6} {}",
                    record.timestamp, record.action, status, record.result
                );
            }
            println!("Learnings: {}", memory.learnings.len());
            for learning in &memory.learnings {
                println!("  {}", learning);
            }
        }
    }
    Ok(())
}

/// Handle configuration commands
fn handle_config_command(
    cmd: ConfigCommands,
    config: &OrchestratorConfig,
    path: &Path,
) -> Result<()> {
    match cmd {
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                bail!(
                    "{} already exists; pass --force to overwrite",
                    path.display()
                );
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            OrchestratorConfig::default().save_to_file(path)?;
            info!("Configuration written to {}", path.display());
        }
        ConfigCommands::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                print!("{}", serde_yaml::to_string(config)?);
            }
        }
        ConfigCommands::Validate => match config.validate() {
            Ok(()) => println!("Configuration is valid"),
            Err(e) => {
                warn!("Invalid configuration: {}", e);
                bail!(e);
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_run_arguments() {
        let cli = Cli::try_parse_from([
            "agent-orchestrator",
            "run",
            "policy.yaml",
            "--agent",
            "treasurer",
            "-n",
            "3",
        ])
        .unwrap();
        match cli.command {
            Commands::Run { agent, cycles, interval, .. } => {
                assert_eq!(agent.as_deref(), Some("treasurer"));
                assert_eq!(cycles, 3);
                assert_eq!(interval, 60);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_config_init_refuses_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let config = OrchestratorConfig::default();

        handle_config_command(ConfigCommands::Init { force: false }, &config, &path).unwrap();
        assert!(load_config(&path).is_ok());
        assert!(handle_config_command(ConfigCommands::Init { force: false }, &config, &path).is_err());
        handle_config_command(ConfigCommands::Init { force: true }, &config, &path).unwrap();
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config.engine.max_concurrent_agents, 8);
    }
}
