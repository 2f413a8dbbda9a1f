//! Configuration management for the agent orchestrator
//!
//! Configuration can be loaded from YAML or JSON files and is otherwise built
//! from defaults. Every section is `#[serde(default)]`, so a file only needs
//! to mention the values it overrides.
//!
//! # Example
//!
//! ```no_run
//! use agent_orchestrator_core::config::{OrchestratorConfig, RpcEndpoint};
//!
//! let config = OrchestratorConfig::builder()
//!     .with_rpc_endpoint(RpcEndpoint::new("https://api.devnet.solana.com"))
//!     .with_min_rule_score(0.4)
//!     .build();
//!
//! let config = OrchestratorConfig::from_file("orchestrator.yaml")?;
//! # Ok::<(), agent_orchestrator_core::Error>(())
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::MemoryLimits;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Decision engine tuning
    pub engine: EngineSettings,
    /// Agent memory settings
    pub memory: MemorySettings,
    /// Blockchain connection settings
    pub chain: ChainSettings,
    /// Monitoring and observability configuration
    pub monitoring: MonitoringSettings,
}

/// Decision engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Rules scoring at or below this value never win
    pub min_rule_score: f64,
    /// Successful actions above this confidence become learnings
    pub learning_confidence_threshold: f64,
    /// Risk score from which the emergency wallet is preferred
    pub high_risk_threshold: f64,
    /// Token used by `balance` thresholds that name no token
    pub default_balance_token: Option<String>,
    /// Number of transactions read per observation
    pub transaction_history_limit: usize,
    /// Width of the firing window after a schedule's time of day
    pub schedule_window_minutes: i64,
    /// Upper bound on agents executed concurrently by `execute_all`
    pub max_concurrent_agents: usize,
}

/// Agent memory settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    /// Maximum observations kept per agent
    pub max_observations: usize,
    /// Maximum action records kept per agent
    pub max_actions: usize,
    /// Maximum learnings kept per agent
    pub max_learnings: usize,
    /// Whether memory snapshots are written after every cycle
    pub persist: bool,
    /// Snapshot directory
    pub snapshot_dir: PathBuf,
}

/// Blockchain connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainSettings {
    /// RPC endpoints with priorities
    pub endpoints: Vec<RpcEndpoint>,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Default commitment level
    pub commitment: CommitmentLevel,
    /// Path of the signing keypair file
    pub keypair_path: Option<PathBuf>,
    /// Timeout the caller imposes on each client call (none when unset)
    pub client_timeout_seconds: Option<u64>,
    /// Tokens and contracts of the network, by symbol / role
    pub network: crate::client::NetworkConfig,
}

/// One RPC node the chain adapter may talk to
///
/// The adapter tries endpoints in ascending `priority` order and fails over
/// to the next one when a call errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcEndpoint {
    /// Node URL
    pub url: String,
    /// Order of preference, 0 first
    #[serde(default = "default_priority")]
    pub priority: u32,
}

fn default_priority() -> u32 {
    1
}

/// How settled a block must be before the adapter reads from it
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CommitmentLevel {
    /// Seen by the connected node
    Processed,
    /// Voted on by a supermajority
    Confirmed,
    /// Rooted
    Finalized,
}

/// Metrics and log output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringSettings {
    /// Cycle counters
    pub metrics: MetricsSettings,
    /// Log output
    pub logging: LoggingSettings,
}

/// Cycle counters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    /// Count cycles per outcome (needs the `metrics` feature)
    pub enabled: bool,
}

/// Log output used by the command line front end
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Most verbose level emitted
    pub level: LogLevel,
    /// Line format
    pub format: LogFormat,
}

/// Verbosity of emitted logs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Failures only
    Error,
    /// Failures and skipped work
    Warn,
    /// Cycle summaries
    Info,
    /// Per-phase detail
    Debug,
    /// Everything
    Trace,
}

/// Log line format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines
    Text,
    /// One JSON object per line
    Json,
}

// Default implementations

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            min_rule_score: 0.3,
            learning_confidence_threshold: 0.8,
            high_risk_threshold: 70.0,
            default_balance_token: Some("cUSD".to_string()),
            transaction_history_limit: 10,
            schedule_window_minutes: 60,
            max_concurrent_agents: 8,
        }
    }
}

impl Default for MemorySettings {
    fn default() -> Self {
        let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let limits = MemoryLimits::default();

        Self {
            max_observations: limits.max_observations,
            max_actions: limits.max_actions,
            max_learnings: limits.max_learnings,
            persist: false,
            snapshot_dir: home_dir.join(".agent-orchestrator/memory"),
        }
    }
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            endpoints: vec![RpcEndpoint::new("https://api.devnet.solana.com")],
            timeout_seconds: 30,
            commitment: CommitmentLevel::Confirmed,
            keypair_path: None,
            client_timeout_seconds: None,
            network: crate::client::NetworkConfig::default(),
        }
    }
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Text,
        }
    }
}

// Implementations

impl OrchestratorConfig {
    /// Start from defaults and override fluently
    pub fn builder() -> OrchestratorConfigBuilder {
        OrchestratorConfigBuilder::new()
    }

    /// Read a `.yaml`, `.yml` or `.json` file
    ///
    /// Sections and fields missing from the file keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let format = FileFormat::of(path)?;
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {}", path.display(), e)))?;

        let parsed = match format {
            FileFormat::Yaml => serde_yaml::from_str(&text).map_err(|e| e.to_string()),
            FileFormat::Json => serde_json::from_str(&text).map_err(|e| e.to_string()),
        };
        parsed.map_err(|e| Error::config(format!("{}: {}", path.display(), e)))
    }

    /// Write the configuration in the format named by the file extension
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let text = match FileFormat::of(path)? {
            FileFormat::Yaml => serde_yaml::to_string(self).map_err(|e| e.to_string()),
            FileFormat::Json => serde_json::to_string_pretty(self).map_err(|e| e.to_string()),
        }
        .map_err(Error::config)?;

        std::fs::write(path, text)
            .map_err(|e| Error::config(format!("cannot write {}: {}", path.display(), e)))
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.engine.min_rule_score) {
            return Err(Error::InvalidConfig(format!(
                "engine.min_rule_score must be within [0, 1], got {}",
                self.engine.min_rule_score
            )));
        }
        if !(0.0..=1.0).contains(&self.engine.learning_confidence_threshold) {
            return Err(Error::InvalidConfig(format!(
                "engine.learning_confidence_threshold must be within [0, 1], got {}",
                self.engine.learning_confidence_threshold
            )));
        }
        if self.engine.max_concurrent_agents == 0 {
            return Err(Error::InvalidConfig(
                "engine.max_concurrent_agents must be at least 1".to_string(),
            ));
        }
        if self.chain.endpoints.is_empty() {
            return Err(Error::InvalidConfig("chain.endpoints is empty".to_string()));
        }
        Ok(())
    }

    /// Memory caps derived from the memory section
    pub fn memory_limits(&self) -> MemoryLimits {
        MemoryLimits {
            max_observations: self.memory.max_observations,
            max_actions: self.memory.max_actions,
            max_learnings: self.memory.max_learnings,
        }
    }

    /// Per-call timeout the caller imposes on the blockchain client
    pub fn client_timeout(&self) -> Option<Duration> {
        self.chain.client_timeout_seconds.map(Duration::from_secs)
    }
}

enum FileFormat {
    Yaml,
    Json,
}

impl FileFormat {
    fn of(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            _ => Err(Error::config(format!(
                "{}: expected a .yaml, .yml or .json file",
                path.display()
            ))),
        }
    }
}

impl RpcEndpoint {
    /// Endpoint at the default priority
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            priority: default_priority(),
        }
    }

    /// Same endpoint at `priority`
    pub fn at_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}

/// Fluent construction of an [`OrchestratorConfig`] starting from defaults
#[derive(Debug, Default)]
pub struct OrchestratorConfigBuilder {
    config: OrchestratorConfig,
}

impl OrchestratorConfigBuilder {
    /// Builder holding the default configuration
    pub fn new() -> Self {
        Self {
            config: OrchestratorConfig::default(),
        }
    }

    /// Set the minimum viable rule score
    pub fn with_min_rule_score(mut self, score: f64) -> Self {
        self.config.engine.min_rule_score = score;
        self
    }

    /// Set the confidence above which successes become learnings
    pub fn with_learning_threshold(mut self, confidence: f64) -> Self {
        self.config.engine.learning_confidence_threshold = confidence;
        self
    }

    /// Set the token used by unscoped balance thresholds
    pub fn with_default_balance_token(mut self, token: Option<String>) -> Self {
        self.config.engine.default_balance_token = token;
        self
    }

    /// Set the memory caps
    pub fn with_memory_limits(mut self, limits: MemoryLimits) -> Self {
        self.config.memory.max_observations = limits.max_observations;
        self.config.memory.max_actions = limits.max_actions;
        self.config.memory.max_learnings = limits.max_learnings;
        self
    }

    /// Enable snapshot persistence into `dir`
    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.memory.persist = true;
        self.config.memory.snapshot_dir = dir.into();
        self
    }

    /// Append a node to the failover list
    pub fn with_rpc_endpoint(mut self, endpoint: RpcEndpoint) -> Self {
        self.config.chain.endpoints.push(endpoint);
        self
    }

    /// Sign with the keypair stored at `path`
    pub fn with_keypair_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.chain.keypair_path = Some(path.into());
        self
    }

    /// Set a per-call client timeout in seconds
    pub fn with_client_timeout(mut self, seconds: u64) -> Self {
        self.config.chain.client_timeout_seconds = Some(seconds);
        self
    }

    /// Read at `commitment`
    pub fn with_commitment(mut self, commitment: CommitmentLevel) -> Self {
        self.config.chain.commitment = commitment;
        self
    }

    /// Emit logs up to `level`
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.config.monitoring.logging.level = level;
        self
    }

    /// Finish
    pub fn build(self) -> OrchestratorConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = OrchestratorConfig::default();

        assert_eq!(config.engine.min_rule_score, 0.3);
        assert_eq!(config.engine.learning_confidence_threshold, 0.8);
        assert_eq!(config.memory_limits(), MemoryLimits::default());
        assert_eq!(config.chain.commitment, CommitmentLevel::Confirmed);
        assert!(config.client_timeout().is_none());
        assert!(config.validate().is_ok());
        assert_eq!(tracing::Level::from(config.monitoring.logging.level), tracing::Level::INFO);
    }

    #[test]
    fn test_builder_pattern() {
        let config = OrchestratorConfig::builder()
            .with_min_rule_score(0.5)
            .with_client_timeout(5)
            .with_rpc_endpoint(RpcEndpoint::new("https://backup.rpc").at_priority(0))
            .with_commitment(CommitmentLevel::Finalized)
            .build();

        assert_eq!(config.engine.min_rule_score, 0.5);
        assert_eq!(config.client_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.chain.endpoints.len(), 2);
        assert_eq!(config.chain.endpoints[1].priority, 0);
        assert_eq!(config.chain.commitment, CommitmentLevel::Finalized);
    }

    #[test]
    fn test_validate_rejects_out_of_range_score() {
        let config = OrchestratorConfig::builder().with_min_rule_score(1.5).build();
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "engine:\n  min_rule_score: 0.6\n";
        let config: OrchestratorConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.engine.min_rule_score, 0.6);
        assert_eq!(config.engine.learning_confidence_threshold, 0.8);
        assert_eq!(config.memory.max_learnings, 50);
    }

    #[test]
    fn test_config_file_io() -> Result<()> {
        let temp_dir = tempdir()?;
        let yaml_path = temp_dir.path().join("config.yaml");
        let json_path = temp_dir.path().join("config.json");

        let original = OrchestratorConfig::builder().with_min_rule_score(0.45).build();
        original.save_to_file(&yaml_path)?;
        original.save_to_file(&json_path)?;

        assert_eq!(OrchestratorConfig::from_file(&yaml_path)?.engine.min_rule_score, 0.45);
        assert_eq!(OrchestratorConfig::from_file(&json_path)?.engine.min_rule_score, 0.45);
        assert!(OrchestratorConfig::from_file(temp_dir.path().join("config.toml")).is_err());

        Ok(())
    }
}
