//! JSON snapshots of agent memory
//!
//! One file per agent under the snapshot directory, written atomically after
//! each cycle and read back when an agent is restored.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use agent_orchestrator_core::{AgentMemory, Error, MemoryLimits, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

const SNAPSHOT_VERSION: &str = "1.0";

#[derive(Debug, Serialize, Deserialize)]
struct MemorySnapshot {
    version: String,
    memory: AgentMemory,
}

/// Directory of per-agent memory snapshots
#[derive(Debug, Clone)]
pub struct MemoryStore {
    dir: PathBuf,
}

impl MemoryStore {
    /// Open (and create) the snapshot directory
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            Error::storage(format!("Failed to create snapshot directory: {}", e))
        })?;
        Ok(Self { dir })
    }

    /// Snapshot directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the agent's memory
    pub fn save(&self, memory: &AgentMemory) -> Result<()> {
        let snapshot = MemorySnapshot {
            version: SNAPSHOT_VERSION.to_string(),
            memory: memory.clone(),
        };
        let json = serde_json::to_string_pretty(&snapshot)?;

        let path = self.path_for(&memory.agent_id);
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, json)
            .map_err(|e| Error::storage(format!("Failed to write snapshot: {}", e)))?;
        fs::rename(&temp_path, &path)
            .map_err(|e| Error::storage(format!("Failed to rename snapshot: {}", e)))?;

        debug!(agent_id = %memory.agent_id, path = %path.display(), "Memory snapshot saved");
        Ok(())
    }

    /// Read the agent's memory, re-applying `limits`; `None` when no snapshot exists
    pub fn load(&self, agent_id: &str, limits: MemoryLimits) -> Result<Option<AgentMemory>> {
        let path = self.path_for(agent_id);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::storage(format!("Failed to read snapshot: {}", e))),
        };

        let snapshot: MemorySnapshot = serde_json::from_str(&json)?;
        if snapshot.memory.agent_id != agent_id {
            return Err(Error::storage(format!(
                "snapshot at {} belongs to agent '{}'",
                path.display(),
                snapshot.memory.agent_id
            )));
        }

        Ok(Some(with_limits(snapshot.memory, limits)))
    }

    /// Delete the agent's snapshot if present
    pub fn remove(&self, agent_id: &str) -> Result<()> {
        let path = self.path_for(agent_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::storage(format!("Failed to delete snapshot: {}", e))),
        }
    }

    /// Agent ids with a snapshot on disk
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| Error::storage(format!("Failed to read snapshot directory: {}", e)))?;

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| Error::storage(format!("Failed to read directory entry: {}", e)))?
                .path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let Ok(json) = fs::read_to_string(&path) else {
                continue;
            };
            if let Ok(snapshot) = serde_json::from_str::<MemorySnapshot>(&json) {
                ids.push(snapshot.memory.agent_id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn path_for(&self, agent_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(agent_id)))
    }
}

/// Injective file name for an agent id: ASCII letters, digits and `-` are
/// kept, every other byte (including `_`) becomes `_xx`
fn file_stem(agent_id: &str) -> String {
    let mut stem = String::with_capacity(agent_id.len());
    for byte in agent_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            stem.push(char::from(byte));
        } else {
            let _ = write!(stem, "_{:02x}", byte);
        }
    }
    stem
}

/// Apply new caps, evicting the oldest entries beyond them
fn with_limits(mut memory: AgentMemory, limits: MemoryLimits) -> AgentMemory {
    memory.limits = limits;
    let observations: Vec<_> = memory.observations.drain(..).collect();
    let actions: Vec<_> = memory.actions.drain(..).collect();
    let learnings: Vec<_> = memory.learnings.drain(..).collect();
    observations.into_iter().for_each(|o| memory.push_observation(o));
    actions.into_iter().for_each(|a| memory.push_action(a));
    learnings.into_iter().for_each(|l| memory.push_learning(l));
    memory
}
