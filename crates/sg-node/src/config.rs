//! Node configuration, persisted as `<data-dir>/config.json`.
//!
//! Grounded on the teacher's `container::config::NodeConfig` — one
//! top-level struct composed of per-subsystem sections, each with its own
//! `Default`.

use serde::{Deserialize, Serialize};
use sg_04_hnsw::HnswParams;
use sg_types::GraphError;
use std::path::Path;

/// Bumped whenever `NodeConfig`'s on-disk shape changes incompatibly.
pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub version: u32,
    pub hnsw: HnswSection,
    pub chunking: ChunkingSection,
    pub embedding: EmbeddingSection,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            hnsw: HnswSection::default(),
            chunking: ChunkingSection::default(),
            embedding: EmbeddingSection::default(),
        }
    }
}

impl NodeConfig {
    /// Load `<data_dir>/config.json`, or write and return the default if
    /// it doesn't exist yet (the `init` subcommand's bootstrap path).
    pub fn load_or_init(data_dir: &Path) -> Result<Self, GraphError> {
        let path = data_dir.join("config.json");
        match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| GraphError::StorageFailure(format!("config.json: {e}"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.save(data_dir)?;
                Ok(config)
            }
            Err(e) => Err(GraphError::StorageFailure(e.to_string())),
        }
    }

    pub fn save(&self, data_dir: &Path) -> Result<(), GraphError> {
        std::fs::create_dir_all(data_dir).map_err(|e| GraphError::StorageFailure(e.to_string()))?;
        let bytes = serde_json::to_vec_pretty(self)
            .map_err(|e| GraphError::StorageFailure(format!("config.json: {e}")))?;
        std::fs::write(data_dir.join("config.json"), bytes)
            .map_err(|e| GraphError::StorageFailure(e.to_string()))
    }

    #[must_use]
    pub fn hnsw_params(&self) -> HnswParams {
        HnswParams {
            m: self.hnsw.m,
            ef_construction: self.hnsw.ef_construction,
            ef_search: self.hnsw.ef_search,
            m_l: 1.0 / (self.hnsw.m as f64).ln(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HnswSection {
    pub m: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
}

impl Default for HnswSection {
    fn default() -> Self {
        let defaults = HnswParams::default();
        Self { m: defaults.m, ef_construction: defaults.ef_construction, ef_search: defaults.ef_search }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingSection {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub batch_size: usize,
}

impl Default for ChunkingSection {
    fn default() -> Self {
        Self { chunk_size: 512, chunk_overlap: 64, batch_size: sg_07_ingest::DEFAULT_BATCH_SIZE }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSection {
    pub provider: String,
}

impl Default for EmbeddingSection {
    fn default() -> Self {
        Self { provider: "hashing".to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_or_init_writes_defaults_on_first_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig::load_or_init(dir.path()).unwrap();
        assert_eq!(config.version, CONFIG_VERSION);
        assert!(dir.path().join("config.json").exists());
    }

    #[test]
    fn load_or_init_round_trips_an_edited_value() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = NodeConfig::load_or_init(dir.path()).unwrap();
        config.chunking.chunk_size = 1024;
        config.save(dir.path()).unwrap();

        let reloaded = NodeConfig::load_or_init(dir.path()).unwrap();
        assert_eq!(reloaded.chunking.chunk_size, 1024);
    }
}
