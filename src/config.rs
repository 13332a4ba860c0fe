//! Configuration for the retrieval pipeline and its collaborators
//!
//! Loaded once at startup with Figment: built-in defaults, then an optional
//! TOML file, then `TFTCOACH_*` environment variables (`__` separates
//! sections, e.g. `TFTCOACH_RETRIEVAL__TOP_K=8`).

use crate::error::{Error, Result};
use crate::types::BaseAttributes;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "tftcoach.toml";
pub const ENV_PREFIX: &str = "TFTCOACH_";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub retrieval: RetrievalConfig,
    pub ingest: IngestDefaults,
    pub services: ServiceConfig,
    pub generation: GenerationConfig,
    pub server: ServerConfig,
}

/// Sizes consumed by the core pipeline
///
/// - `chunk_size`: max characters per chunk, > 0
/// - `chunk_overlap`: characters shared by adjacent chunks, < `chunk_size`
/// - `top_k`: candidates requested from the source, > 0
/// - `rerank_top_k`: results kept after reranking, > 0
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub rerank_top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: 400,
            chunk_overlap: 75,
            top_k: 5,
            rerank_top_k: 3,
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be positive".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(Error::Config("top_k must be positive".to_string()));
        }
        if self.rerank_top_k == 0 {
            return Err(Error::Config("rerank_top_k must be positive".to_string()));
        }
        Ok(())
    }
}

/// Attributes applied to ingested documents that do not carry their own
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestDefaults {
    pub season: String,
    pub patch: String,
}

impl Default for IngestDefaults {
    fn default() -> Self {
        Self {
            season: "시즌13".to_string(),
            patch: "13.24".to_string(),
        }
    }
}

impl IngestDefaults {
    pub fn apply(&self, attrs: &mut BaseAttributes) {
        if attrs.season.as_deref().map_or(true, str::is_empty) {
            attrs.season = Some(self.season.clone());
        }
        if attrs.patch.as_deref().map_or(true, str::is_empty) {
            attrs.patch = Some(self.patch.clone());
        }
    }
}

/// Endpoints of the external embedding service and vector index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub embedding_url: Option<String>,
    pub embedding_model: String,
    pub embedding_batch_size: usize,
    pub embedding_concurrency: usize,
    pub index_url: Option<String>,
    pub collection: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            embedding_url: None,
            embedding_model: "sentence-transformers/xlm-r-100langs-bert-base-nli-stsb-mean-tokens"
                .to_string(),
            embedding_batch_size: 32,
            embedding_concurrency: 4,
            index_url: None,
            collection: "tft_strategies".to_string(),
        }
    }
}

/// Answer generation service. Without an API key the system runs grounding-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 1000,
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
        }
    }
}

impl Config {
    /// Load from `tftcoach.toml` in the working directory (if present) and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from the given TOML file (if present) and the environment
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        if config.generation.api_key.is_none() {
            config.generation.api_key = std::env::var("ANTHROPIC_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty());
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.retrieval.validate()?;
        if self.services.embedding_batch_size == 0 || self.services.embedding_concurrency == 0 {
            return Err(Error::Config(
                "embedding_batch_size and embedding_concurrency must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
