//! tftcoach - strategy retrieval for Teamfight Tactics coaching
//!
//! Turns transcribed strategy videos into a searchable knowledge base and
//! answers in-game questions from it:
//! - Segmentation of cleaned text into tagged, overlapping chunks
//! - Metadata filters derived from the question and the caller's game state
//! - Vector search behind pluggable embedding and index collaborators
//! - Deterministic reranking by stage match, patch recency and difficulty
//! - Optional grounded answer generation

pub mod config;
pub mod context_engine;
pub mod embedder;
pub mod error;
pub mod filters;
pub mod format;
pub mod generation;
pub mod generators;
pub mod http_index;
pub mod index;
pub mod ingest;
pub mod rules;
pub mod scoring;
pub mod segmenter;
pub mod server;
pub mod types;

pub use config::Config;
pub use context_engine::{ContextEngine, Retrieval, SharedContextEngine};
pub use embedder::{Embedder, HashEmbedder, HttpEmbedder};
pub use error::{Error, Result};
pub use filters::FilterBuilder;
pub use format::{collect_sources, ContextFormatter};
pub use generation::{AnswerGenerator, Generation, HttpGenerator};
pub use generators::{CandidateSource, ChunkStore, IndexedSource, MockCandidateSource};
pub use http_index::HttpVectorIndex;
pub use index::{MemoryIndex, VectorIndex};
pub use ingest::{IngestPipeline, IngestReport, SourceDocument};
pub use scoring::Reranker;
pub use segmenter::Segmenter;
pub use types::*;
