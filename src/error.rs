//! Error taxonomy for the retrieval pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the pipeline.
///
/// Unparsable patches, keyword no-matches and empty candidate lists are not
/// errors; they resolve locally to zero scores, defaults or "nothing found".
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration, fatal at startup
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A tag value outside its closed set
    #[error("unrecognized {kind}: '{value}'")]
    Unrecognized { kind: &'static str, value: String },

    /// Caller-supplied game state outside its numeric ranges
    #[error("invalid situational state: {0}")]
    InvalidState(String),

    /// The candidate source (embedding + index) failed
    #[error("candidate source `{name}` failed: {error:#}")]
    CandidateSource {
        name: &'static str,
        #[source]
        error: anyhow::Error,
    },

    /// The generation service failed
    #[error("generation failed: {0:#}")]
    Generation(#[source] anyhow::Error),

    /// Embedding or index write failed while ingesting chunks
    #[error("ingestion failed: {0:#}")]
    Ingest(#[source] anyhow::Error),
}
