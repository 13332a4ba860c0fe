//! Batch ingestion: cleaned documents to indexed chunks

use crate::config::{Config, IngestDefaults};
use crate::error::{Error, Result};
use crate::generators::ChunkStore;
use crate::segmenter::Segmenter;
use crate::types::BaseAttributes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Cleaned text plus the attributes supplied by the acquisition step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    pub text: String,
    #[serde(default)]
    pub attributes: BaseAttributes,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
}

pub struct IngestPipeline {
    segmenter: Segmenter,
    defaults: IngestDefaults,
    store: Arc<dyn ChunkStore>,
}

impl IngestPipeline {
    pub fn new(config: &Config, store: Arc<dyn ChunkStore>) -> Result<Self> {
        Ok(Self {
            segmenter: Segmenter::from_config(&config.retrieval)?,
            defaults: config.ingest.clone(),
            store,
        })
    }

    pub async fn ingest(&self, documents: Vec<SourceDocument>) -> Result<IngestReport> {
        let (texts, attrs): (Vec<String>, Vec<BaseAttributes>) = documents
            .into_iter()
            .map(|doc| {
                let mut attrs = doc.attributes;
                self.defaults.apply(&mut attrs);
                (doc.text, attrs)
            })
            .unzip();

        let chunks = self.segmenter.segment_batch(&texts, &attrs);
        let written = self.store.add_chunks(&chunks).await.map_err(Error::Ingest)?;

        info!("Ingested {} documents into {} chunks", texts.len(), written);
        Ok(IngestReport {
            documents: texts.len(),
            chunks: written,
        })
    }

    /// A failed read is reported against the store, not as an ingest failure
    pub async fn count(&self) -> Result<usize> {
        self.store
            .count()
            .await
            .map_err(|error| Error::CandidateSource {
                name: self.store.name(),
                error,
            })
    }
}
