//! Vector index boundary
//!
//! The index stores scalar metadata only. Sequence-valued fields of a
//! [`StrategyRecord`] are flattened to JSON strings by [`encode_record`] on
//! write and restored by [`decode_metadata`] on read; nothing else in the
//! crate sees the encoded form.

use crate::types::{Metadata, MetadataValue, SearchFilter, StrategyRecord};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Metadata value accepted by the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

pub type ScalarMetadata = BTreeMap<String, ScalarValue>;

fn encode_list(items: &[String]) -> ScalarValue {
    ScalarValue::Str(serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string()))
}

/// Flatten a record for storage. Absent optional fields are omitted.
pub fn encode_record(record: &StrategyRecord) -> ScalarMetadata {
    let mut m = ScalarMetadata::new();
    let text = |s: &str| ScalarValue::Str(s.to_string());

    m.insert("season".into(), text(&record.season));
    m.insert("patch".into(), text(&record.patch));
    m.insert("game_stage".into(), text(&record.game_stage));
    m.insert("strategy_type".into(), text(record.strategy_type.as_str()));
    if let Some(ref name) = record.composition_name {
        m.insert("composition_name".into(), text(name));
    }
    m.insert("key_champions".into(), encode_list(&record.key_champions));
    m.insert("synergies".into(), encode_list(&record.synergies));
    m.insert("core_items".into(), encode_list(&record.core_items));
    m.insert("difficulty".into(), text(record.difficulty.as_str()));
    if let Some(ref p) = record.prerequisites {
        m.insert("prerequisites".into(), text(p));
    }
    if let Some(ref ts) = record.timestamp {
        m.insert("timestamp".into(), text(ts));
    }
    m.insert("video_source".into(), text(&record.video_source));
    m.insert("created_at".into(), ScalarValue::Int(record.created_at));
    m
}

/// Restore stored metadata. Strings holding a JSON array of strings become lists.
pub fn decode_metadata(metadata: ScalarMetadata) -> Metadata {
    metadata
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                ScalarValue::Str(s) if s.starts_with('[') => {
                    match serde_json::from_str::<Vec<String>>(&s) {
                        Ok(items) => MetadataValue::List(items),
                        Err(_) => MetadataValue::Text(s),
                    }
                }
                ScalarValue::Str(s) => MetadataValue::Text(s),
                ScalarValue::Int(i) => MetadataValue::Integer(i),
                ScalarValue::Float(f) => MetadataValue::Float(f),
                ScalarValue::Bool(b) => MetadataValue::Bool(b),
            };
            (key, value)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: ScalarMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHit {
    pub id: String,
    pub text: String,
    pub metadata: ScalarMetadata,
    pub distance: f32,
}

/// Nearest-neighbor search with exact-match metadata filters
#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn name(&self) -> &'static str;

    /// Insert or replace records by id
    async fn add(&self, records: Vec<IndexRecord>) -> Result<()>;

    /// Closest records first. Records failing any filter constraint are excluded.
    async fn search(
        &self,
        vector: &[f32],
        filter: Option<&SearchFilter>,
        limit: usize,
    ) -> Result<Vec<IndexHit>>;

    async fn count(&self) -> Result<usize>;
}

/// In-process index with brute-force cosine distance (1 - cosine similarity)
#[derive(Debug, Default)]
pub struct MemoryIndex {
    records: RwLock<Vec<IndexRecord>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(metadata: &ScalarMetadata, constraints: &[(&'static str, String)]) -> bool {
    constraints.iter().all(|(key, wanted)| match metadata.get(*key) {
        Some(ScalarValue::Str(value)) => value == wanted,
        _ => false,
    })
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn add(&self, records: Vec<IndexRecord>) -> Result<()> {
        let mut stored = self.records.write().await;
        for record in records {
            if let Some(existing) = stored.iter_mut().find(|r| r.id == record.id) {
                *existing = record;
            } else {
                stored.push(record);
            }
        }
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        filter: Option<&SearchFilter>,
        limit: usize,
    ) -> Result<Vec<IndexHit>> {
        let constraints = filter.map(SearchFilter::constraints).unwrap_or_default();
        let stored = self.records.read().await;

        let mut hits = Vec::new();
        for record in stored.iter().filter(|r| matches(&r.metadata, &constraints)) {
            if record.vector.len() != vector.len() {
                anyhow::bail!(
                    "Vector dimension mismatch for '{}': index has {}, query has {}",
                    record.id,
                    record.vector.len(),
                    vector.len()
                );
            }
            hits.push(IndexHit {
                id: record.id.clone(),
                text: record.text.clone(),
                metadata: record.metadata.clone(),
                distance: cosine_distance(vector, &record.vector),
            });
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().await.len())
    }
}
