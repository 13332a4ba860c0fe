//! Candidate sources for strategy retrieval

use crate::embedder::Embedder;
use crate::index::{decode_metadata, encode_record, IndexHit, IndexRecord, VectorIndex};
use crate::types::{Candidate, Chunk, SearchFilter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Mutex;

/// Trait for pluggable candidate sources
#[async_trait]
pub trait CandidateSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Up to `top_k` candidates, closest first. `None` searches unconstrained.
    async fn search(
        &self,
        query: &str,
        filter: Option<&SearchFilter>,
        top_k: usize,
    ) -> Result<Vec<Candidate>>;
}

/// Write side of a candidate source
#[async_trait]
pub trait ChunkStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns the number of chunks written
    async fn add_chunks(&self, chunks: &[Chunk]) -> Result<usize>;

    async fn count(&self) -> Result<usize>;
}

/// Embedding service + vector index
pub struct IndexedSource<E, I> {
    embedder: E,
    index: I,
    batch_size: usize,
    concurrency: usize,
}

impl<E: Embedder, I: VectorIndex> IndexedSource<E, I> {
    pub fn new(embedder: E, index: I) -> Self {
        Self {
            embedder,
            index,
            batch_size: 32,
            concurrency: 4,
        }
    }

    /// Batches are embedded concurrently; results keep input order.
    pub fn with_batching(mut self, batch_size: usize, concurrency: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self.concurrency = concurrency.max(1);
        self
    }

    async fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let pending: Vec<_> = texts
            .chunks(self.batch_size)
            .map(|batch| self.embedder.embed(batch))
            .collect();
        let batches: Vec<Vec<Vec<f32>>> = stream::iter(pending)
            .buffered(self.concurrency)
            .try_collect()
            .await?;
        Ok(batches.into_iter().flatten().collect())
    }

    /// A missing or non-finite distance becomes `None`
    pub(crate) fn to_candidate(hit: IndexHit) -> Candidate {
        Candidate {
            id: hit.id,
            text: hit.text,
            metadata: decode_metadata(hit.metadata),
            distance: hit.distance.is_finite().then_some(hit.distance),
        }
    }
}

#[async_trait]
impl<E: Embedder, I: VectorIndex> CandidateSource for IndexedSource<E, I> {
    fn name(&self) -> &'static str {
        self.index.name()
    }

    async fn search(
        &self,
        query: &str,
        filter: Option<&SearchFilter>,
        top_k: usize,
    ) -> Result<Vec<Candidate>> {
        let vector = self
            .embedder
            .embed(&[query.to_string()])
            .await
            .context("Failed to embed query")?
            .into_iter()
            .next()
            .context("Embedder returned no vector for the query")?;

        let hits = self.index.search(&vector, filter, top_k).await?;
        tracing::debug!("{}: {} hits for top_k={}", self.index.name(), hits.len(), top_k);

        Ok(hits.into_iter().map(Self::to_candidate).collect())
    }
}

#[async_trait]
impl<E: Embedder, I: VectorIndex> ChunkStore for IndexedSource<E, I> {
    fn name(&self) -> &'static str {
        self.index.name()
    }

    async fn add_chunks(&self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embed_all(&texts).await.context("Failed to embed chunks")?;
        if vectors.len() != chunks.len() {
            anyhow::bail!("Got {} vectors for {} chunks", vectors.len(), chunks.len());
        }

        let records: Vec<IndexRecord> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexRecord {
                id: chunk.id.clone(),
                vector,
                text: chunk.text.clone(),
                metadata: encode_record(&chunk.metadata),
            })
            .collect();

        let added = records.len();
        self.index.add(records).await.context("Failed to write chunks to index")?;
        tracing::info!("Indexed {} chunks with {}", added, self.embedder.model_name());
        Ok(added)
    }

    async fn count(&self) -> Result<usize> {
        self.index.count().await
    }
}

/// Mock source returning a fixed list, for testing and demos
pub struct MockCandidateSource {
    candidates: Vec<Candidate>,
    last_filter: Mutex<Option<SearchFilter>>,
}

impl MockCandidateSource {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates,
            last_filter: Mutex::new(None),
        }
    }

    /// Filter passed to the most recent search
    pub fn last_filter(&self) -> Option<SearchFilter> {
        self.last_filter.lock().ok().and_then(|f| f.clone())
    }
}

#[async_trait]
impl CandidateSource for MockCandidateSource {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn search(
        &self,
        _query: &str,
        filter: Option<&SearchFilter>,
        top_k: usize,
    ) -> Result<Vec<Candidate>> {
        if let Ok(mut last) = self.last_filter.lock() {
            *last = filter.cloned();
        }
        Ok(self.candidates.iter().take(top_k).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::HashEmbedder;
    use crate::index::MemoryIndex;
    use crate::segmenter::Segmenter;
    use crate::types::{BaseAttributes, StrategyType};

    fn source() -> IndexedSource<HashEmbedder, MemoryIndex> {
        IndexedSource::new(HashEmbedder::new(128), MemoryIndex::new()).with_batching(2, 2)
    }

    fn chunks() -> Vec<Chunk> {
        let seg = Segmenter::new(400, 75).unwrap();
        let attrs = |source: &str| BaseAttributes {
            video_source: Some(source.to_string()),
            patch: Some("13.24".to_string()),
            ..Default::default()
        };
        seg.segment_batch(
            &[
                "3-2에 레벨을 올리고 야스오 요네를 모으세요.",
                "4-1에 골드를 모두 써서 리롤하세요.",
                "2-1 연패 전략은 체력 관리가 중요합니다.",
            ],
            &[attrs("a"), attrs("b"), attrs("c")],
        )
    }

    #[tokio::test]
    async fn test_add_then_search_roundtrip() {
        let source = source();
        let chunks = chunks();
        assert_eq!(source.add_chunks(&chunks).await.unwrap(), 3);
        assert_eq!(source.count().await.unwrap(), 3);

        let results = source
            .search("4-1에 골드를 모두 써서 리롤하세요.", None, 1)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "4-1에 골드를 모두 써서 리롤하세요.");
        assert!(results[0].distance.unwrap() < 1e-4);
    }

    #[tokio::test]
    async fn test_sequence_metadata_restored() {
        let source = source();
        source.add_chunks(&chunks()).await.unwrap();

        let filter = SearchFilter {
            game_stage: Some("3-2".to_string()),
            strategy_type: Some(StrategyType::Leveling),
        };
        let results = source.search("레벨", Some(&filter), 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].metadata.list("key_champions"),
            Some(&["야스오".to_string(), "요네".to_string()][..])
        );
    }

    #[tokio::test]
    async fn test_batches_keep_input_order() {
        // 7 texts over batches of 2 with 3 in flight
        let source = IndexedSource::new(HashEmbedder::new(128), MemoryIndex::new()).with_batching(2, 3);
        let texts: Vec<String> = [
            "야스오 리롤",
            "레벨 8 전환",
            "연패 골드 관리",
            "무한의 대검 우선",
            "요네 2성 완성",
            "체력 30 방어",
            "도전자 6 시너지",
        ]
        .iter()
        .map(|t| t.to_string())
        .collect();

        let vectors = source.embed_all(&texts).await.unwrap();
        assert_eq!(vectors.len(), texts.len());
        for (text, vector) in texts.iter().zip(&vectors) {
            assert_eq!(vector, &source.embedder.embed_one(text));
        }

        let seg = Segmenter::new(400, 75).unwrap();
        let attrs: Vec<BaseAttributes> = (0..texts.len())
            .map(|i| BaseAttributes {
                video_source: Some(format!("vid{}", i)),
                ..Default::default()
            })
            .collect();
        let chunks = seg.segment_batch(&texts, &attrs);
        assert_eq!(source.add_chunks(&chunks).await.unwrap(), 7);

        for chunk in &chunks {
            let results = source.search(&chunk.text, None, 1).await.unwrap();
            assert_eq!(results[0].id, chunk.id);
            assert!(results[0].distance.unwrap() < 1e-4);
        }
    }

    #[test]
    fn test_non_finite_distance_is_absent() {
        let hit = |distance: f32| IndexHit {
            id: "x".to_string(),
            text: "t".to_string(),
            metadata: Default::default(),
            distance,
        };
        type Source = IndexedSource<HashEmbedder, MemoryIndex>;
        assert_eq!(Source::to_candidate(hit(f32::NAN)).distance, None);
        assert_eq!(Source::to_candidate(hit(f32::INFINITY)).distance, None);
        assert_eq!(Source::to_candidate(hit(0.25)).distance, Some(0.25));
    }

    #[tokio::test]
    async fn test_add_nothing() {
        let source = source();
        assert_eq!(source.add_chunks(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mock_records_filter() {
        let mock = MockCandidateSource::new(vec![]);
        let filter = SearchFilter {
            game_stage: Some("2-1".to_string()),
            strategy_type: None,
        };
        let results = mock.search("q", Some(&filter), 3).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(mock.last_filter(), Some(filter));
    }
}
