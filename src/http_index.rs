//! HTTP client for an external vector index collection

use crate::index::{IndexHit, IndexRecord, ScalarMetadata, VectorIndex};
use crate::types::SearchFilter;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Serialize)]
struct AddRequest<'a> {
    ids: Vec<&'a str>,
    embeddings: Vec<&'a [f32]>,
    documents: Vec<&'a str>,
    metadatas: Vec<&'a ScalarMetadata>,
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query_embeddings: [&'a [f32]; 1],
    n_results: usize,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    where_clause: Option<Value>,
}

/// Results are nested one level per query embedding
#[derive(Debug, Deserialize)]
struct QueryResponse {
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Vec<Vec<Option<String>>>,
    #[serde(default)]
    metadatas: Vec<Vec<Option<ScalarMetadata>>>,
    #[serde(default)]
    distances: Vec<Vec<f32>>,
}

impl QueryResponse {
    /// Hits for the single query embedding. A missing distance becomes NaN.
    fn into_hits(self) -> Vec<IndexHit> {
        let ids = self.ids.into_iter().next().unwrap_or_default();
        let mut documents = self.documents.into_iter().next().unwrap_or_default().into_iter();
        let mut metadatas = self.metadatas.into_iter().next().unwrap_or_default().into_iter();
        let mut distances = self.distances.into_iter().next().unwrap_or_default().into_iter();

        ids.into_iter()
            .map(|id| IndexHit {
                id,
                text: documents.next().flatten().unwrap_or_default(),
                metadata: metadatas.next().flatten().unwrap_or_default(),
                distance: distances.next().unwrap_or(f32::NAN),
            })
            .collect()
    }
}

/// Equality filter in the index's query language. Multiple keys are an `$and`.
pub fn where_clause(filter: &SearchFilter) -> Option<Value> {
    let mut terms: Vec<Value> = filter
        .constraints()
        .into_iter()
        .map(|(key, value)| json!({ key: value }))
        .collect();

    match terms.len() {
        0 => None,
        1 => terms.pop(),
        _ => Some(json!({ "$and": terms })),
    }
}

pub struct HttpVectorIndex {
    collection_url: String,
    client: reqwest::Client,
}

impl HttpVectorIndex {
    pub fn new(service_url: &str, collection: &str) -> Self {
        Self {
            collection_url: format!(
                "{}/collections/{}",
                service_url.trim_end_matches('/'),
                urlencoding::encode(collection)
            ),
            client: reqwest::Client::new(),
        }
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<reqwest::Response> {
        let url = format!("{}/{}", self.collection_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to call vector index ({})", path))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Vector index error ({}): {}", status, error_text);
        }
        Ok(response)
    }
}

#[async_trait]
impl VectorIndex for HttpVectorIndex {
    fn name(&self) -> &'static str {
        "http_index"
    }

    async fn add(&self, records: Vec<IndexRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let request = AddRequest {
            ids: records.iter().map(|r| r.id.as_str()).collect(),
            embeddings: records.iter().map(|r| r.vector.as_slice()).collect(),
            documents: records.iter().map(|r| r.text.as_str()).collect(),
            metadatas: records.iter().map(|r| &r.metadata).collect(),
        };
        self.post("add", &request).await?;

        tracing::debug!("Added {} records to {}", records.len(), self.collection_url);
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        filter: Option<&SearchFilter>,
        limit: usize,
    ) -> Result<Vec<IndexHit>> {
        let request = QueryRequest {
            query_embeddings: [vector],
            n_results: limit,
            where_clause: filter.and_then(where_clause),
        };

        let body: QueryResponse = self
            .post("query", &request)
            .await?
            .json()
            .await
            .context("Failed to parse vector index response")?;

        Ok(body.into_hits())
    }

    async fn count(&self) -> Result<usize> {
        let url = format!("{}/count", self.collection_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to call vector index (count)")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Vector index error ({}): {}", status, error_text);
        }

        response
            .json::<usize>()
            .await
            .context("Failed to parse vector index count")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::HashEmbedder;
    use crate::generators::IndexedSource;
    use crate::index::MemoryIndex;
    use crate::types::StrategyType;

    #[test]
    fn test_where_clause_single_key() {
        let filter = SearchFilter {
            game_stage: Some("2-1".to_string()),
            strategy_type: None,
        };
        assert_eq!(where_clause(&filter), Some(json!({ "game_stage": "2-1" })));
    }

    #[test]
    fn test_where_clause_conjunction() {
        let filter = SearchFilter {
            game_stage: Some("3-2".to_string()),
            strategy_type: Some(StrategyType::LossStreak),
        };
        assert_eq!(
            where_clause(&filter),
            Some(json!({ "$and": [{ "game_stage": "3-2" }, { "strategy_type": "loss-streak" }] }))
        );
    }

    #[test]
    fn test_where_clause_empty() {
        assert_eq!(where_clause(&SearchFilter::default()), None);
    }

    #[test]
    fn test_collection_name_encoded() {
        let index = HttpVectorIndex::new("http://localhost:8000/", "tft strategies");
        assert_eq!(index.collection_url, "http://localhost:8000/collections/tft%20strategies");
    }

    #[test]
    fn test_query_response_decoded_to_candidates() {
        let body: QueryResponse = serde_json::from_value(json!({
            "ids": [["vid_a_0", "vid_b_0", "vid_c_0"]],
            "documents": [["3-2 리롤", null, "4-1 레벨업"]],
            "metadatas": [[
                {
                    "game_stage": "3-2",
                    "key_champions": "[\"야스오\",\"요네\"]",
                    "created_at": 1700000000
                },
                null,
                { "game_stage": "4-1" }
            ]],
            "distances": [[0.12, 0.4]]
        }))
        .unwrap();

        let hits = body.into_hits();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[1].text, "");
        assert!(hits[1].metadata.is_empty());
        assert!(hits[2].distance.is_nan());

        let candidates: Vec<_> = hits
            .into_iter()
            .map(IndexedSource::<HashEmbedder, MemoryIndex>::to_candidate)
            .collect();
        assert_eq!(candidates[0].id, "vid_a_0");
        assert_eq!(candidates[0].text, "3-2 리롤");
        assert_eq!(candidates[0].distance, Some(0.12));
        assert_eq!(
            candidates[0].metadata.list("key_champions"),
            Some(&["야스오".to_string(), "요네".to_string()][..])
        );
        assert_eq!(candidates[1].distance, Some(0.4));
        assert_eq!(candidates[2].metadata.text("game_stage"), Some("4-1"));
        assert_eq!(candidates[2].distance, None);
    }

    #[test]
    fn test_query_response_without_results() {
        let body: QueryResponse = serde_json::from_str(r#"{"ids": []}"#).unwrap();
        assert!(body.into_hits().is_empty());
    }
}
