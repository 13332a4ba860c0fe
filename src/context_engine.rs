//! Core ContextEngine: filter, search, rerank, format, answer

use crate::config::{Config, RetrievalConfig};
use crate::error::{Error, Result};
use crate::filters::FilterBuilder;
use crate::format::{collect_sources, ContextFormatter};
use crate::generation::{Generation, GROUNDING_ONLY_PREFIX};
use crate::generators::CandidateSource;
use crate::scoring::Reranker;
use crate::types::{Answer, Candidate, SearchFilter, SituationalState};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Answer returned when retrieval finds nothing
pub const NOTHING_FOUND_ANSWER: &str =
    "죄송합니다. 관련된 전략을 찾을 수 없습니다. 다른 방식으로 질문해주시겠어요?";

/// Reranked results together with the filter that produced them
#[derive(Debug, Clone, Serialize)]
pub struct Retrieval {
    pub filter: SearchFilter,
    pub results: Vec<Candidate>,
}

/// Main context engine (thread-safe via Arc)
pub struct ContextEngine {
    retrieval: RetrievalConfig,
    source: Arc<dyn CandidateSource>,
    filters: FilterBuilder,
    reranker: Reranker,
    formatter: ContextFormatter,
    generation: Generation,
}

pub type SharedContextEngine = Arc<ContextEngine>;

impl ContextEngine {
    pub fn new(
        config: &Config,
        source: Arc<dyn CandidateSource>,
        generation: Generation,
    ) -> Result<SharedContextEngine> {
        config.retrieval.validate()?;

        info!(
            "Context engine ready: source={}, top_k={}, rerank_top_k={}, generation={:?}",
            source.name(),
            config.retrieval.top_k,
            config.retrieval.rerank_top_k,
            generation
        );

        Ok(Arc::new(Self {
            retrieval: config.retrieval.clone(),
            source,
            filters: FilterBuilder::new(),
            reranker: Reranker::from_config(&config.retrieval),
            formatter: ContextFormatter::new(),
            generation,
        }))
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    pub fn generation_enabled(&self) -> bool {
        self.generation.is_enabled()
    }

    pub fn retrieval_config(&self) -> &RetrievalConfig {
        &self.retrieval
    }

    /// Filtered search followed by reranking
    pub async fn retrieve(&self, query: &str, state: Option<&SituationalState>) -> Result<Vec<Candidate>> {
        Ok(self.retrieve_with_filter(query, state).await?.results)
    }

    pub async fn retrieve_with_filter(
        &self,
        query: &str,
        state: Option<&SituationalState>,
    ) -> Result<Retrieval> {
        let start = Instant::now();
        if let Some(state) = state {
            state.validate()?;
        }

        let filter = self.filters.build_filter(query, state);
        debug!("Derived filter: {:?}", filter);

        let candidates = self
            .source
            .search(query, filter.as_constraint(), self.retrieval.top_k)
            .await
            .map_err(|error| {
                warn!("Candidate source '{}' failed: {:#}", self.source.name(), error);
                Error::CandidateSource {
                    name: self.source.name(),
                    error,
                }
            })?;
        let found = candidates.len();

        let results = self.reranker.rerank(candidates, state);

        info!(
            "Retrieved {} candidates, kept {} after rerank ({}ms)",
            found,
            results.len(),
            start.elapsed().as_millis()
        );
        Ok(Retrieval { filter, results })
    }

    pub fn format_context(&self, results: &[Candidate]) -> String {
        self.formatter.format(results)
    }

    /// Retrieve, then generate an answer or fall back to the raw context
    pub async fn answer(&self, question: &str, state: Option<&SituationalState>) -> Result<Answer> {
        let results = self.retrieve(question, state).await?;
        let grounding_only = !self.generation.is_enabled();

        if results.is_empty() {
            info!("No strategies found for question");
            return Ok(Answer {
                answer: NOTHING_FOUND_ANSWER.to_string(),
                sources: vec![],
                retrieved: vec![],
                grounding_only,
            });
        }

        let context = self.format_context(&results);
        let answer = match &self.generation {
            Generation::Enabled(generator) => generator
                .generate(question, &context, state)
                .await
                .map_err(|e| {
                    warn!("Generation via {} failed: {:#}", generator.name(), e);
                    Error::Generation(e)
                })?,
            Generation::GroundingOnly => {
                debug!("Grounding-only answer");
                format!("{}{}", GROUNDING_ONLY_PREFIX, context)
            }
        };

        Ok(Answer {
            answer,
            sources: collect_sources(&results),
            retrieved: results,
            grounding_only,
        })
    }
}
