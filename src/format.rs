//! Rendering of reranked results into prompt context

use crate::types::{Candidate, Difficulty, Source, StrategyType};

/// Returned by [`ContextFormatter::format`] when there is nothing to render
pub const NO_STRATEGY_FOUND: &str = "관련된 전략을 찾을 수 없습니다.";

const UNSPECIFIED: &str = "미정";

#[derive(Debug, Clone, Copy, Default)]
pub struct ContextFormatter;

impl ContextFormatter {
    pub fn new() -> Self {
        Self
    }

    /// One labeled block per result, 1-based, in input order, separated by a blank line
    pub fn format(&self, results: &[Candidate]) -> String {
        if results.is_empty() {
            return NO_STRATEGY_FOUND.to_string();
        }

        results
            .iter()
            .enumerate()
            .map(|(i, result)| self.format_block(i + 1, result))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn format_block(&self, index: usize, result: &Candidate) -> String {
        let metadata = &result.metadata;

        let stage = metadata.text("game_stage").unwrap_or(UNSPECIFIED);
        // stored tokens are shown with their Korean label; anything else is shown as-is
        let strategy = metadata
            .text("strategy_type")
            .map(|raw| raw.parse::<StrategyType>().map(|t| t.label()).unwrap_or(raw))
            .unwrap_or(UNSPECIFIED);
        let composition = metadata.text("composition_name").unwrap_or(UNSPECIFIED);
        let difficulty = match metadata.text("difficulty") {
            Some(raw) => raw.parse::<Difficulty>().map(|d| d.label()).unwrap_or(raw),
            None => Difficulty::default().label(),
        };

        format!(
            "[전략 {}]\n- 게임 단계: {}\n- 전략 유형: {}\n- 조합: {}\n- 난이도: {}\n- 내용: {}",
            index,
            stage,
            strategy,
            composition,
            difficulty,
            result.text.trim()
        )
    }
}

/// Provenance of the results, first occurrence kept.
///
/// Entries collapse when all four displayed fields are equal, even if the
/// underlying records differ elsewhere.
pub fn collect_sources(results: &[Candidate]) -> Vec<Source> {
    let mut sources: Vec<Source> = Vec::with_capacity(results.len());
    for result in results {
        let source = Source::from_metadata(&result.metadata);
        if !sources.contains(&source) {
            sources.push(source);
        }
    }
    sources
}
