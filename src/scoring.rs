//! Scoring functions for retrieved candidates
//!
//! total = patch recency + stage match + difficulty preference - distance penalty
//!
//! The stage-match weight sits an order of magnitude above any plausible patch
//! score so that, with a game state present, matching the current round
//! decides the order before recency or difficulty do.

use crate::config::RetrievalConfig;
use crate::types::{Candidate, Difficulty, Metadata, SituationalState};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RerankWeights {
    pub stage_match: f64,
    pub distance: f64,
    pub beginner: f64,
    pub novice: f64,
    pub intermediate: f64,
    pub advanced: f64,
}

impl Default for RerankWeights {
    fn default() -> Self {
        Self {
            stage_match: 100_000.0,
            distance: 10.0,
            beginner: 100.0,
            novice: 80.0,
            intermediate: 50.0,
            advanced: 20.0,
        }
    }
}

impl RerankWeights {
    pub fn difficulty(&self, difficulty: Difficulty) -> f64 {
        match difficulty {
            Difficulty::Beginner => self.beginner,
            Difficulty::Novice => self.novice,
            Difficulty::Intermediate => self.intermediate,
            Difficulty::Advanced => self.advanced,
        }
    }
}

/// Per-term contributions of one candidate's score
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreBreakdown {
    pub patch: f64,
    pub stage_match: f64,
    pub difficulty: f64,
    pub distance_penalty: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.patch + self.stage_match + self.difficulty - self.distance_penalty
    }
}

#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// `"<major>.<minor>"` as `major * 100 + minor`; anything unparsable scores 0
pub fn patch_score(patch: Option<&str>) -> f64 {
    let Some(patch) = patch else {
        return 0.0;
    };
    let mut parts = patch.trim().split('.');
    let parsed = match (parts.next(), parts.next()) {
        (Some(major), Some(minor)) => major
            .trim()
            .parse::<f64>()
            .ok()
            .zip(minor.trim().parse::<f64>().ok()),
        _ => None,
    };

    match parsed {
        Some((major, minor)) if major.is_finite() && minor.is_finite() => major * 100.0 + minor,
        _ => 0.0,
    }
}

/// Rescores candidates and keeps the best `keep`
#[derive(Debug, Clone)]
pub struct Reranker {
    weights: RerankWeights,
    keep: usize,
}

impl Reranker {
    pub fn new(keep: usize) -> Self {
        Self::with_weights(keep, RerankWeights::default())
    }

    pub fn with_weights(keep: usize, weights: RerankWeights) -> Self {
        Self { weights, keep }
    }

    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self::new(config.rerank_top_k)
    }

    pub fn breakdown(&self, candidate: &Candidate, state: Option<&SituationalState>) -> ScoreBreakdown {
        let metadata = &candidate.metadata;

        let stage_match = match state {
            Some(state) if metadata.text("game_stage") == Some(state.round.as_str()) => {
                self.weights.stage_match
            }
            _ => 0.0,
        };

        let distance_penalty = match candidate.distance {
            Some(d) if d.is_finite() => f64::from(d) * self.weights.distance,
            _ => 0.0,
        };

        ScoreBreakdown {
            patch: patch_score(metadata.text("patch")),
            stage_match,
            difficulty: self.difficulty_score(metadata),
            distance_penalty,
        }
    }

    // A record without a difficulty is treated as novice; an unrecognized one scores 0.
    fn difficulty_score(&self, metadata: &Metadata) -> f64 {
        match metadata.text("difficulty") {
            None => self.weights.difficulty(Difficulty::default()),
            Some(label) => label
                .parse::<Difficulty>()
                .map(|d| self.weights.difficulty(d))
                .unwrap_or(0.0),
        }
    }

    pub fn score(&self, candidate: &Candidate, state: Option<&SituationalState>) -> f64 {
        self.breakdown(candidate, state).total()
    }

    /// Score, stable-sort descending and truncate to `keep`
    pub fn rank(&self, candidates: Vec<Candidate>, state: Option<&SituationalState>) -> Vec<ScoredCandidate> {
        let mut scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .map(|candidate| {
                let breakdown = self.breakdown(&candidate, state);
                ScoredCandidate {
                    score: breakdown.total(),
                    breakdown,
                    candidate,
                }
            })
            .collect();

        // sort_by is stable: equal scores keep their input order
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(self.keep);

        for s in &scored {
            debug!(
                "  {} score={:.2} (patch={:.0} stage={:.0} difficulty={:.0} distance=-{:.2})",
                s.candidate.id,
                s.score,
                s.breakdown.patch,
                s.breakdown.stage_match,
                s.breakdown.difficulty,
                s.breakdown.distance_penalty
            );
        }
        scored
    }

    pub fn rerank(&self, candidates: Vec<Candidate>, state: Option<&SituationalState>) -> Vec<Candidate> {
        self.rank(candidates, state)
            .into_iter()
            .map(|s| s.candidate)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MetadataValue;

    fn candidate(id: &str, patch: &str, stage: &str, difficulty: &str, distance: Option<f32>) -> Candidate {
        let mut metadata = Metadata::new();
        metadata.insert("patch", MetadataValue::Text(patch.to_string()));
        metadata.insert("game_stage", MetadataValue::Text(stage.to_string()));
        metadata.insert("difficulty", MetadataValue::Text(difficulty.to_string()));
        Candidate {
            id: id.to_string(),
            text: format!("text of {}", id),
            metadata,
            distance,
        }
    }

    fn state(round: &str) -> SituationalState {
        SituationalState::new(round, 6, 40, 60).unwrap()
    }

    #[test]
    fn test_patch_score() {
        assert_eq!(patch_score(Some("13.24")), 1324.0);
        assert_eq!(patch_score(Some("14.1")), 1401.0);
        assert_eq!(patch_score(Some("13.24.1")), 1324.0);
        assert_eq!(patch_score(Some("13")), 0.0);
        assert_eq!(patch_score(Some("latest")), 0.0);
        assert_eq!(patch_score(Some("nan.1")), 0.0);
        assert_eq!(patch_score(None), 0.0);
    }

    #[test]
    fn test_stage_match_beats_distance() {
        let reranker = Reranker::new(3);
        let far_match = candidate("a", "13.24", "3-2", "novice", Some(1.9));
        let near_miss = candidate("b", "13.24", "2-1", "novice", Some(0.0));

        let ranked = reranker.rerank(vec![near_miss, far_match], Some(&state("3-2")));
        assert_eq!(ranked[0].id, "a");
        assert_eq!(ranked[1].id, "b");
    }

    #[test]
    fn test_stage_match_beats_recency_and_difficulty() {
        let reranker = Reranker::new(3);
        let old_match = candidate("old", "10.1", "4-1", "advanced", Some(0.5));
        let new_miss = candidate("new", "15.3", "2-1", "beginner", Some(0.1));

        let ranked = reranker.rerank(vec![new_miss, old_match], Some(&state("4-1")));
        assert_eq!(ranked[0].id, "old");
    }

    #[test]
    fn test_without_state_recency_leads() {
        let reranker = Reranker::new(3);
        let ranked = reranker.rerank(
            vec![
                candidate("old", "13.23", "3-2", "novice", None),
                candidate("new", "13.24", "2-1", "novice", None),
            ],
            None,
        );
        assert_eq!(ranked[0].id, "new");
    }

    #[test]
    fn test_difficulty_order() {
        let reranker = Reranker::new(5);
        let ranked = reranker.rerank(
            vec![
                candidate("adv", "13.24", "2-1", "advanced", None),
                candidate("int", "13.24", "2-1", "intermediate", None),
                candidate("nov", "13.24", "2-1", "초보", None),
                candidate("beg", "13.24", "2-1", "beginner", None),
                candidate("odd", "13.24", "2-1", "expert", None),
            ],
            None,
        );
        let ids: Vec<&str> = ranked.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["beg", "nov", "int", "adv", "odd"]);
    }

    #[test]
    fn test_missing_difficulty_counts_as_novice() {
        let reranker = Reranker::new(1);
        let mut c = candidate("x", "13.24", "2-1", "novice", None);
        let with_label = reranker.score(&c, None);
        c.metadata = {
            let mut m = Metadata::new();
            m.insert("patch", MetadataValue::Text("13.24".to_string()));
            m
        };
        assert_eq!(reranker.score(&c, None), with_label);
    }

    #[test]
    fn test_distance_penalty() {
        let reranker = Reranker::new(3);
        let c = candidate("d", "13.24", "2-1", "novice", Some(0.25));
        let breakdown = reranker.breakdown(&c, None);
        assert_eq!(breakdown.distance_penalty, 2.5);
        assert_eq!(breakdown.total(), 1324.0 + 80.0 - 2.5);
    }

    #[test]
    fn test_small_distance_gap_resolved_under_stage_match() {
        let reranker = Reranker::new(2);
        let ranked = reranker.rerank(
            vec![
                candidate("worse", "14.1", "3-2", "novice", Some(0.3002)),
                candidate("better", "14.1", "3-2", "novice", Some(0.3000)),
            ],
            Some(&state("3-2")),
        );
        let ids: Vec<&str> = ranked.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["better", "worse"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let reranker = Reranker::new(3);
        let ranked = reranker.rerank(
            vec![
                candidate("first", "13.24", "2-1", "novice", None),
                candidate("second", "13.24", "2-1", "novice", None),
                candidate("third", "13.24", "2-1", "novice", None),
            ],
            None,
        );
        let ids: Vec<&str> = ranked.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_truncates_to_keep() {
        let reranker = Reranker::new(2);
        let candidates = (0..5)
            .map(|i| candidate(&format!("c{}", i), "13.24", "2-1", "novice", Some(i as f32 * 0.1)))
            .collect();
        let ranked = reranker.rerank(candidates, None);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].id, "c0");
        assert_eq!(ranked[1].id, "c1");
    }

    #[test]
    fn test_empty_input() {
        let reranker = Reranker::new(3);
        assert!(reranker.rerank(vec![], Some(&state("3-2"))).is_empty());
    }
}
