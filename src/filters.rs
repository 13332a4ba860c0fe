//! Query-time metadata filters

use crate::rules::{infer_game_stage, match_strategy_type};
use crate::types::{SearchFilter, SituationalState};

/// Derives equality constraints from a question and optional game state
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterBuilder;

impl FilterBuilder {
    pub fn new() -> Self {
        Self
    }

    /// The state's round, when given, is used verbatim and overrides any stage
    /// mentioned in the query. No field falls back to a default.
    pub fn build_filter(&self, query: &str, state: Option<&SituationalState>) -> SearchFilter {
        let game_stage = match state {
            Some(state) => Some(state.round.clone()),
            None => infer_game_stage(query),
        };

        SearchFilter {
            game_stage,
            strategy_type: match_strategy_type(query),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StrategyType;

    fn state(round: &str) -> SituationalState {
        SituationalState::new(round, 5, 32, 78).unwrap()
    }

    #[test]
    fn test_stage_from_query() {
        let filter = FilterBuilder::new().build_filter("2-1에서 뭐 해야 해?", None);
        assert_eq!(filter.game_stage.as_deref(), Some("2-1"));
        assert_eq!(filter.strategy_type, None);
    }

    #[test]
    fn test_state_round_overrides_query() {
        let filter = FilterBuilder::new().build_filter("후반 4-5에 리롤할까?", Some(&state("3-2")));
        assert_eq!(filter.game_stage.as_deref(), Some("3-2"));
        assert_eq!(filter.strategy_type, Some(StrategyType::Reroll));
    }

    #[test]
    fn test_state_round_not_validated() {
        let filter = FilterBuilder::new().build_filter("뭐 사요?", Some(&state("7-9")));
        assert_eq!(filter.game_stage.as_deref(), Some("7-9"));
    }

    #[test]
    fn test_coarse_keyword_constrains_stage() {
        let filter = FilterBuilder::new().build_filter("중반에 연패 중이에요", None);
        assert_eq!(filter.game_stage.as_deref(), Some("3-2"));
        assert_eq!(filter.strategy_type, Some(StrategyType::LossStreak));
    }

    #[test]
    fn test_no_signal_is_unconstrained() {
        let filter = FilterBuilder::new().build_filter("야스오 어때요?", None);
        assert!(filter.is_empty());
        assert!(filter.as_constraint().is_none());
    }

    #[test]
    fn test_strategy_only() {
        let filter = FilterBuilder::new().build_filter("아이템 뭐 만들어요?", None);
        assert_eq!(filter.game_stage, None);
        assert_eq!(filter.strategy_type, Some(StrategyType::ItemJudgment));
        assert_eq!(
            filter.constraints(),
            vec![("strategy_type", "item-judgment".to_string())]
        );
    }
}
