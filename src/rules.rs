//! Ordered keyword rule tables for tagging text
//!
//! Precedence is the position in each table: the first rule that fires wins,
//! regardless of where its keyword occurs in the text. The segmenter applies
//! the fallback defaults; the filter builder leaves a field unconstrained
//! instead.

use crate::types::StrategyType;
use regex::Regex;
use std::sync::LazyLock;

/// Strategy type assigned to a chunk when no rule fires
pub const DEFAULT_STRATEGY: StrategyType = StrategyType::UnitSelection;

/// Stage assigned to a chunk when neither a round marker nor a keyword is present
pub const DEFAULT_STAGE: &str = "2-1";

/// One row of the strategy table
#[derive(Debug, Clone, Copy)]
pub struct StrategyRule {
    pub strategy: StrategyType,
    pub keywords: &'static [&'static str],
}

pub const STRATEGY_RULES: &[StrategyRule] = &[
    StrategyRule {
        strategy: StrategyType::Reroll,
        keywords: &["리롤", "돌림", "돌려", "reroll", "roll down"],
    },
    StrategyRule {
        strategy: StrategyType::Leveling,
        keywords: &["레벨", "level up", "leveling"],
    },
    StrategyRule {
        strategy: StrategyType::WinStreak,
        keywords: &["연승", "win streak"],
    },
    StrategyRule {
        strategy: StrategyType::LossStreak,
        keywords: &["연패", "loss streak", "lose streak"],
    },
    StrategyRule {
        strategy: StrategyType::Pivot,
        keywords: &["전환", "바꾸", "pivot"],
    },
    StrategyRule {
        strategy: StrategyType::Hold,
        keywords: &["고정", "유지"],
    },
    StrategyRule {
        strategy: StrategyType::ItemJudgment,
        keywords: &["아이템", "item"],
    },
];

/// One row of the stage table
#[derive(Debug, Clone, Copy)]
pub enum StageRule {
    /// First literal `<major>-<minor>` round marker, major 2-5, minor 1-7
    RoundMarker,
    /// Coarse game-phase keyword mapped to a representative round
    Keywords {
        keywords: &'static [&'static str],
        stage: &'static str,
    },
}

pub const STAGE_RULES: &[StageRule] = &[
    StageRule::RoundMarker,
    StageRule::Keywords {
        keywords: &["초반", "크립", "early game"],
        stage: "2-1",
    },
    StageRule::Keywords {
        keywords: &["중반", "mid game"],
        stage: "3-2",
    },
    StageRule::Keywords {
        keywords: &["후반", "late game"],
        stage: "4-1",
    },
];

/// Champion names recognized in chunk text, in reporting order
pub const CHAMPION_VOCABULARY: &[&str] = &[
    "야스오", "요네", "제드", "아리", "세트", "케넨", "볼리베어", "오공", "리산드라", "아지르",
    "킨드레드",
];

// Digits on either side disqualify the marker, so "12-1" and "2-13" are not rounds.
// Letters do not: "2-1에서" carries round 2-1.
static ROUND_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9])([2-5]-[1-7])(?:[^0-9]|$)").expect("round marker pattern is valid")
});

fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| haystack.contains(k))
}

/// First occurring round marker in `text`
pub fn find_round_marker(text: &str) -> Option<String> {
    ROUND_MARKER
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Strategy type of the first firing rule, if any
pub fn match_strategy_type(text: &str) -> Option<StrategyType> {
    let lowered = text.to_lowercase();
    STRATEGY_RULES
        .iter()
        .find(|rule| contains_any(&lowered, rule.keywords))
        .map(|rule| rule.strategy)
}

/// Strategy type with the unit-selection fallback
pub fn detect_strategy_type(text: &str) -> StrategyType {
    match_strategy_type(text).unwrap_or(DEFAULT_STRATEGY)
}

/// Stage of the first firing rule, if any
pub fn infer_game_stage(text: &str) -> Option<String> {
    let lowered = text.to_lowercase();
    STAGE_RULES.iter().find_map(|rule| match rule {
        StageRule::RoundMarker => find_round_marker(text),
        StageRule::Keywords { keywords, stage } => {
            contains_any(&lowered, keywords).then(|| stage.to_string())
        }
    })
}

/// Stage with the "2-1" fallback
pub fn detect_game_stage(text: &str) -> String {
    infer_game_stage(text).unwrap_or_else(|| DEFAULT_STAGE.to_string())
}

/// Vocabulary champions mentioned in `text`, in vocabulary order
pub fn extract_champions(text: &str) -> Vec<String> {
    CHAMPION_VOCABULARY
        .iter()
        .filter(|name| text.contains(*name))
        .map(|name| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_round_marker_wins() {
        assert_eq!(detect_game_stage("4-1 이후에는 3-2 때 모은 골드를 쓰세요"), "4-1");
        assert_eq!(detect_game_stage("5-7, then 2-1"), "5-7");
    }

    #[test]
    fn test_round_marker_followed_by_hangul() {
        assert_eq!(find_round_marker("2-1에서 뭐 해야 해?"), Some("2-1".to_string()));
    }

    #[test]
    fn test_out_of_range_markers_ignored() {
        assert_eq!(find_round_marker("1-1 and 6-2 and 2-8"), None);
        assert_eq!(find_round_marker("12-1 or 2-13"), None);
    }

    #[test]
    fn test_round_marker_beats_keywords() {
        // "후반" appears first but round markers take precedence
        assert_eq!(detect_game_stage("후반에는 3-5 전에 정리"), "3-5");
    }

    #[test]
    fn test_coarse_keyword_fallback() {
        assert_eq!(detect_game_stage("초반 크립 라운드"), "2-1");
        assert_eq!(detect_game_stage("중반부터 체력 관리"), "3-2");
        assert_eq!(detect_game_stage("후반 캐리"), "4-1");
        assert_eq!(detect_game_stage("Late game carries"), "4-1");
    }

    #[test]
    fn test_mid_keyword_outranks_late_keyword() {
        assert_eq!(detect_game_stage("후반보다 중반이 중요"), "3-2");
    }

    #[test]
    fn test_stage_default() {
        assert_eq!(detect_game_stage("아무 신호 없음"), DEFAULT_STAGE);
        assert_eq!(infer_game_stage("아무 신호 없음"), None);
    }

    #[test]
    fn test_strategy_precedence_follows_table_order() {
        // pivot keyword comes first in text, reroll rule comes first in table
        assert_eq!(detect_strategy_type("전환하고 리롤"), StrategyType::Reroll);
        assert_eq!(detect_strategy_type("연패하다가 레벨업"), StrategyType::Leveling);
        assert_eq!(detect_strategy_type("아이템 유지"), StrategyType::Hold);
    }

    #[test]
    fn test_strategy_each_rule() {
        assert_eq!(detect_strategy_type("돌려서 2성"), StrategyType::Reroll);
        assert_eq!(detect_strategy_type("연승 보상"), StrategyType::WinStreak);
        assert_eq!(detect_strategy_type("연패 보상"), StrategyType::LossStreak);
        assert_eq!(detect_strategy_type("조합을 바꾸세요"), StrategyType::Pivot);
        assert_eq!(detect_strategy_type("무한의 대검 아이템"), StrategyType::ItemJudgment);
        assert_eq!(detect_strategy_type("Roll down at 4-1"), StrategyType::Reroll);
    }

    #[test]
    fn test_strategy_fallback() {
        assert_eq!(match_strategy_type("야스오를 사세요"), None);
        assert_eq!(detect_strategy_type("야스오를 사세요"), StrategyType::UnitSelection);
    }

    #[test]
    fn test_champions_follow_vocabulary_order() {
        let found = extract_champions("제드 다음에 야스오, 그리고 아지르");
        assert_eq!(found, vec!["야스오", "제드", "아지르"]);
        assert!(extract_champions("nothing here").is_empty());
    }
}
