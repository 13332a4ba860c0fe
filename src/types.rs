//! Core type definitions for strategy retrieval

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Closed set of advice categories a chunk can carry
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyType {
    #[serde(alias = "리롤")]
    Reroll,
    #[serde(alias = "레벨링")]
    Leveling,
    #[serde(alias = "연승")]
    WinStreak,
    #[serde(alias = "연패")]
    LossStreak,
    #[serde(alias = "전환")]
    Pivot,
    #[serde(alias = "고정")]
    Hold,
    #[serde(alias = "아이템 판단")]
    ItemJudgment,
    #[serde(alias = "기물 선택")]
    UnitSelection,
}

impl StrategyType {
    pub const ALL: [StrategyType; 8] = [
        StrategyType::Reroll,
        StrategyType::Leveling,
        StrategyType::WinStreak,
        StrategyType::LossStreak,
        StrategyType::Pivot,
        StrategyType::Hold,
        StrategyType::ItemJudgment,
        StrategyType::UnitSelection,
    ];

    /// Wire token stored in the index and used in filters
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyType::Reroll => "reroll",
            StrategyType::Leveling => "leveling",
            StrategyType::WinStreak => "win-streak",
            StrategyType::LossStreak => "loss-streak",
            StrategyType::Pivot => "pivot",
            StrategyType::Hold => "hold",
            StrategyType::ItemJudgment => "item-judgment",
            StrategyType::UnitSelection => "unit-selection",
        }
    }

    /// Korean label used by the source transcripts
    pub fn label(&self) -> &'static str {
        match self {
            StrategyType::Reroll => "리롤",
            StrategyType::Leveling => "레벨링",
            StrategyType::WinStreak => "연승",
            StrategyType::LossStreak => "연패",
            StrategyType::Pivot => "전환",
            StrategyType::Hold => "고정",
            StrategyType::ItemJudgment => "아이템 판단",
            StrategyType::UnitSelection => "기물 선택",
        }
    }
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        StrategyType::ALL
            .into_iter()
            .find(|t| t.as_str() == s || t.label() == s)
            .ok_or_else(|| Error::Unrecognized {
                kind: "strategy type",
                value: s.to_string(),
            })
    }
}

/// Audience level of a strategy
#[derive(Debug, Clone, Copy, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Difficulty {
    #[serde(alias = "입문")]
    Beginner,
    #[default]
    #[serde(alias = "초보")]
    Novice,
    #[serde(alias = "중급")]
    Intermediate,
    #[serde(alias = "고급")]
    Advanced,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Beginner,
        Difficulty::Novice,
        Difficulty::Intermediate,
        Difficulty::Advanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Novice => "novice",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "입문",
            Difficulty::Novice => "초보",
            Difficulty::Intermediate => "중급",
            Difficulty::Advanced => "고급",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Difficulty::ALL
            .into_iter()
            .find(|d| d.as_str() == s || d.label() == s)
            .ok_or_else(|| Error::Unrecognized {
                kind: "difficulty",
                value: s.to_string(),
            })
    }
}

/// Descriptive tags attached to a chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyRecord {
    pub season: String,
    pub patch: String,         // dot-separated, e.g. "13.24"
    pub game_stage: String,    // "<major>-<minor>"
    pub strategy_type: StrategyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition_name: Option<String>,
    #[serde(default)]
    pub key_champions: Vec<String>,
    #[serde(default)]
    pub synergies: Vec<String>,
    #[serde(default)]
    pub core_items: Vec<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prerequisites: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,  // position in the source video, e.g. "3:24-5:18"
    pub video_source: String,
    pub created_at: i64,            // unix timestamp
}

/// Immutable unit of retrievable text produced by the segmenter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub metadata: StrategyRecord,
}

/// Per-document attributes supplied by the acquisition step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseAttributes {
    pub season: Option<String>,
    pub patch: Option<String>,
    pub video_source: Option<String>,
    pub composition_name: Option<String>,
    pub difficulty: Difficulty,
    pub synergies: Vec<String>,
    pub core_items: Vec<String>,
    pub prerequisites: Option<String>,
    pub timestamp: Option<String>,
}

/// Snapshot of the caller's current game, used to bias filtering and reranking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SituationalState {
    pub round: String,
    pub level: u32,
    pub gold: u32,
    pub hp: u32,
    #[serde(default)]
    pub current_champions: Vec<String>,
    #[serde(default)]
    pub bench_champions: Vec<String>,
    #[serde(default)]
    pub active_synergies: Vec<String>,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub win_streak: u32,
    #[serde(default)]
    pub loss_streak: u32,
    #[serde(default)]
    pub question: String,
}

impl SituationalState {
    pub fn new(round: impl Into<String>, level: u32, gold: u32, hp: u32) -> Result<Self> {
        let state = Self {
            round: round.into(),
            level,
            gold,
            hp,
            current_champions: vec![],
            bench_champions: vec![],
            active_synergies: vec![],
            items: vec![],
            win_streak: 0,
            loss_streak: 0,
            question: String::new(),
        };
        state.validate()?;
        Ok(state)
    }

    /// Check level 1-10 and hp 0-100
    pub fn validate(&self) -> Result<()> {
        if !(1..=10).contains(&self.level) {
            return Err(Error::InvalidState(format!(
                "level must be within 1-10, got {}",
                self.level
            )));
        }
        if self.hp > 100 {
            return Err(Error::InvalidState(format!(
                "hp must be within 0-100, got {}",
                self.hp
            )));
        }
        Ok(())
    }
}

/// Equality constraints on indexed metadata. Absent field = unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_type: Option<StrategyType>,
}

impl SearchFilter {
    pub fn is_empty(&self) -> bool {
        self.game_stage.is_none() && self.strategy_type.is_none()
    }

    /// `None` when nothing is constrained
    pub fn as_constraint(&self) -> Option<&SearchFilter> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }

    /// Constraints as (metadata key, required value) pairs
    pub fn constraints(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::with_capacity(2);
        if let Some(ref stage) = self.game_stage {
            out.push(("game_stage", stage.clone()));
        }
        if let Some(strategy) = self.strategy_type {
            out.push(("strategy_type", strategy.as_str().to_string()));
        }
        out
    }
}

/// One decoded metadata value of a retrieved record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Text(String),
    List(Vec<String>),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

/// Metadata bag of a retrieved record, with sequences restored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, MetadataValue>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: MetadataValue) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.0.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(MetadataValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn list(&self, key: &str) -> Option<&[String]> {
        match self.0.get(key) {
            Some(MetadataValue::List(items)) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn from_record(record: &StrategyRecord) -> Self {
        let mut m = Self::new();
        let text = |s: &str| MetadataValue::Text(s.to_string());

        m.insert("season", text(&record.season));
        m.insert("patch", text(&record.patch));
        m.insert("game_stage", text(&record.game_stage));
        m.insert("strategy_type", text(record.strategy_type.as_str()));
        if let Some(ref name) = record.composition_name {
            m.insert("composition_name", text(name));
        }
        m.insert("key_champions", MetadataValue::List(record.key_champions.clone()));
        m.insert("synergies", MetadataValue::List(record.synergies.clone()));
        m.insert("core_items", MetadataValue::List(record.core_items.clone()));
        m.insert("difficulty", text(record.difficulty.as_str()));
        if let Some(ref p) = record.prerequisites {
            m.insert("prerequisites", text(p));
        }
        if let Some(ref ts) = record.timestamp {
            m.insert("timestamp", text(ts));
        }
        m.insert("video_source", text(&record.video_source));
        m.insert("created_at", MetadataValue::Integer(record.created_at));
        m
    }
}

impl FromIterator<(String, MetadataValue)> for Metadata {
    fn from_iter<T: IntoIterator<Item = (String, MetadataValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Record returned by a candidate source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    /// Similarity distance, lower is closer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
}

/// Shown for provenance fields a record does not carry
pub const UNKNOWN_PROVENANCE: &str = "알 수 없음";

/// Provenance entry attached to an answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Source {
    pub video_source: String,
    pub timestamp: String,
    pub game_stage: String,
    pub strategy_type: String,
}

impl Source {
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let field = |key: &str| metadata.text(key).unwrap_or(UNKNOWN_PROVENANCE).to_string();
        Self {
            video_source: field("video_source"),
            timestamp: field("timestamp"),
            game_stage: field("game_stage"),
            strategy_type: field("strategy_type"),
        }
    }
}

/// Response to a question
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<Source>,
    pub retrieved: Vec<Candidate>,
    /// Set when no generation service is configured and the answer is the raw context
    pub grounding_only: bool,
}
