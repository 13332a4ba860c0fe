//! Segmentation of cleaned strategy text into annotated chunks
//!
//! Windows are packed greedily up to `chunk_size` characters, cut at the
//! strongest separator available in the window (paragraph, line, sentence,
//! word, then raw characters). Each window after the first starts
//! `chunk_overlap` characters before the end of the previous one.

use crate::config::RetrievalConfig;
use crate::error::{Error, Result};
use crate::rules::{detect_game_stage, detect_strategy_type, extract_champions};
use crate::types::{BaseAttributes, Chunk, StrategyRecord};
use std::time::SystemTime;
use tracing::{debug, warn};

/// Cut points in priority order. Raw characters are the implicit last level.
pub const SEPARATORS: &[&str] = &["\n\n\n", "\n\n", "\n", ". ", "! ", "? ", " "];

/// Source identifier used in chunk ids when the document has none
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Splits text into overlapping windows and tags each one
#[derive(Debug, Clone)]
pub struct Segmenter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Segmenter {
    /// Sizes are in characters. Requires `0 < chunk_size` and `chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Config("chunk_size must be positive".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn from_config(config: &RetrievalConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Split `text` into windows of at most `chunk_size` characters
    pub fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let text = text.trim();
        if text.is_empty() {
            return vec![];
        }

        // byte offset of every char, plus the end of the text
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let total = bounds.len() - 1;

        let mut windows = Vec::new();
        let mut start = 0;
        loop {
            let limit = (start + self.chunk_size).min(total);
            if limit == total {
                windows.push(&text[bounds[start]..]);
                break;
            }
            let end = self.cut_point(text, &bounds, start, limit);
            windows.push(&text[bounds[start]..bounds[end]]);
            start = end - self.chunk_overlap;
        }

        windows.retain(|w| !w.trim().is_empty());
        windows
    }

    /// Char position to end the window starting at `start`.
    /// Must land past `start + chunk_overlap` so the next window advances.
    fn cut_point(&self, text: &str, bounds: &[usize], start: usize, limit: usize) -> usize {
        let floor = start + self.chunk_overlap;
        let window = &text[bounds[start]..bounds[limit]];

        for sep in SEPARATORS {
            // the last occurrence is the greediest; earlier ones cannot clear the floor either
            let Some(idx) = window.rfind(sep) else {
                continue;
            };
            let byte = bounds[start] + idx + sep.len();
            if let Ok(cut) = bounds.binary_search(&byte) {
                if cut > floor {
                    return cut;
                }
            }
        }
        limit
    }

    /// Split one document and tag every window
    pub fn segment(&self, text: &str, attrs: &BaseAttributes) -> Vec<Chunk> {
        let source = attrs
            .video_source
            .clone()
            .unwrap_or_else(|| UNKNOWN_SOURCE.to_string());
        let created_at = now_unix();

        let chunks: Vec<Chunk> = self
            .split(text)
            .into_iter()
            .enumerate()
            .map(|(idx, piece)| Chunk {
                id: format!("{}_{}", source, idx),
                text: piece.to_string(),
                metadata: StrategyRecord {
                    season: attrs.season.clone().unwrap_or_default(),
                    patch: attrs.patch.clone().unwrap_or_default(),
                    game_stage: detect_game_stage(piece),
                    strategy_type: detect_strategy_type(piece),
                    composition_name: attrs.composition_name.clone(),
                    key_champions: extract_champions(piece),
                    synergies: attrs.synergies.clone(),
                    core_items: attrs.core_items.clone(),
                    difficulty: attrs.difficulty,
                    prerequisites: attrs.prerequisites.clone(),
                    timestamp: attrs.timestamp.clone(),
                    video_source: source.clone(),
                    created_at,
                },
            })
            .collect();

        debug!("Segmented source '{}' into {} chunks", source, chunks.len());
        chunks
    }

    /// Segment parallel lists of documents and attribute sets, keeping per-source order
    pub fn segment_batch<S: AsRef<str>>(&self, texts: &[S], attrs: &[BaseAttributes]) -> Vec<Chunk> {
        if texts.len() != attrs.len() {
            warn!(
                "segment_batch got {} texts but {} attribute sets; extra entries are ignored",
                texts.len(),
                attrs.len()
            );
        }

        texts
            .iter()
            .zip(attrs)
            .flat_map(|(text, attrs)| self.segment(text.as_ref(), attrs))
            .collect()
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
