//! Optional answer generation over retrieved context
//!
//! Whether generation is available is decided once at startup and carried as
//! [`Generation`]; callers match on it instead of probing a nullable client.

use crate::config::GenerationConfig;
use crate::types::SituationalState;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Prepended to the raw context when no generator is configured
pub const GROUNDING_ONLY_PREFIX: &str =
    "⚠ 답변 생성 API 키가 설정되지 않아 검색 결과만 제공합니다.\n\n";

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub const SYSTEM_PROMPT: &str = "당신은 롤체(TFT) 초보자를 돕는 친절한 코치입니다.

역할:
- 검색된 유튜버 전략을 바탕으로 현재 게임 상황에 맞는 조언 제공
- 초보자가 이해하기 쉽게 설명
- 구체적이고 실행 가능한 조언

제약사항:
1. 검색된 전략 정보에만 기반하여 답변 (환각 금지)
2. 정보가 불충분하면 솔직히 \"더 구체적인 상황을 알려주세요\" 라고 말하기
3. 영상에 없는 정보는 절대 만들어내지 않기
4. 불확실하면 조건부 답변 (\"만약 ~라면, ~하세요\")

말투:
- 친근하고 격려하는 톤
- \"~하세요\", \"~해보세요\" 같은 존댓말
- 전문 용어는 간단히 설명
";

#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(
        &self,
        question: &str,
        context: &str,
        state: Option<&SituationalState>,
    ) -> Result<String>;
}

/// Resolved generation capability
pub enum Generation {
    Enabled(Box<dyn AnswerGenerator>),
    GroundingOnly,
}

impl Generation {
    /// Enabled when an API key is configured
    pub fn from_config(config: &GenerationConfig) -> Self {
        match config.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => {
                info!("Answer generation enabled ({})", config.model);
                Generation::Enabled(Box::new(HttpGenerator::new(config, key)))
            }
            _ => {
                warn!("No generation API key configured; answers will be grounding-only");
                Generation::GroundingOnly
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Generation::Enabled(_))
    }
}

impl std::fmt::Debug for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Generation::Enabled(g) => write!(f, "Enabled({})", g.name()),
            Generation::GroundingOnly => f.write_str("GroundingOnly"),
        }
    }
}

fn join_or(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        empty.to_string()
    } else {
        items.join(", ")
    }
}

/// User prompt: game state (if any), strategy context, then the question with the answer format
pub fn build_prompt(question: &str, context: &str, state: Option<&SituationalState>) -> String {
    let mut parts = Vec::with_capacity(3);

    if let Some(state) = state {
        parts.push(format!(
            "=== 현재 게임 상태 ===\n\
             - 라운드: {}\n\
             - 레벨: {}\n\
             - 골드: {}\n\
             - 체력: {}\n\
             - 현재 챔피언: {}\n\
             - 활성 시너지: {}\n\
             - 벤치: {}\n\
             - 보유 아이템: {}\n\
             - 연승: {}회\n\
             - 연패: {}회",
            state.round,
            state.level,
            state.gold,
            state.hp,
            join_or(&state.current_champions, "없음"),
            join_or(&state.active_synergies, "없음"),
            join_or(&state.bench_champions, "비어있음"),
            join_or(&state.items, "없음"),
            state.win_streak,
            state.loss_streak
        ));
    }

    parts.push(format!("=== 참고할 전략 정보 ===\n{}", context));

    parts.push(format!(
        "=== 사용자 질문 ===\n{}\n\n\
         위 전략 정보를 바탕으로, 현재 상황에서 어떻게 플레이해야 할지 조언해주세요.\n\
         답변은 다음 형식으로 부탁드립니다:\n\n\
         1. **지금 바로 해야 할 일** (1-2문장)\n\
         2. **그 이유** (간단히)\n\
         3. **추가 팁** (있다면)\n\n\
         만약 전략 정보가 부족하다면 솔직히 말씀해주세요.",
        question
    ));

    parts.join("\n\n")
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

impl MessagesResponse {
    /// Text blocks joined in order; other block types are skipped
    fn into_answer(self) -> Result<String> {
        let answer: String = self
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");
        if answer.trim().is_empty() {
            anyhow::bail!("Generation service returned no text");
        }
        Ok(answer)
    }
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Messages-style LLM API client
pub struct HttpGenerator {
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

impl HttpGenerator {
    pub fn new(config: &GenerationConfig, api_key: &str) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl AnswerGenerator for HttpGenerator {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        question: &str,
        context: &str,
        state: Option<&SituationalState>,
    ) -> Result<String> {
        let prompt = build_prompt(question, context, state);
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: SYSTEM_PROMPT,
            messages: [Message {
                role: "user",
                content: &prompt,
            }],
        };

        let url = format!("{}/v1/messages", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .context("Failed to call generation service")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Generation service error ({}): {}", status, error_text);
        }

        let body: MessagesResponse = response
            .json()
            .await
            .context("Failed to parse generation service response")?;

        body.into_answer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_without_state() {
        let prompt = build_prompt("리롤할까요?", "[전략 1]\n- 내용: 리롤", None);
        assert!(!prompt.contains("현재 게임 상태"));
        assert!(prompt.starts_with("=== 참고할 전략 정보 ===\n[전략 1]"));
        assert!(prompt.contains("=== 사용자 질문 ===\n리롤할까요?"));
        assert!(prompt.contains("1. **지금 바로 해야 할 일**"));
    }

    #[test]
    fn test_prompt_with_state() {
        let mut state = SituationalState::new("3-2", 6, 34, 55).unwrap();
        state.current_champions = vec!["야스오".to_string(), "요네".to_string()];
        state.loss_streak = 3;

        let prompt = build_prompt("뭐 해야 해?", "ctx", Some(&state));
        assert!(prompt.starts_with("=== 현재 게임 상태 ===\n- 라운드: 3-2"));
        assert!(prompt.contains("- 현재 챔피언: 야스오, 요네"));
        assert!(prompt.contains("- 벤치: 비어있음"));
        assert!(prompt.contains("- 연패: 3회"));
        let state_pos = prompt.find("현재 게임 상태").unwrap();
        let context_pos = prompt.find("참고할 전략 정보").unwrap();
        let question_pos = prompt.find("사용자 질문").unwrap();
        assert!(state_pos < context_pos && context_pos < question_pos);
    }

    #[test]
    fn test_generation_resolved_from_key() {
        let mut config = GenerationConfig::default();
        assert!(!Generation::from_config(&config).is_enabled());

        config.api_key = Some("  ".to_string());
        assert!(!Generation::from_config(&config).is_enabled());

        config.api_key = Some("sk-test".to_string());
        assert!(Generation::from_config(&config).is_enabled());
    }

    #[test]
    fn test_reply_text_blocks_joined() {
        let body: MessagesResponse = serde_json::from_str(
            r#"{
                "id": "msg_1",
                "content": [
                    {"type": "text", "text": "1. 지금 리롤하세요\n"},
                    {"type": "tool_use", "id": "t1", "name": "lookup", "input": {}},
                    {"type": "text", "text": "2. 야스오 2성을 노리세요"}
                ],
                "stop_reason": "end_turn"
            }"#,
        )
        .unwrap();
        assert_eq!(
            body.into_answer().unwrap(),
            "1. 지금 리롤하세요\n2. 야스오 2성을 노리세요"
        );
    }

    #[test]
    fn test_reply_without_text_is_error() {
        let body: MessagesResponse = serde_json::from_str(
            r#"{"content": [{"type": "tool_use", "id": "t1", "name": "lookup", "input": {}}, {"type": "text", "text": "  "}]}"#,
        )
        .unwrap();
        let err = body.into_answer().unwrap_err();
        assert!(err.to_string().contains("no text"));

        let body: MessagesResponse = serde_json::from_str(r#"{"content": []}"#).unwrap();
        assert!(body.into_answer().is_err());
    }
}
