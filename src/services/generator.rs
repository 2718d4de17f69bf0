use crate::core::novel::{ChapterKey, ChapterPayload};
use crate::services::llm::LlmClient;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

/// Produces chapter content for a (novel, index) pair. Latency and failure
/// are entirely up to the implementation.
#[async_trait]
pub trait ChapterGenerator: Send + Sync {
    async fn generate(&self, novel: &str, index: usize) -> Result<ChapterPayload>;
}

const AUTHOR_SYSTEM_PROMPT: &str =
    "You are a serial web-novel author. Respond with valid JSON only.";

pub struct LlmChapterGenerator {
    llm: Arc<dyn LlmClient>,
}

impl LlmChapterGenerator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[derive(Deserialize)]
struct ChapterDraft {
    title: String,
    body: String,
}

#[async_trait]
impl ChapterGenerator for LlmChapterGenerator {
    async fn generate(&self, novel: &str, index: usize) -> Result<ChapterPayload> {
        let prompt = format!(
            "Write chapter {chapter} of the ongoing web novel \"{novel}\". \
             Continue the story naturally; around 1500-2500 characters of prose. \
             Return one JSON object: {{ \"title\": \"...\", \"body\": \"...\" }} \
             where body contains the full chapter text with paragraph breaks.",
            chapter = index + 1,
        );

        let raw = self.llm.chat(AUTHOR_SYSTEM_PROMPT, &prompt).await?;
        let clean = strip_code_blocks(&raw);
        let draft: ChapterDraft = serde_json::from_str(&clean)
            .with_context(|| format!("Failed to parse chapter JSON: {clean}"))?;

        Ok(ChapterPayload {
            key: ChapterKey::new(novel, index),
            title: draft.title,
            body: draft.body,
            sequence: index + 1,
        })
    }
}

pub fn strip_code_blocks(s: &str) -> String {
    let s = s.trim();
    if s.starts_with("```json") {
        s.trim_start_matches("```json")
            .trim_end_matches("```")
            .trim()
            .to_string()
    } else if s.starts_with("```") {
        s.trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
            .to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::Mutex;

    #[test]
    fn strip_code_blocks_variants() {
        assert_eq!(strip_code_blocks("{}"), "{}");
        assert_eq!(strip_code_blocks("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("```\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("  ```json  \n  {}  \n  ```  "), "{}");
    }

    #[derive(Debug)]
    struct ScriptedLlm {
        replies: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn chat(&self, _system: &str, _user: &str) -> Result<String> {
            self.replies
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| anyhow!("no scripted reply"))
        }
    }

    #[tokio::test]
    async fn generates_payload_from_fenced_json() {
        let llm = Arc::new(ScriptedLlm {
            replies: Mutex::new(vec![
                "```json\n{\"title\": \"The Gate\", \"body\": \"Rain fell on the city.\"}\n```"
                    .to_string(),
            ]),
        });
        let generator = LlmChapterGenerator::new(llm);

        let payload = generator.generate("Ashes of the Sky", 0).await.unwrap();
        assert_eq!(payload.key, ChapterKey::new("Ashes of the Sky", 0));
        assert_eq!(payload.title, "The Gate");
        assert_eq!(payload.sequence, 1);
        assert!(payload.body.contains("Rain"));
    }

    #[tokio::test]
    async fn malformed_json_is_an_error() {
        let llm = Arc::new(ScriptedLlm {
            replies: Mutex::new(vec!["not json at all".to_string()]),
        });
        let generator = LlmChapterGenerator::new(llm);
        assert!(generator.generate("NovelA", 0).await.is_err());
    }
}
