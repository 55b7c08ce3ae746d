//! Collaborator traits the orchestrator drives but does not own the implementation
//! of: file I/O format, the LLM transport, prompt rendering, and text preservation.
//! Each ships one literal default so the crate runs end to end without a caller
//! supplying anything; a real deployment is expected to swap these in.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::cache::{CacheItem, CacheProject};
use crate::response::checker::Language;

/// Marks text the preserver has substituted out of the source before translation
/// (URLs, code spans, ruby markup). Lines still containing this sentinel are never
/// checked for translation quality — the model was asked to leave them untouched.
pub const TEXT_PRESERVER_PLACEHOLDER: &str = "#{[PRESERVE]}#";

#[derive(Debug, Clone, Default)]
pub struct PlatformConfig {
    pub name: String,
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub rps: u32,
    pub rpm: u32,
    pub max_workers: u32,
}

pub trait RuleFilter: Send + Sync {
    /// Returns true when `src` should be treated as already acceptable (a pure
    /// symbol/number line, or similar non-prose content not worth sending to an LLM).
    fn filter(&self, src: &str, skip_internal_filter: bool) -> bool;
}

pub struct DefaultRuleFilter;

impl RuleFilter for DefaultRuleFilter {
    fn filter(&self, src: &str, skip_internal_filter: bool) -> bool {
        if skip_internal_filter {
            return false;
        }
        let trimmed = src.trim();
        !trimmed.is_empty()
            && trimmed
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_punctuation() || c.is_whitespace())
    }
}

pub trait LanguageFilter: Send + Sync {
    /// Returns true when `src` is already in a target-acceptable form and needs
    /// no further scrutiny beyond the script/similarity checks.
    fn filter(&self, src: &str, source_lang: Language) -> bool;
}

pub struct DefaultLanguageFilter;

impl LanguageFilter for DefaultLanguageFilter {
    fn filter(&self, _src: &str, _source_lang: Language) -> bool {
        false
    }
}

#[async_trait]
pub trait TranslatorRequester: Send + Sync {
    /// Returns (response text, input tokens, output tokens).
    async fn request(&self, prompt: &str, platform: &PlatformConfig) -> Result<(String, u32, u32)>;
}

/// A `reqwest`-backed OpenAI-chat-completions-shaped client, mirroring the shape of
/// the crate's other provider clients.
pub struct OpenAiRequester {
    client: Client,
}

impl OpenAiRequester {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for OpenAiRequester {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[async_trait]
impl TranslatorRequester for OpenAiRequester {
    async fn request(&self, prompt: &str, platform: &PlatformConfig) -> Result<(String, u32, u32)> {
        let body = ChatRequest {
            model: platform.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: 0.0,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", platform.api_url.trim_end_matches('/')))
            .bearer_auth(&platform.api_key)
            .json(&body)
            .send()
            .await
            .context("request to translation endpoint failed")?
            .error_for_status()
            .context("translation endpoint returned an error status")?
            .json::<ChatResponse>()
            .await
            .context("failed to parse translation endpoint response")?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        let usage = response.usage.unwrap_or_default();

        Ok((text, usage.prompt_tokens, usage.completion_tokens))
    }
}

pub trait PromptBuilder: Send + Sync {
    fn build(&self, items: &[CacheItem], preceding: &[CacheItem], platform: &PlatformConfig) -> String;
}

pub struct DefaultPromptBuilder;

impl PromptBuilder for DefaultPromptBuilder {
    fn build(&self, items: &[CacheItem], preceding: &[CacheItem], platform: &PlatformConfig) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Translate the following lines for model {}. Reply with one JSON object per line, keyed by index.\n",
            platform.model
        ));
        if !preceding.is_empty() {
            out.push_str("Preceding context (do not translate):\n");
            for item in preceding {
                out.push_str(&format!("- {}\n", item.src));
            }
        }
        out.push_str("Lines:\n");
        for (i, item) in items.iter().enumerate() {
            out.push_str(&format!("{}: {}\n", i, item.src));
        }
        out
    }
}

/// Placeholder substitution for non-translatable spans. The default implementation
/// is a pass-through: it never substitutes anything, so `restore` is the identity.
/// Not wired into the task pipeline — only `TEXT_PRESERVER_PLACEHOLDER` itself
/// matters to the checker; substitution logic is a caller extension point.
#[allow(dead_code)]
pub trait TextPreserver: Send + Sync {
    fn preserve(&self, src: &str) -> String;
    fn restore(&self, dst: &str) -> String;
}

#[allow(dead_code)]
pub struct NoopTextPreserver;

impl TextPreserver for NoopTextPreserver {
    fn preserve(&self, src: &str) -> String {
        src.to_string()
    }

    fn restore(&self, dst: &str) -> String {
        dst.to_string()
    }
}

#[async_trait]
pub trait FileManager: Send + Sync {
    async fn read_from_path(&self, path: &Path) -> Result<(Vec<CacheItem>, CacheProject)>;
    async fn write_to_path(&self, path: &Path, items: &[CacheItem]) -> Result<()>;
}

/// Reads/writes a flat JSON array of `{file_path, src}` records — the simplest
/// source format a caller can hand the orchestrator without a project already
/// on disk.
pub struct FlatJsonFileManager;

#[derive(Serialize, Deserialize)]
struct FlatRecord {
    file_path: String,
    src: String,
    #[serde(default)]
    dst: String,
}

#[async_trait]
impl FileManager for FlatJsonFileManager {
    async fn read_from_path(&self, path: &Path) -> Result<(Vec<CacheItem>, CacheProject)> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading source file {}", path.display()))?;
        let records: Vec<FlatRecord> =
            serde_json::from_str(&raw).context("source file is not a JSON array of records")?;

        let items = records
            .into_iter()
            .map(|r| CacheItem::new(r.src, r.file_path))
            .collect();

        Ok((items, CacheProject::default()))
    }

    async fn write_to_path(&self, path: &Path, items: &[CacheItem]) -> Result<()> {
        let records: Vec<FlatRecord> = items
            .iter()
            .map(|item| FlatRecord {
                file_path: item.file_path.clone(),
                src: item.src.clone(),
                dst: item.dst.clone(),
            })
            .collect();
        let serialized = serde_json::to_string(&records)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, serialized)
            .await
            .with_context(|| format!("writing output file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rule_filter_accepts_pure_punctuation_lines() {
        let filter = DefaultRuleFilter;
        assert!(filter.filter("...", false));
        assert!(filter.filter("123", false));
        assert!(!filter.filter("Hello!", false));
    }

    #[test]
    fn default_rule_filter_respects_skip_internal() {
        let filter = DefaultRuleFilter;
        assert!(!filter.filter("...", true));
    }

    #[test]
    fn default_language_filter_never_matches() {
        let filter = DefaultLanguageFilter;
        assert!(!filter.filter("anything", Language::Ja));
    }

    #[test]
    fn noop_preserver_is_identity() {
        let preserver = NoopTextPreserver;
        assert_eq!(preserver.preserve("hello"), "hello");
        assert_eq!(preserver.restore("hello"), "hello");
    }

    #[tokio::test]
    async fn flat_json_file_manager_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let src_path = dir.path().join("in.json");
        tokio::fs::write(
            &src_path,
            r#"[{"file_path": "a.txt", "src": "hello"}]"#,
        )
        .await
        .unwrap();

        let manager = FlatJsonFileManager;
        let (items, _project) = manager.read_from_path(&src_path).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].src, "hello");

        let out_path = dir.path().join("out.json");
        manager.write_to_path(&out_path, &items).await.unwrap();
        let written = tokio::fs::read_to_string(&out_path).await.unwrap();
        assert!(written.contains("hello"));
    }

    #[test]
    fn default_prompt_builder_includes_every_line() {
        let builder = DefaultPromptBuilder;
        let items = vec![CacheItem::new("hi", "a.txt"), CacheItem::new("bye", "a.txt")];
        let platform = PlatformConfig {
            model: "test-model".into(),
            ..Default::default()
        };
        let prompt = builder.build(&items, &[], &platform);
        assert!(prompt.contains("hi"));
        assert!(prompt.contains("bye"));
        assert!(prompt.contains("test-model"));
    }
}
