//! The per-batch unit of work: build a prompt, call out, decode, validate, and
//! fold the outcome back into the chunk's items. Never propagates a `Result::Err`
//! to the scheduler — transport and parse failures are caught here and turned into
//! a no-op usage summary, leaving the chunk untouched for the next round.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{CacheStatus, ItemChunk};
use crate::collab::{PlatformConfig, PromptBuilder, TranslatorRequester};
use crate::error::LineError;
use crate::response::{checker, decoder, Language};

#[derive(Debug, Clone, Copy, Default)]
pub struct UsageSummary {
    pub row_count: u32,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

pub struct TranslatorTask {
    platform: PlatformConfig,
    source_lang: Language,
    target_lang: Language,
    requester: Arc<dyn TranslatorRequester>,
    prompt_builder: Arc<dyn PromptBuilder>,
}

impl TranslatorTask {
    pub fn new(
        platform: PlatformConfig,
        source_lang: Language,
        target_lang: Language,
        requester: Arc<dyn TranslatorRequester>,
        prompt_builder: Arc<dyn PromptBuilder>,
    ) -> Self {
        Self {
            platform,
            source_lang,
            target_lang,
            requester,
            prompt_builder,
        }
    }

    /// Runs the chunk to completion, mutating `chunk.items` in place and returning
    /// the round's usage summary. Always succeeds from the caller's point of view.
    pub async fn run(&self, chunk: &mut ItemChunk) -> UsageSummary {
        let prompt = self
            .prompt_builder
            .build(&chunk.items, &chunk.preceding, &self.platform);

        let (response, input_tokens, output_tokens) =
            match self.requester.request(&prompt, &self.platform).await {
                Ok(result) => result,
                Err(e) => {
                    warn!("translation request failed: {e}");
                    return UsageSummary::default();
                }
            };

        let decoded = decoder::decode(&response);
        if !decoded.glossary.is_empty() {
            debug!(entries = decoded.glossary.len(), "glossary entries decoded, not persisted");
        }

        let src_lines: Vec<String> = chunk.items.iter().map(|i| i.src.clone()).collect();
        let skip_internal_filter: Vec<bool> =
            chunk.items.iter().map(|i| i.skip_internal_filter).collect();
        let retry_counts: Vec<u32> = chunk.items.iter().map(|i| i.retry_count).collect();

        let input = checker::CheckInput {
            src_lines: &src_lines,
            dst_lines: &decoded.dst,
            skip_internal_filter: &skip_internal_filter,
            retry_counts: &retry_counts,
            source_lang: self.source_lang,
            target_lang: self.target_lang,
        };

        let errors = checker::check(
            &input,
            &crate::collab::DefaultRuleFilter,
            &crate::collab::DefaultLanguageFilter,
        );

        self.apply(chunk, &decoded.dst, &errors, input_tokens, output_tokens)
    }

    fn apply(
        &self,
        chunk: &mut ItemChunk,
        dst: &[String],
        errors: &[LineError],
        input_tokens: u32,
        output_tokens: u32,
    ) -> UsageSummary {
        let batch_failed = errors
            .first()
            .is_some_and(|e| matches!(e, LineError::FailData | LineError::FailLineCount));

        if batch_failed {
            self.bump_retry(chunk);
            return UsageSummary::default();
        }

        let mut row_count = 0u32;
        for (i, item) in chunk.items.iter_mut().enumerate() {
            let error = errors.get(i).copied().unwrap_or(LineError::Unknown);
            if error.is_ok() {
                item.dst = dst.get(i).cloned().unwrap_or_default();
                item.status = CacheStatus::Translated;
                row_count += 1;
            } else {
                item.retry_count += 1;
            }
        }

        UsageSummary {
            row_count,
            input_tokens,
            output_tokens,
        }
    }

    fn bump_retry(&self, chunk: &mut ItemChunk) {
        for item in chunk.items.iter_mut() {
            item.retry_count += 1;
        }
    }
}
