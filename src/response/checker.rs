//! Per-line validation: judges destination lines against their source and yields
//! one `LineError` per line. A pure function of its inputs (checker determinism).

use super::similarity::{has_hangeul, has_hiragana_or_katakana, jaccard_similarity};
use crate::collab::{LanguageFilter, RuleFilter, TEXT_PRESERVER_PLACEHOLDER};
use crate::error::LineError;

pub const RETRY_COUNT_THRESHOLD: u32 = 2;

const DEGRADATION_REPEAT_THRESHOLD: usize = 17;

/// Pathological repetition: a 1-2 char group repeated 17+ times in a row. The
/// `regex` crate has no backreference support, so this is a direct scan rather
/// than a port of `(.{1,2})\1{16,}`.
fn has_degradation(s: &str) -> bool {
    let chars: Vec<char> = s.chars().collect();
    for group_len in 1..=2 {
        if chars.len() < group_len {
            continue;
        }
        let mut i = 0;
        while i + group_len <= chars.len() {
            let group = &chars[i..i + group_len];
            let mut repeats = 1;
            let mut j = i + group_len;
            while j + group_len <= chars.len() && chars[j..j + group_len] == *group {
                repeats += 1;
                j += group_len;
            }
            if repeats >= DEGRADATION_REPEAT_THRESHOLD {
                return true;
            }
            i += 1;
        }
    }
    false
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Ja,
    Ko,
    Zh,
    Other,
}

pub struct CheckInput<'a> {
    pub src_lines: &'a [String],
    pub dst_lines: &'a [String],
    pub skip_internal_filter: &'a [bool],
    pub retry_counts: &'a [u32],
    pub source_lang: Language,
    pub target_lang: Language,
}

pub fn check(
    input: &CheckInput,
    rule_filter: &dyn RuleFilter,
    language_filter: &dyn LanguageFilter,
) -> Vec<LineError> {
    let n = input.src_lines.len();

    if input.dst_lines.is_empty() || input.dst_lines.iter().all(|d| d.trim().is_empty()) {
        return vec![LineError::FailData; n];
    }

    if n == 1 && input.retry_counts.first().copied().unwrap_or(0) >= RETRY_COUNT_THRESHOLD {
        return vec![LineError::None; n];
    }

    if n != input.dst_lines.len() {
        return vec![LineError::FailLineCount; n];
    }

    (0..n)
        .map(|i| {
            check_line(
                &input.src_lines[i],
                &input.dst_lines[i],
                input.skip_internal_filter.get(i).copied().unwrap_or(false),
                input.source_lang,
                input.target_lang,
                rule_filter,
                language_filter,
            )
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn check_line(
    src: &str,
    dst: &str,
    skip_internal_filter: bool,
    source_lang: Language,
    target_lang: Language,
    rule_filter: &dyn RuleFilter,
    language_filter: &dyn LanguageFilter,
) -> LineError {
    if dst.trim().is_empty() && !src.trim().is_empty() {
        return LineError::LineErrorEmptyLine;
    }

    if src.contains(TEXT_PRESERVER_PLACEHOLDER) {
        return LineError::None;
    }

    if rule_filter.filter(src, skip_internal_filter) {
        return LineError::None;
    }

    if language_filter.filter(src, source_lang) {
        return LineError::None;
    }

    if !has_degradation(src) && has_degradation(dst) {
        return LineError::LineErrorDegradation;
    }

    if source_lang == Language::Ja && has_hiragana_or_katakana(dst) {
        return LineError::LineErrorKana;
    }

    if source_lang == Language::Ko && has_hangeul(dst) {
        return LineError::LineErrorHangeul;
    }

    let too_similar =
        src.contains(dst) || dst.contains(src) || jaccard_similarity(src, dst) > 0.80;

    if too_similar {
        let suppressed = match (source_lang, target_lang) {
            (Language::Ja, Language::Zh) => !has_hiragana_or_katakana(dst),
            (Language::Ko, Language::Zh) => !has_hangeul(dst),
            _ => false,
        };
        if !suppressed {
            return LineError::LineErrorSimilarity;
        }
    }

    LineError::None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::{DefaultLanguageFilter, DefaultRuleFilter};

    fn check_simple(src: &str, dst: &str, source_lang: Language, target_lang: Language) -> LineError {
        let input = CheckInput {
            src_lines: &[src.to_string()],
            dst_lines: &[dst.to_string()],
            skip_internal_filter: &[false],
            retry_counts: &[0],
            source_lang,
            target_lang,
        };
        check(&input, &DefaultRuleFilter, &DefaultLanguageFilter)[0]
    }

    #[test]
    fn degradation_detection() {
        let dst = "ha".repeat(17);
        assert_eq!(
            check_simple("Hello there", &dst, Language::Other, Language::Other),
            LineError::LineErrorDegradation
        );
    }

    #[test]
    fn kana_residue() {
        assert_eq!(
            check_simple("こんにちは", "こんにちは world", Language::Ja, Language::Other),
            LineError::LineErrorKana
        );
    }

    #[test]
    fn similarity_gate_suppressed_for_ja_to_zh_without_kana() {
        assert_eq!(
            check_simple("こんにちは", "你好", Language::Ja, Language::Zh),
            LineError::None
        );
    }

    #[test]
    fn similarity_gate_fires_outside_ja_zh() {
        assert_eq!(
            check_simple("hello world", "hello world", Language::Other, Language::Other),
            LineError::LineErrorSimilarity
        );
    }

    #[test]
    fn line_count_mismatch_fails_every_line() {
        let input = CheckInput {
            src_lines: &["a".into(), "b".into(), "c".into()],
            dst_lines: &["x".into(), "y".into()],
            skip_internal_filter: &[false, false, false],
            retry_counts: &[0, 0, 0],
            source_lang: Language::Other,
            target_lang: Language::Other,
        };
        let result = check(&input, &DefaultRuleFilter, &DefaultLanguageFilter);
        assert_eq!(result, vec![LineError::FailLineCount; 3]);
    }

    #[test]
    fn empty_dst_dict_fails_every_line() {
        let input = CheckInput {
            src_lines: &["a".into(), "b".into()],
            dst_lines: &[],
            skip_internal_filter: &[false, false],
            retry_counts: &[0, 0],
            source_lang: Language::Other,
            target_lang: Language::Other,
        };
        let result = check(&input, &DefaultRuleFilter, &DefaultLanguageFilter);
        assert_eq!(result, vec![LineError::FailData; 2]);
    }

    #[test]
    fn single_item_second_retry_bypasses_validation() {
        let input = CheckInput {
            src_lines: &["garbled source".into()],
            dst_lines: &["garbled output".into()],
            skip_internal_filter: &[false],
            retry_counts: &[2],
            source_lang: Language::Ja,
            target_lang: Language::Other,
        };
        let result = check(&input, &DefaultRuleFilter, &DefaultLanguageFilter);
        assert_eq!(result, vec![LineError::None]);
    }

    #[test]
    fn checker_is_deterministic() {
        let a = check_simple("hello", "hola", Language::Other, Language::Other);
        let b = check_simple("hello", "hola", Language::Other, Language::Other);
        assert_eq!(a, b);
    }
}
