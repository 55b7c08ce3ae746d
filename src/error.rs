//! Error taxonomy: per-line validation outcomes plus session-start failures.

use thiserror::Error;

/// Per-line validation outcome produced by the response checker. These are data,
/// not propagating errors: a task folds them into item status, it never returns
/// one as a Rust `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::enum_variant_names)]
pub enum LineError {
    #[default]
    None,
    Unknown,
    FailData,
    FailLineCount,
    LineErrorKana,
    LineErrorHangeul,
    /// Reserved, unused: the upstream checker declares this code but never emits it.
    #[allow(dead_code)]
    LineErrorFakeReply,
    LineErrorEmptyLine,
    LineErrorSimilarity,
    LineErrorDegradation,
}

impl LineError {
    pub fn is_ok(self) -> bool {
        self == LineError::None
    }
}

/// Failures that abort a translation session at start-up. Everything past this
/// point (HTTP, decode, per-line validation) is caught and folded into item state
/// instead of propagating.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("failed to read source files from {path}: {source}")]
    ReadFromPath {
        path: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to load cache from {path}: {source}")]
    CacheLoad {
        path: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_the_default() {
        assert_eq!(LineError::default(), LineError::None);
        assert!(LineError::None.is_ok());
        assert!(!LineError::FailData.is_ok());
    }
}
