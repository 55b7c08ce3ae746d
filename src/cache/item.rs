use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tag identifying a key-value JSON source file whose multi-line values are
/// split before translation and recombined after (see `translator::optimizer`).
pub const FILE_TYPE_KVJSON: &str = "kvjson";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheStatus {
    #[default]
    Untranslated,
    Translating,
    Translated,
    Excluded,
}

/// One translatable unit. `vars` carries any additional fields the source file
/// format attached, preserved verbatim across a save/load round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheItem {
    pub src: String,
    #[serde(default)]
    pub dst: String,
    #[serde(default)]
    pub status: CacheStatus,
    pub file_path: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub token_count: u32,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub skip_internal_filter: bool,
    #[serde(default)]
    pub row: u32,
    #[serde(flatten, default)]
    pub vars: Map<String, Value>,
}

impl CacheItem {
    pub fn new(src: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            dst: String::new(),
            status: CacheStatus::Untranslated,
            file_path: file_path.into(),
            file_type: String::new(),
            token_count: 0,
            retry_count: 0,
            skip_internal_filter: false,
            row: 0,
            vars: Map::new(),
        }
    }

    pub fn is_kvjson(&self) -> bool {
        self.file_type == FILE_TYPE_KVJSON
    }

    /// Count of source lines whose stripped content is non-empty.
    pub fn non_empty_line_count(&self) -> usize {
        self.src.lines().filter(|l| !l.trim().is_empty()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_item_starts_untranslated() {
        let item = CacheItem::new("hello", "a.txt");
        assert_eq!(item.status, CacheStatus::Untranslated);
        assert!(item.dst.is_empty());
    }

    #[test]
    fn non_empty_line_count_skips_blank_lines() {
        let item = CacheItem::new("a\n\nb\n  \nc", "a.txt");
        assert_eq!(item.non_empty_line_count(), 3);
    }

    #[test]
    fn vars_round_trip_through_serde() {
        let mut item = CacheItem::new("hi", "a.txt");
        item.vars
            .insert("speaker".into(), Value::String("narrator".into()));
        let json = serde_json::to_string(&item).unwrap();
        let back: CacheItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back.vars.get("speaker").unwrap(), "narrator");
    }
}
