//! MTool passes: fold redundant KVJSON sub-lines out of the translation set before
//! a round, then expand multi-line items back into per-line entries afterward.

use std::collections::{HashMap, HashSet};

use crate::cache::{CacheItem, CacheStatus};

/// Marks items whose whole source is redundant with a sub-line of some other
/// multi-line item in the same file: EXCLUDED, never sent to the model.
pub fn preprocess(items: &mut [CacheItem]) {
    let mut sub_lines_by_file: HashMap<String, HashSet<String>> = HashMap::new();

    for item in items.iter() {
        if !item.is_kvjson() || !item.src.contains('\n') {
            continue;
        }
        let entry = sub_lines_by_file.entry(item.file_path.clone()).or_default();
        for line in item.src.lines() {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                entry.insert(trimmed.to_string());
            }
        }
    }

    for item in items.iter_mut() {
        if !item.is_kvjson() {
            continue;
        }
        let trimmed = item.src.trim();
        if trimmed.is_empty() {
            continue;
        }
        if sub_lines_by_file
            .get(&item.file_path)
            .is_some_and(|sub_lines| sub_lines.contains(trimmed))
        {
            item.status = CacheStatus::Excluded;
        }
    }
}

/// Expands every translated multi-line KVJSON item into one synthesized item per
/// source/destination line pair, zip-longest aligned (shorter side padded with
/// empty strings). `row` is set to the size of the item's file-path group (the
/// count of KVJSON items sharing that `file_path`), not the line count of the
/// item being expanded. Downstream writers expect one entry per line, not one
/// concatenated blob per key.
pub fn postprocess(items: &[CacheItem]) -> Vec<CacheItem> {
    let mut groups: HashMap<&str, Vec<&CacheItem>> = HashMap::new();
    for item in items {
        if item.is_kvjson() {
            groups.entry(item.file_path.as_str()).or_default().push(item);
        }
    }

    let mut expanded = Vec::new();
    for group in groups.values() {
        let group_size = group.len() as u32;
        for item in group {
            if item.status != CacheStatus::Translated || !item.src.contains('\n') {
                continue;
            }

            let src_lines: Vec<&str> = item.src.lines().collect();
            let dst_lines: Vec<&str> = item.dst.lines().collect();
            let row_count = src_lines.len().max(dst_lines.len());

            for i in 0..row_count {
                let mut synthesized = CacheItem::new(
                    src_lines.get(i).copied().unwrap_or("").to_string(),
                    item.file_path.clone(),
                );
                synthesized.dst = dst_lines.get(i).copied().unwrap_or("").to_string();
                synthesized.status = CacheStatus::Translated;
                synthesized.file_type = item.file_type.clone();
                synthesized.token_count = item.token_count;
                synthesized.row = group_size;
                synthesized.vars = item.vars.clone();
                expanded.push(synthesized);
            }
        }
    }

    expanded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FILE_TYPE_KVJSON;

    fn kvjson_item(src: &str, file_path: &str) -> CacheItem {
        let mut item = CacheItem::new(src, file_path);
        item.file_type = FILE_TYPE_KVJSON.to_string();
        item
    }

    #[test]
    fn preprocess_excludes_redundant_sub_lines() {
        let mut items = vec![
            kvjson_item("line one\nline two", "a.json"),
            kvjson_item("line one", "a.json"),
            kvjson_item("unrelated", "a.json"),
        ];
        preprocess(&mut items);
        assert_eq!(items[0].status, CacheStatus::Untranslated);
        assert_eq!(items[1].status, CacheStatus::Excluded);
        assert_eq!(items[2].status, CacheStatus::Untranslated);
    }

    #[test]
    fn preprocess_ignores_non_kvjson_items() {
        let mut items = vec![CacheItem::new("line one\nline two", "a.txt")];
        preprocess(&mut items);
        assert_eq!(items[0].status, CacheStatus::Untranslated);
    }

    #[test]
    fn postprocess_expands_multiline_items_zip_longest() {
        let mut item = kvjson_item("a\nb\nc", "a.json");
        item.dst = "x\ny".to_string();
        item.status = CacheStatus::Translated;

        let expanded = postprocess(&[item]);
        assert_eq!(expanded.len(), 3);
        assert_eq!(expanded[0].src, "a");
        assert_eq!(expanded[0].dst, "x");
        assert_eq!(expanded[1].src, "b");
        assert_eq!(expanded[1].dst, "y");
        assert_eq!(expanded[2].src, "c");
        assert_eq!(expanded[2].dst, "");
        // Single item in its file-path group: row equals the group size, not the line count.
        assert!(expanded.iter().all(|i| i.row == 1));
    }

    #[test]
    fn postprocess_row_is_file_group_size_not_line_count() {
        let mut one = kvjson_item("a\nb", "a.json");
        one.dst = "x\ny".to_string();
        one.status = CacheStatus::Translated;

        let mut two = kvjson_item("single line", "a.json");
        two.dst = "translated".to_string();
        two.status = CacheStatus::Translated;

        let expanded = postprocess(&[one, two]);
        assert_eq!(expanded.len(), 2);
        assert!(expanded.iter().all(|i| i.row == 2));
    }

    #[test]
    fn postprocess_skips_untranslated_items() {
        let item = kvjson_item("a\nb", "a.json");
        let expanded = postprocess(&[item]);
        assert!(expanded.is_empty());
    }
}
