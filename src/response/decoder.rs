//! Lenient parsing of raw LLM response text into ordered translations plus
//! optional glossary entries. Never raises: malformed input just yields fewer
//! entries.

use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlossaryEntry {
    pub src: String,
    pub dst: String,
    pub info: String,
}

#[derive(Debug, Clone, Default)]
pub struct DecodedResponse {
    /// Translations in discovery order; index `n` is the original `"n"` key.
    pub dst: Vec<String>,
    pub glossary: Vec<GlossaryEntry>,
}

pub fn decode(response: &str) -> DecodedResponse {
    let mut dst = Vec::new();
    let mut glossary = Vec::new();

    for line in response.lines() {
        let Some(Value::Object(map)) = repair_and_parse_object(line) else {
            continue;
        };

        if map.len() == 1 {
            if let Some(Value::String(v)) = map.values().next() {
                dst.push(v.clone());
            }
            continue;
        }

        if map.len() == 3 && ["src", "dst", "gender"].iter().any(|k| map.contains_key(*k)) {
            glossary.push(GlossaryEntry {
                src: string_field(&map, "src"),
                dst: string_field(&map, "dst"),
                info: string_field(&map, "gender"),
            });
        }
    }

    if dst.is_empty()
        && let Some(Value::Object(map)) = repair_and_parse_object(response)
    {
        for value in map.values() {
            if let Value::String(s) = value {
                dst.push(s.clone());
            }
        }
    }

    DecodedResponse { dst, glossary }
}

fn string_field(map: &serde_json::Map<String, Value>, key: &str) -> String {
    match map.get(key) {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

/// Attempts to parse `s` as a single JSON object, tolerating markdown fences,
/// surrounding prose, and a trailing comma before the closing brace.
fn repair_and_parse_object(s: &str) -> Option<Value> {
    let candidate = extract_object(s)?;

    if let Ok(value) = serde_json::from_str::<Value>(&candidate) {
        return Some(value);
    }

    let repaired = strip_trailing_commas(&candidate);
    serde_json::from_str::<Value>(&repaired).ok()
}

fn extract_object(s: &str) -> Option<String> {
    let stripped = strip_code_fences(s.trim());
    let start = stripped.find('{')?;
    let end = find_matching_brace(&stripped[start..])?;
    Some(stripped[start..=start + end].to_string())
}

fn strip_code_fences(s: &str) -> &str {
    let s = s.trim();
    if let Some(rest) = s.strip_prefix("```")
        && let Some(first_newline) = rest.find('\n')
    {
        let inner = &rest[first_newline + 1..];
        if let Some(closing) = inner.rfind("```") {
            return inner[..closing].trim();
        }
    }
    s
}

fn find_matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        if c == '\\' && in_string {
            escape_next = true;
            continue;
        }
        if c == '"' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn strip_trailing_commas(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ',' {
            let mut lookahead = chars.clone();
            while let Some(&n) = lookahead.peek() {
                if n.is_whitespace() {
                    lookahead.next();
                } else {
                    break;
                }
            }
            if matches!(lookahead.peek(), Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}
