//! Locate the JSON payload inside a raw model response.
//!
//! Models are asked for bare JSON but often wrap it in a ```` ```json ````
//! fence or surround it with a sentence of prose. Three attempts, in order:
//!
//! 1. **Direct**: the whole (trimmed) response parses.
//! 2. **Fenced**: the body of the first fenced code block that parses,
//!    wherever the fence sits in the text.
//! 3. **Embedded**: the first balanced span that parses to an array of
//!    objects or arrays; failing that, the first balanced `[...]` / `{...}`
//!    span that parses at all.
//!
//! If all three fail the direct-parse error is returned, since it describes
//! the response as a whole.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Which attempt located the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSource {
    Direct,
    Fenced,
    Embedded,
}

/// A parsed JSON payload and where it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    pub value: Value,
    pub source: PayloadSource,
}

static RE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n?(.*?)```").unwrap()
});

/// Parse the JSON payload of `text`.
pub fn parse_payload(text: &str) -> Result<Payload, serde_json::Error> {
    let trimmed = text.trim_start_matches('\u{FEFF}').trim();

    let direct_err = match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => {
            return Ok(Payload {
                value,
                source: PayloadSource::Direct,
            })
        }
        Err(e) => e,
    };

    if let Some(value) = fenced_json(trimmed) {
        return Ok(Payload {
            value,
            source: PayloadSource::Fenced,
        });
    }

    if let Some(value) = embedded_json(trimmed) {
        return Ok(Payload {
            value,
            source: PayloadSource::Embedded,
        });
    }

    Err(direct_err)
}

/// Body of the first fenced block that parses as JSON.
fn fenced_json(text: &str) -> Option<Value> {
    RE_FENCE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .find_map(|body| serde_json::from_str(body.as_str().trim()).ok())
}

/// First balanced span holding an array of rows, else the first balanced
/// array/object span that parses at all.
fn embedded_json(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let mut fallback = None;
    let mut start = 0;

    while start < bytes.len() {
        if bytes[start] != b'[' && bytes[start] != b'{' {
            start += 1;
            continue;
        }
        let Some(end) = balanced_end(bytes, start) else {
            start += 1;
            continue;
        };
        // Bracket bytes are ASCII, so both ends sit on char boundaries.
        match serde_json::from_str::<Value>(&text[start..end]) {
            Ok(value) if holds_rows(&value) => return Some(value),
            Ok(value) => {
                fallback.get_or_insert(value);
                start = end;
            }
            Err(_) => start += 1,
        }
    }
    fallback
}

/// An array with at least one object or array element.
fn holds_rows(value: &Value) -> bool {
    value
        .as_array()
        .is_some_and(|items| items.iter().any(|v| v.is_object() || v.is_array()))
}

/// Index one past the bracket closing the one at `start`, skipping string literals.
fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' | b'{' => depth += 1,
            b']' | b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_json_parses_directly() {
        let p = parse_payload(r#"[{"a":1,"b":2}]"#).unwrap();
        assert_eq!(p.source, PayloadSource::Direct);
        assert_eq!(p.value, json!([{"a": 1, "b": 2}]));
    }

    #[test]
    fn boundary_fence_is_stripped() {
        let text = ["```json", r#"[{"a":1,"b":2}]"#, "```"].join("\n");
        let p = parse_payload(&text).unwrap();
        assert_eq!(p.source, PayloadSource::Fenced);
        assert_eq!(p.value, json!([{"a": 1, "b": 2}]));
    }

    #[test]
    fn fence_without_newlines() {
        let text = ["```json", r#"[{"a":1,"b":2}]"#, "```"].concat();
        let p = parse_payload(&text).unwrap();
        assert_eq!(p.value, json!([{"a": 1, "b": 2}]));
    }

    #[test]
    fn fence_surrounded_by_prose() {
        let text = "Here is the table you asked for:\n\n```json\n[{\"x\": \"y\"}]\n```\n\nLet me know!";
        let p = parse_payload(text).unwrap();
        assert_eq!(p.source, PayloadSource::Fenced);
        assert_eq!(p.value, json!([{"x": "y"}]));
    }

    #[test]
    fn first_parsable_fence_wins() {
        let text = "```\nnot json\n```\n```json\n{\"k\": [1]}\n```";
        let p = parse_payload(text).unwrap();
        assert_eq!(p.value, json!({"k": [1]}));
    }

    #[test]
    fn embedded_json_without_fence() {
        let text = "The extracted rows are [{\"name\": \"a [b]\", \"v\": 1}] as requested.";
        let p = parse_payload(text).unwrap();
        assert_eq!(p.source, PayloadSource::Embedded);
        assert_eq!(p.value, json!([{"name": "a [b]", "v": 1}]));
    }

    #[test]
    fn embedded_skips_unbalanced_prefix() {
        let text = "Note [see below: {\"a\": 1}";
        let p = parse_payload(text).unwrap();
        assert_eq!(p.value, json!({"a": 1}));
    }

    #[test]
    fn embedded_prefers_rows_over_earlier_scalar_list() {
        let text = "Values [1] then [{\"a\":1}]";
        let p = parse_payload(text).unwrap();
        assert_eq!(p.source, PayloadSource::Embedded);
        assert_eq!(p.value, json!([{"a": 1}]));
    }

    #[test]
    fn embedded_falls_back_to_first_parsable_span() {
        let text = "Totals {\"sum\": 3} and [4, 5]";
        let p = parse_payload(text).unwrap();
        assert_eq!(p.value, json!({"sum": 3}));
    }

    #[test]
    fn plain_text_is_unparseable() {
        assert!(parse_payload("Not a table").is_err());
        assert!(parse_payload("").is_err());
    }

    #[test]
    fn quoted_string_is_valid_json() {
        let p = parse_payload("\"Not a table\"").unwrap();
        assert_eq!(p.value, json!("Not a table"));
    }

    #[test]
    fn balanced_end_handles_escaped_quotes() {
        let s = br#"["a\"]", 1] tail"#;
        assert_eq!(balanced_end(s, 0), Some(11));
    }
}
