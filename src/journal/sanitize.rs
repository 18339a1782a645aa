// src/journal/sanitize.rs
// Input normalization for queries, titles and tags.

pub const DEFAULT_TITLE: &str = "Untitled Entry";
pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_TAGS: usize = 20;
pub const MAX_TAG_CHARS: usize = 50;
pub const MAX_CHAT_MESSAGE_CHARS: usize = 2000;

fn cap_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn strip_control(s: &str) -> String {
    s.chars().filter(|c| !c.is_control()).collect()
}

/// Trim, drop control characters and cap to `max_len` chars. `None` when
/// nothing is left.
pub fn normalize_query(raw: &str, max_len: usize) -> Option<String> {
    let cleaned = strip_control(raw);
    let capped = cap_chars(cleaned.trim(), max_len).trim_end();
    if capped.is_empty() {
        None
    } else {
        Some(capped.to_string())
    }
}

pub fn sanitize_title(raw: Option<&str>) -> String {
    let cleaned = raw.map(strip_control).unwrap_or_default();
    let title = cap_chars(cleaned.trim(), MAX_TITLE_CHARS).trim_end();
    if title.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        title.to_string()
    }
}

/// Accepts `["a","b"]` or `a, b`.
pub fn parse_tags(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        if let Ok(tags) = serde_json::from_str::<Vec<String>>(trimmed) {
            return normalize_tags(tags);
        }
    }
    normalize_tags(trimmed.split(',').map(str::to_string).collect())
}

/// Trim, drop empties and duplicates (first occurrence wins), cap count and length.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let cleaned = strip_control(&tag);
        let tag = cap_chars(cleaned.trim(), MAX_TAG_CHARS).trim_end();
        if tag.is_empty() || out.iter().any(|t| t == tag) {
            continue;
        }
        out.push(tag.to_string());
        if out.len() == MAX_TAGS {
            break;
        }
    }
    out
}

pub fn sanitize_chat_message(raw: &str) -> Option<String> {
    let msg = cap_chars(raw.trim(), MAX_CHAT_MESSAGE_CHARS).trim_end();
    if msg.is_empty() {
        None
    } else {
        Some(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  nature  ", 100).as_deref(), Some("nature"));
        assert_eq!(normalize_query("   ", 100), None);
        assert_eq!(normalize_query("", 100), None);
        assert_eq!(normalize_query("abcdef", 3).as_deref(), Some("abc"));
        assert_eq!(normalize_query("ab cd", 3).as_deref(), Some("ab"));
        assert_eq!(normalize_query("na\u{0}ture", 100).as_deref(), Some("nature"));
    }

    #[test]
    fn test_normalize_query_respects_char_boundaries() {
        assert_eq!(normalize_query("héllo", 2).as_deref(), Some("hé"));
        assert_eq!(normalize_query("日本語テキスト", 3).as_deref(), Some("日本語"));
    }

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title(None), DEFAULT_TITLE);
        assert_eq!(sanitize_title(Some("   ")), DEFAULT_TITLE);
        assert_eq!(sanitize_title(Some(" Walk ")), "Walk");
        assert_eq!(sanitize_title(Some(&"x".repeat(300))).chars().count(), MAX_TITLE_CHARS);
    }

    #[test]
    fn test_parse_tags_json_and_csv() {
        assert_eq!(parse_tags(r#"["calm", "work"]"#), vec!["calm", "work"]);
        assert_eq!(parse_tags("calm, work,, calm "), vec!["calm", "work"]);
        assert!(parse_tags("").is_empty());
    }

    #[test]
    fn test_normalize_tags_caps_count() {
        let tags: Vec<String> = (0..30).map(|i| format!("t{}", i)).collect();
        assert_eq!(normalize_tags(tags).len(), MAX_TAGS);
    }
}
