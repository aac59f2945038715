// src/sanitize.rs — User input normalization

/// Maximum length of a sanitized chat message, in logical characters
/// (an HTML entity counts as one).
pub const MAX_MESSAGE_CHARS: usize = 1000;

/// Maximum length of a session key after filtering.
pub const MAX_SESSION_KEY_CHARS: usize = 50;

/// Entities emitted by `escape_html`. Recognized on input so that
/// sanitizing already-sanitized text is a no-op.
const ENTITIES: &[&str] = &["&amp;", "&lt;", "&gt;", "&quot;", "&#x27;"];

/// Normalize a user message: trim, collapse whitespace runs to a single
/// space, HTML-escape markup characters, and cap the length.
///
/// The function is a fixed point: `sanitize_message(sanitize_message(s))`
/// equals `sanitize_message(s)` for any input. Emptiness after trimming is
/// for the caller to reject.
pub fn sanitize_message(raw: &str) -> String {
    let collapsed = collapse_whitespace(raw.trim());
    let escaped = escape_html(&collapsed);
    truncate_entities(&escaped, MAX_MESSAGE_CHARS)
}

/// Strict pass for client-supplied session keys: keep only `[A-Za-z0-9_-]`
/// and cap the length. An empty result means the key is invalid.
pub fn sanitize_session_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(MAX_SESSION_KEY_CHARS)
        .collect()
}

fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_run = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !in_run {
                out.push(' ');
                in_run = true;
            }
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

/// Length of the entity starting at byte offset `i`, if any.
fn entity_len_at(s: &str, i: usize) -> Option<usize> {
    ENTITIES
        .iter()
        .find(|e| s[i..].starts_with(*e))
        .map(|e| e.len())
}

/// Escape markup-significant characters, leaving already-emitted
/// entities untouched. Also applied to assistant replies before they are
/// stored or returned, without the whitespace collapsing a user message
/// gets.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < s.len() {
        if let Some(len) = entity_len_at(s, i) {
            out.push_str(&s[i..i + len]);
            i += len;
            continue;
        }
        let c = s[i..].chars().next().unwrap();
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
        i += c.len_utf8();
    }
    out
}

/// Truncate to `max` logical characters, counting an entity as one
/// character so a cut can never split an entity.
fn truncate_entities(s: &str, max: usize) -> String {
    let mut count = 0;
    let mut i = 0;
    while i < s.len() && count < max {
        if let Some(len) = entity_len_at(s, i) {
            i += len;
        } else {
            i += s[i..].chars().next().unwrap().len_utf8();
        }
        count += 1;
    }
    s[..i].to_string()
}
