//! Leniency layer applied to a delimited payload before it is parsed as JSON.
//!
//! Generative producers do not reliably emit strict JSON: they wrap payloads in
//! Markdown code fences and put literal line breaks inside string values.
//! Each repair is a separate function so new heuristics can be added here
//! without touching delimiter search.

use std::borrow::Cow;

const FENCE: &str = "```";
const JSON_TAG: &str = "json";

/// Apply every repair, in order: fence stripping, then control-character
/// escaping.
pub fn normalize(payload: &str) -> Cow<'_, str> {
    escape_control_chars(strip_code_fence(payload))
}

/// Remove a leading code fence (optionally tagged `json`, any case) and a
/// trailing code fence. The result is trimmed.
pub fn strip_code_fence(payload: &str) -> &str {
    let mut body = payload.trim();

    if body.starts_with(FENCE) {
        body = body.trim_start_matches('`');
        if let Some(tag) = body.get(..JSON_TAG.len()) {
            let at_boundary = body[JSON_TAG.len()..]
                .chars()
                .next()
                .is_none_or(|c| !c.is_alphanumeric());
            if tag.eq_ignore_ascii_case(JSON_TAG) && at_boundary {
                body = &body[JSON_TAG.len()..];
            }
        }
    }

    if body.ends_with(FENCE) {
        body = body.trim_end_matches('`');
    }

    body.trim()
}

/// Escape raw line feeds, carriage returns and tabs that occur inside JSON
/// string literals. Whitespace between tokens is valid JSON and is left
/// alone. Returns the input unchanged (borrowed) when nothing needs escaping.
pub fn escape_control_chars(payload: &str) -> Cow<'_, str> {
    let mut repaired: Option<String> = None;
    let mut in_string = false;
    let mut escaped = false;

    for (index, c) in payload.char_indices() {
        let escape = if !in_string {
            in_string = c == '"';
            None
        } else {
            // A raw control character is escaped even right after a
            // backslash; the backslash then reads as a literal one.
            let control = match c {
                '\n' => Some("\\n"),
                '\r' => Some("\\r"),
                '\t' => Some("\\t"),
                _ => None,
            };
            if control.is_some() || escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            control
        };

        match escape {
            Some(escape) => repaired
                .get_or_insert_with(|| {
                    let mut buf = String::with_capacity(payload.len() + 16);
                    buf.push_str(&payload[..index]);
                    buf
                })
                .push_str(escape),
            None => {
                if let Some(buf) = repaired.as_mut() {
                    buf.push(c);
                }
            }
        }
    }

    match repaired {
        Some(buf) => Cow::Owned(buf),
        None => Cow::Borrowed(payload),
    }
}
