//! Escaping for the two literal contexts the compiler writes into.
//!
//! Formula and resolver arguments are double-quoted template string
//! literals. Literal user text placed in HTML goes through [`escape_html`].
//! The two are never mixed: string-literal escaping does not HTML-escape.

/// Escape a value for a double-quoted template string literal.
///
/// Backslash is escaped before the quote so the backslashes introduced for
/// quotes are not escaped a second time.
pub fn escape_string_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Escape and wrap a value in double quotes.
pub fn quote(value: &str) -> String {
    format!("\"{}\"", escape_string_literal(value))
}

/// Reverse [`escape_string_literal`].
pub fn unescape_string_literal(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Escape literal text for HTML content.
///
/// Braces become character references so literal `{{`, `{%` or `{#` can
/// never open a template construct.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '{' => out.push_str("&#123;"),
            '}' => out.push_str("&#125;"),
            other => out.push(other),
        }
    }
    out
}

/// Bare integer list, e.g. `[1, 2, 3]`.
pub fn int_list(ids: &[i64]) -> String {
    let items: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
    format!("[{}]", items.join(", "))
}

/// Quoted string list, e.g. `["a", "b"]`.
pub fn string_list(values: &[String]) -> String {
    let items: Vec<String> = values.iter().map(|v| quote(v)).collect();
    format!("[{}]", items.join(", "))
}
