//! Exposition-format naming rules.
//!
//! Counter names coming off an admin socket contain dots, dashes, `::` and
//! mixed case (`osd.op_r-lat`). [`promethize`] maps them onto `[a-z0-9_]+`;
//! [`quote`] turns a raw label value into an exposition string literal.

/// Normalize `name` into a valid exposition identifier.
///
/// ASCII letters are lowercased, digits kept, and every run of other
/// characters (including `_` itself) collapses into a single `_`.
/// The result always matches `[a-z0-9_]+` and the function is idempotent.
pub fn promethize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    if out.is_empty() {
        out.push('_');
    }
    out
}

/// Quote a label value as an exposition string literal.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}
