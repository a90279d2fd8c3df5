//! Field name matching for `perField` questions.
//!
//! Repeated unit fields are stored with a numeric suffix (`comment.1`,
//! `comment.2`). A `perField` list may name either the exact field or the
//! repeated base name.

/// Strip a trailing `.<digits>` suffix: `comment.2` -> `comment`.
///
/// Names without such a suffix are returned unchanged (`comment.`, `v1.x`).
pub fn base_field_name(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((base, suffix)) if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) => base,
        _ => name,
    }
}

/// True when `field` is selected by a `perField` list.
pub fn field_selected(per_field: &[String], field: &str) -> bool {
    let base = base_field_name(field);
    per_field.iter().any(|f| f == field || f == base)
}
