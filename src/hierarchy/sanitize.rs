//! Identifier-safe hierarchy names

/// Characters rewritten to `_`
const REPLACED: &[char] = &[' ', '_', '-', ';', '>', '<', '/', ':', '.'];

/// Rewrite a raw grouping or variable name into a bare identifier
///
/// A leading ASCII digit gets a `_` prefix and each of
/// `space _ - ; > < / : .` becomes `_`. Applying it twice changes nothing.
///
/// Distinct raw names can map to the same identifier (`A.B` and `A:B`).
/// Callers that key maps by the sanitized name keep the last one inserted.
pub fn sanitize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 1);
    if raw.starts_with(|c: char| c.is_ascii_digit()) {
        out.push('_');
    }
    out.extend(
        raw.chars()
            .map(|c| if REPLACED.contains(&c) { '_' } else { c }),
    );
    out
}
