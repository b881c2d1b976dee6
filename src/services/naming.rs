//! Class, file and identifier name derivation for generated artifacts.

/// PascalCase from maximal runs of ASCII letters/digits.
///
/// Only the first character of each run is upper-cased; the rest is kept, so
/// the transform is idempotent (`"login page"` → `LoginPage`, `"HTTP api"` →
/// `HTTPApi`). Input with no letters or digits yields an empty string.
pub fn to_class_name(raw: &str) -> String {
    raw.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect()
}

/// Lower-case file stem.
///
/// Drops everything outside `[A-Za-z0-9_\s]` and turns each whitespace run
/// into one `_`. Underscores survive so a stem maps to itself. No length limit
/// and no de-duplication: distinct names may collide.
pub fn to_file_name(raw: &str) -> String {
    let mut stem = String::with_capacity(raw.len());
    let mut in_whitespace = false;

    for c in raw.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                stem.push('_');
                in_whitespace = true;
            }
        } else if c.is_ascii_alphanumeric() || c == '_' {
            stem.push(c.to_ascii_lowercase());
            in_whitespace = false;
        }
    }

    stem
}

/// camelCase accessor name, prefixed with `_` when it would start with a digit.
pub fn to_accessor_name(raw: &str) -> String {
    let class = to_class_name(raw);
    let mut chars = class.chars();
    let accessor = match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    };
    if accessor.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", accessor)
    } else {
        accessor
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}
