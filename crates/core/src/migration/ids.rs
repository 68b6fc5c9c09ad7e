//! Structural identifier-format checks.
//!
//! Legacy ids are UUID-shaped: 36 characters, hyphens at offsets 8/13/18/23,
//! hexadecimal everywhere else. Canonical ids are a two-letter uppercase
//! prefix followed by a zero-padded numeric suffix (`CL001`). Anything
//! matching neither shape is left alone by migration.

/// Minimum digit width of a canonical identifier's numeric suffix.
pub const CANONICAL_MIN_DIGITS: usize = 3;

/// True when `id` has the legacy UUID shape.
pub fn is_legacy_id(id: &str) -> bool {
    let bytes = id.as_bytes();
    if bytes.len() != 36 {
        return false;
    }
    for (idx, byte) in bytes.iter().enumerate() {
        match idx {
            8 | 13 | 18 | 23 => {
                if *byte != b'-' {
                    return false;
                }
            }
            _ => {
                if !byte.is_ascii_hexdigit() {
                    return false;
                }
            }
        }
    }
    true
}

/// True when `id` has the canonical prefix+counter shape.
pub fn is_canonical_id(id: &str) -> bool {
    let bytes = id.as_bytes();
    if bytes.len() < 2 + CANONICAL_MIN_DIGITS {
        return false;
    }
    bytes[..2].iter().all(u8::is_ascii_uppercase)
        && bytes[2..].iter().all(u8::is_ascii_digit)
}

/// Render the canonical identifier for `counter` under `prefix`.
pub fn format_canonical_id(prefix: &str, counter: u64) -> String {
    format!("{}{:0width$}", prefix, counter, width = CANONICAL_MIN_DIGITS)
}
