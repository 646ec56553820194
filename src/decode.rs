//! SIARD's escape scheme and SQLite literal formatting.
//!
//! SIARD XML content files cannot carry raw control characters or
//! standalone surrogate code points, so non-printable/invalid bytes are
//! escaped as `\u00HH` with `HH` two hex digits. This module detects and
//! decodes that scheme, and formats the resulting bytes (or plain text) as
//! SQLite literals.

use crate::hex;

const ESCAPE_PREFIX: &str = "\\u00";

/// True if `s` contains at least one `\u00` escape marker.
///
/// This is a cheap pre-check so callers can skip the byte-level decode pass
/// entirely for the common case of plain text with no escapes.
pub fn needs_decode(s: &str) -> bool {
    s.contains(ESCAPE_PREFIX)
}

/// Decodes every `\u00HH` escape in `s` into the raw byte `0xHH`; all other
/// characters pass through as their UTF-8 encoding unchanged. The returned
/// bytes may contain `0x00` and are not necessarily valid UTF-8 once
/// decoded, which is why this returns `Vec<u8>` rather than `String`.
///
/// A `\u00` not followed by two hex digits is left as literal text (open
/// question 3 in the design notes; see DESIGN.md for the rationale).
pub fn decode(s: &str) -> Vec<u8> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i..].starts_with(ESCAPE_PREFIX.as_bytes()) {
            let hex_start = i + ESCAPE_PREFIX.len();
            match hex_pair(bytes, hex_start) {
                Some(byte) => {
                    out.push(byte);
                    i = hex_start + 2;
                    continue;
                }
                None => {
                    // Malformed escape: pass the backslash through and
                    // resume scanning right after it.
                    out.push(bytes[i]);
                    i += 1;
                    continue;
                }
            }
        }

        out.push(bytes[i]);
        i += 1;
    }

    out
}

fn hex_pair(bytes: &[u8], at: usize) -> Option<u8> {
    let hi = *bytes.get(at)?;
    let lo = *bytes.get(at + 1)?;
    let hi = (hi as char).to_digit(16)?;
    let lo = (lo as char).to_digit(16)?;
    Some(((hi << 4) | lo) as u8)
}

/// Formats `bytes` as a SQLite hex blob literal: `X'<hex>'`.
pub fn blob_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2 + 3);
    out.push_str("X'");
    hex::encode_into(bytes, &mut out);
    out.push('\'');
    out
}

/// Quotes `s` as a SQLite string literal, doubling every embedded `'`.
pub fn sqlite_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        if ch == '\'' {
            out.push('\'');
        }
        out.push(ch);
    }
    out.push('\'');
    out
}

/// Formats `bytes` as `CAST(X'<hex>' AS TEXT)`, used whenever a TEXT cell
/// must carry bytes that cannot be expressed as a quoted string literal.
pub fn cast_blob_as_text(bytes: &[u8]) -> String {
    format!("CAST({} AS TEXT)", blob_literal(bytes))
}
