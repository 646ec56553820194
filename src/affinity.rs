//! Mapping SIARD column type strings onto SQLite type affinities.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

/// SQLite's five-way coarse type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affinity {
    Integer,
    Numeric,
    Real,
    Blob,
    Text,
}

impl fmt::Display for Affinity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Affinity::Integer => "INTEGER",
            Affinity::Numeric => "NUMERIC",
            Affinity::Real => "REAL",
            Affinity::Blob => "BLOB",
            Affinity::Text => "TEXT",
        };
        write!(f, "{}", name)
    }
}

static INTEGER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(BIG|SMALL)INT|INTEGER|\bINT\b|BOOL").unwrap());
static NUMERIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"NUMERIC|DECIMAL|DEC\s*\(").unwrap());
static REAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"DOUBLE|FLOAT|REAL").unwrap());
static BLOB_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"BINARY|BLOB|VARBINARY").unwrap());

/// Maps a SIARD column type string (e.g. `INTEGER`, `VARCHAR(32)`) onto the
/// first matching SQLite affinity, in the documented order. The match is
/// case-sensitive on SIARD's canonical uppercase type names.
///
/// Results are cached by exact input string, since the regex scan dominates
/// per-cell cost on wide tables.
pub fn siard_to_affinity(type_string: &str) -> Affinity {
    thread_local! {
        static CACHE: RefCell<HashMap<String, Affinity>> = RefCell::new(HashMap::new());
    }

    CACHE.with(|cache| {
        if let Some(affinity) = cache.borrow().get(type_string) {
            return *affinity;
        }

        let affinity = classify(type_string);
        cache.borrow_mut().insert(type_string.to_string(), affinity);
        affinity
    })
}

fn classify(type_string: &str) -> Affinity {
    if INTEGER_RE.is_match(type_string) {
        Affinity::Integer
    } else if NUMERIC_RE.is_match(type_string) {
        Affinity::Numeric
    } else if REAL_RE.is_match(type_string) {
        Affinity::Real
    } else if BLOB_RE.is_match(type_string) {
        Affinity::Blob
    } else {
        Affinity::Text
    }
}
