//! Crate-wide error types, one per fallible boundary.
//!
//! Each leaf error is a `thiserror`-derived enum, the same shape the
//! teacher hand-rolled (`LoadConfigError`, `ParseError`, `RunScriptError`)
//! but without the repeated `impl fmt::Display` boilerplate.

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("archive not found: {0}")]
    NotFound(String),
    #[error("entry \"{entry}\" not found in archive \"{archive}\"")]
    EntryNotFound { archive: String, entry: String },
    #[error("failed to decompress \"{0}\": {1}")]
    DecompressionFailed(String, #[source] zip::result::ZipError),
    #[error("io error accessing archive: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no SIARD input given")]
    MissingInput,
    #[error("invalid schema filter regex: {0}")]
    InvalidRegex(#[from] regex::Error),
    #[error("SIARD input not found: {0}")]
    SiardNotFound(PathBuf),
}

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("failed to parse metadata.xml: {0}")]
    Xml(#[from] crate::xml::XmlError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error("io error while walking metadata: {0}")]
    Io(#[from] io::Error),
}

/// Per-table content errors are caught and logged at the call site (spec
/// §7: a bad per-table XML is a warning, not a fatal error) — this type
/// exists so that call site can still use `?` internally.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("failed to parse table content xml: {0}")]
    Xml(#[from] crate::xml::XmlError),
    #[error("io error while reading table content: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error("failed to write sql output: {0}")]
    Write(#[source] io::Error),
}
