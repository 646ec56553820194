//! Run configuration assembled from CLI arguments (spec §6).
//!
//! SIARD carries no configuration file of its own, so "configuration"
//! here is the validated shape of the process arguments rather than a
//! file on disk — the same fail-fast assembly style as the teacher's
//! `Config::load_from_file`, just sourced from `clap::ArgMatches`.

use std::env;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::ConfigError;
use crate::workspace::UnzipMode;

/// What the run should do once the SIARD input is open.
pub enum Mode {
    /// One argument given: open just `header/metadata.xml` and print a
    /// schema summary to stdout.
    Summary,
    /// Two or three arguments given: translate the whole archive.
    Translate {
        output: PathBuf,
        schema_filter: Regex,
    },
}

pub struct RunConfig {
    pub input: PathBuf,
    pub mode: Mode,
    pub unzip_mode: UnzipMode,
    pub verbosity: u8,
    pub tmpdir_root: PathBuf,
}

impl RunConfig {
    pub fn from_args(
        input: Option<&str>,
        output: Option<&str>,
        schema_filter: Option<&str>,
        verbosity: u8,
    ) -> Result<Self, ConfigError> {
        let input = input.ok_or(ConfigError::MissingInput)?;
        let input = PathBuf::from(input);
        if !input.exists() {
            return Err(ConfigError::SiardNotFound(input));
        }

        let mode = match output {
            None => Mode::Summary,
            Some(output) => {
                let pattern = schema_filter.unwrap_or("");
                let schema_filter = Regex::new(&format!("(?i){}", pattern))?;
                Mode::Translate {
                    output: PathBuf::from(output),
                    schema_filter,
                }
            }
        };

        Ok(RunConfig {
            input,
            mode,
            unzip_mode: UnzipMode::FileByFile,
            verbosity,
            tmpdir_root: tmpdir_root(),
        })
    }
}

fn tmpdir_root() -> PathBuf {
    env::var_os("TMPDIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
}

/// The entry used to locate `header/metadata.xml` inside a SIARD input,
/// whether `input` is a directory or a `.siard`/`.zip` file.
pub fn metadata_uri(input: &Path) -> String {
    format!("{}/header/metadata.xml", input.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_is_an_error() {
        assert!(matches!(
            RunConfig::from_args(None, None, None, 0),
            Err(ConfigError::MissingInput)
        ));
    }

    #[test]
    fn empty_filter_matches_everything() {
        let cfg = RunConfig::from_args(Some("."), Some("out.sql"), Some(""), 0).unwrap();
        match cfg.mode {
            Mode::Translate { schema_filter, .. } => {
                assert!(schema_filter.is_match("anything"));
            }
            _ => panic!("expected translate mode"),
        }
    }

    #[test]
    fn invalid_regex_is_rejected() {
        let result = RunConfig::from_args(Some("."), Some("out.sql"), Some("("), 0);
        assert!(matches!(result, Err(ConfigError::InvalidRegex(_))));
    }

    #[test]
    fn one_argument_selects_summary_mode() {
        let cfg = RunConfig::from_args(Some("."), None, None, 0).unwrap();
        assert!(matches!(cfg.mode, Mode::Summary));
    }
}
