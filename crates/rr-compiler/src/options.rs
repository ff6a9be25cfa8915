//! Compiler configuration.
//!
//! Options are read from a JSON file with camelCase keys. Every key is
//! optional and falls back to the defaults below.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use rr_core::MatchOptions;

pub const DEFAULT_CSV: &str = "redirects.csv";
pub const DEFAULT_EXCLUSION: &str = r"^\/api\/.*$";
pub const DEFAULT_PARENT_SPLIT_SEQUENCE: &str = "$/$";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed options: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("parentRegexSplitSequence must not be empty")]
    EmptySplitSequence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RedirectOptions {
    /// Rules file
    pub csv: PathBuf,
    /// Keep trailing slashes significant for exact paths
    pub trailing_slash: bool,
    /// Use the first rule of an exact path when no query set matches
    pub always_redirect: bool,
    /// Literal paths or anchored patterns that are never redirected
    pub redirect_exclusions: Vec<String>,
    /// Separator between the patterns of a `parents` cell
    pub parent_regex_split_sequence: String,
}

impl Default for RedirectOptions {
    fn default() -> Self {
        Self {
            csv: PathBuf::from(DEFAULT_CSV),
            trailing_slash: false,
            always_redirect: false,
            redirect_exclusions: vec![DEFAULT_EXCLUSION.to_string()],
            parent_regex_split_sequence: DEFAULT_PARENT_SPLIT_SEQUENCE.to_string(),
        }
    }
}

impl RedirectOptions {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let options: RedirectOptions = serde_json::from_str(text)?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a file. A relative `csv` path is resolved against
    /// the directory holding the options file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut options = Self::from_json(&text)?;

        if options.csv.is_relative() {
            if let Some(dir) = path.parent() {
                options.csv = dir.join(&options.csv);
            }
        }

        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parent_regex_split_sequence.is_empty() {
            return Err(ConfigError::EmptySplitSequence);
        }
        Ok(())
    }

    pub fn match_options(&self) -> MatchOptions {
        MatchOptions {
            trailing_slash: self.trailing_slash,
            always_redirect: self.always_redirect,
        }
    }
}
