//! End-to-end compilation: rules file in, validated index out.

use std::fs;
use std::path::PathBuf;

use rr_core::{Matcher, MatcherError, RedirectIndex};

use crate::builder::{build_index, BuildStats};
use crate::exclusions::build_exclusions;
use crate::options::{ConfigError, RedirectOptions};
use crate::parser::{parse_redirect_csv, CsvError, RejectedRow};

/// Errors that abort a build. No partial index is produced.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Error reading redirects csv file '{}': {source}", .path.display())]
    ReadSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid redirects csv: {0}")]
    Csv(#[from] CsvError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Generated index failed validation: {0}")]
    InvalidIndex(#[from] MatcherError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileStats {
    pub rows_accepted: usize,
    pub rows_rejected: usize,
    pub build: BuildStats,
}

#[derive(Debug, Clone)]
pub struct Compilation {
    pub index: RedirectIndex,
    pub stats: CompileStats,
    pub rejected: Vec<RejectedRow>,
}

/// Compile rules from CSV text.
pub fn compile_redirects(csv: &str, options: &RedirectOptions) -> Result<Compilation, CompileError> {
    options.validate()?;

    let parsed = parse_redirect_csv(csv)?;
    for rejected in &parsed.rejected {
        log::warn!("line {}: skipped redirect row: {}", rejected.line, rejected.error);
    }

    let exclusions = build_exclusions(&options.redirect_exclusions);
    let (index, build, unbuildable) = build_index(&parsed.rules, exclusions, options);

    // Exclusions come from configuration; a bad one is fatal.
    Matcher::new(&index)?;

    let rows_accepted = parsed.rules.len() - unbuildable.len();
    let mut rejected = parsed.rejected;
    rejected.extend(unbuildable);
    rejected.sort_by_key(|row| row.line);

    log::info!("Added {} redirection rules", rows_accepted);
    if !rejected.is_empty() {
        log::warn!("Skipped {} invalid redirect rows", rejected.len());
    }

    Ok(Compilation {
        index,
        stats: CompileStats {
            rows_accepted,
            rows_rejected: rejected.len(),
            build,
        },
        rejected,
    })
}

/// Read `options.csv` and compile it.
pub fn compile_file(options: &RedirectOptions) -> Result<Compilation, CompileError> {
    let csv = fs::read_to_string(&options.csv).map_err(|source| CompileError::ReadSource {
        path: options.csv.clone(),
        source,
    })?;
    compile_redirects(&csv, options)
}
