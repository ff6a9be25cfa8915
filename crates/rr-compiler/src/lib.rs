//! Redirect Rule Compiler
//!
//! This crate compiles a CSV list of redirect rules into a
//! [`rr_core::RedirectIndex`].

pub mod parser;
pub mod options;
pub mod exclusions;
pub mod builder;
pub mod compile;

pub use builder::{build_index, BuildStats, IndexBuilder};
pub use compile::{compile_file, compile_redirects, CompileError, CompileStats, Compilation};
pub use exclusions::build_exclusions;
pub use options::{ConfigError, RedirectOptions};
pub use parser::{parse_redirect_csv, CsvError, ParsedRules, RedirectRule, RejectedRow, RowError};
