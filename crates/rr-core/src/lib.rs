//! Redirect Rules Core Library
//!
//! This crate holds the compiled redirect index and the request-time matcher
//! that queries it.
//!
//! # Architecture
//!
//! Rules are compiled once (see `rr-compiler`) into an immutable
//! [`RedirectIndex`]: an exact-path map keyed by normalized path and a forest
//! of parent-gated pattern nodes. The [`Matcher`] compiles every pattern of an
//! index up front and then answers lookups without mutating anything, so one
//! matcher can be shared freely across threads.
//!
//! # Modules
//!
//! - `classify`: exact vs pattern detection for rule sources
//! - `path`: path/query splitting and trailing-slash normalization
//! - `types`: shared request and result types
//! - `index`: the redirect index and pattern forest
//! - `matcher`: request matching
//! - `snapshot`: versioned JSON artifact for a built index

pub mod classify;
pub mod path;
pub mod types;
pub mod index;
pub mod matcher;
pub mod snapshot;

// Re-export commonly used types
pub use classify::{classify, is_pattern, RuleKind};
pub use index::{ExactEntry, Exclusions, MatchOptions, NodeId, PatternForest, PatternNode, PatternRedirect, RedirectIndex};
pub use matcher::{Matcher, MatcherError};
pub use snapshot::{Snapshot, SnapshotError};
pub use types::{ExclusionReason, MatchResult, Redirect, RequestContext};
