//! Request Matching Engine
//!
//! Every request goes through here. All patterns are compiled when the
//! matcher is created; matching itself only reads.
//!
//! Order of evaluation:
//! 1. exclusions (literal set, then patterns in order)
//! 2. exact index (normalized path, query term set)
//! 3. pattern forest, depth first, children gated by their parent

use std::collections::{HashMap, HashSet};

use regex::Regex;

use crate::classify::RuleKind;
use crate::index::{NodeId, PatternRedirect, RedirectIndex};
use crate::path::{normalize_path, query_terms, same_terms};
use crate::types::{ExclusionReason, MatchResult, Redirect, RequestContext};

/// Error type for matcher construction.
#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Invalid pattern forest: {0}")]
    InvalidForest(String),
}

// =============================================================================
// Matcher
// =============================================================================

struct CompiledNode {
    gate: Regex,
    redirects: Vec<Regex>,
}

/// The request-time matcher over a built [`RedirectIndex`].
pub struct Matcher<'a> {
    index: &'a RedirectIndex,
    exclusion_patterns: Vec<Regex>,
    /// Parallel to `index.forest.nodes()`
    nodes: Vec<CompiledNode>,
}

impl<'a> Matcher<'a> {
    /// Create a matcher, compiling every pattern in the index.
    pub fn new(index: &'a RedirectIndex) -> Result<Self, MatcherError> {
        index
            .forest
            .check_structure()
            .map_err(MatcherError::InvalidForest)?;

        let mut cache = PatternCache::default();

        let exclusion_patterns = index
            .exclusions
            .patterns
            .iter()
            .map(|pattern| cache.compile(pattern))
            .collect::<Result<Vec<_>, _>>()?;

        let mut nodes = Vec::with_capacity(index.forest.len());
        for node in index.forest.nodes() {
            let gate = cache.compile(&node.regex)?;
            let redirects = node
                .redirects
                .iter()
                .map(|redirect| cache.compile(&redirect.from))
                .collect::<Result<Vec<_>, _>>()?;
            nodes.push(CompiledNode { gate, redirects });
        }

        log::debug!(
            "matcher ready: {} exact paths, {} pattern nodes, {} distinct patterns",
            index.exact.len(),
            nodes.len(),
            cache.len()
        );

        Ok(Self {
            index,
            exclusion_patterns,
            nodes,
        })
    }

    pub fn index(&self) -> &'a RedirectIndex {
        self.index
    }

    /// Match a request and return the decision.
    pub fn match_request(&self, ctx: &RequestContext<'_>) -> MatchResult<'a> {
        if let Some(reason) = self.match_exclusions(ctx.path) {
            return MatchResult::Excluded(reason);
        }

        if let Some(redirect) = self.match_exact(ctx) {
            return MatchResult::Redirect(redirect);
        }

        if let Some(rule) = self.match_node(NodeId::ROOT, ctx.path) {
            return MatchResult::Redirect(Redirect {
                code: rule.code,
                to: &rule.to,
                kind: RuleKind::Pattern,
            });
        }

        MatchResult::PassThrough
    }

    /// Shorthand for callers that only care about the redirect itself.
    pub fn find_redirect(&self, ctx: &RequestContext<'_>) -> Option<Redirect<'a>> {
        match self.match_request(ctx) {
            MatchResult::Redirect(redirect) => Some(redirect),
            _ => None,
        }
    }

    fn match_exclusions(&self, path: &str) -> Option<ExclusionReason<'a>> {
        let index = self.index;
        let exclusions = &index.exclusions;
        if exclusions.punctual.contains(path) {
            return Some(ExclusionReason::Punctual);
        }
        exclusions
            .patterns
            .iter()
            .zip(&self.exclusion_patterns)
            .find(|(_, regex)| regex.is_match(path))
            .map(|(pattern, _)| ExclusionReason::Pattern(pattern.as_str()))
    }

    fn match_exact(&self, ctx: &RequestContext<'_>) -> Option<Redirect<'a>> {
        let index = self.index;
        let options = index.options;
        let entries = index.exact_entries(normalize_path(ctx.path, options.trailing_slash));
        if entries.is_empty() {
            return None;
        }

        let terms: HashSet<&str> = query_terms(ctx.query).collect();
        let entry = entries
            .iter()
            .find(|entry| same_terms(&entry.query, &terms))
            .or_else(|| options.always_redirect.then(|| &entries[0]))?;

        Some(Redirect {
            code: entry.code,
            to: &entry.to,
            kind: RuleKind::Exact,
        })
    }

    /// Depth-first walk below `id`. The root gate always passes.
    fn match_node(&self, id: NodeId, path: &str) -> Option<&'a PatternRedirect> {
        let compiled = &self.nodes[id.index()];
        if id != NodeId::ROOT && !compiled.gate.is_match(path) {
            return None;
        }

        let index = self.index;
        let node = &index.forest.nodes()[id.index()];
        if let Some(position) = compiled.redirects.iter().position(|regex| regex.is_match(path)) {
            return Some(&node.redirects[position]);
        }

        node.children
            .iter()
            .find_map(|(_, child)| self.match_node(*child, path))
    }
}

/// Compiles each distinct pattern text once.
#[derive(Default)]
struct PatternCache {
    compiled: HashMap<String, Regex>,
}

impl PatternCache {
    fn compile(&mut self, pattern: &str) -> Result<Regex, MatcherError> {
        if let Some(regex) = self.compiled.get(pattern) {
            return Ok(regex.clone());
        }
        let regex = Regex::new(pattern).map_err(|source| MatcherError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        self.compiled.insert(pattern.to_string(), regex.clone());
        Ok(regex)
    }

    fn len(&self) -> usize {
        self.compiled.len()
    }
}
