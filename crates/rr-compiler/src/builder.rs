use std::collections::HashSet;

use regex::Regex;
use rr_core::classify::{classify, is_pattern, RuleKind};
use rr_core::index::{ExactEntry, NodeId, PatternRedirect, RedirectIndex};
use rr_core::path::{normalize_path, query_terms, same_terms, split_path_query};
use rr_core::Exclusions;

use crate::options::RedirectOptions;
use crate::parser::{RedirectRule, RejectedRow, RowError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub exact_rules: usize,
    pub pattern_rules: usize,
    /// Exact rules that replaced an earlier rule with the same path and query set
    pub overridden: usize,
    /// Parent tokens that were not anchored patterns
    pub dropped_parent_tokens: usize,
}

/// Build a redirect index from rules in input order. Rules whose patterns do
/// not compile are left out and returned as rejected rows.
pub fn build_index(
    rules: &[RedirectRule],
    exclusions: Exclusions,
    options: &RedirectOptions,
) -> (RedirectIndex, BuildStats, Vec<RejectedRow>) {
    let mut builder = IndexBuilder::new(options);
    builder.set_exclusions(exclusions);
    for rule in rules {
        builder.add_rule(rule);
    }
    builder.finish()
}

/// Build state for one index. Consumed by [`IndexBuilder::finish`].
pub struct IndexBuilder<'o> {
    options: &'o RedirectOptions,
    index: RedirectIndex,
    stats: BuildStats,
    rejected: Vec<RejectedRow>,
    /// Pattern texts already known to compile
    checked: HashSet<String>,
}

impl<'o> IndexBuilder<'o> {
    pub fn new(options: &'o RedirectOptions) -> Self {
        let index = RedirectIndex {
            options: options.match_options(),
            ..RedirectIndex::default()
        };
        Self {
            options,
            index,
            stats: BuildStats::default(),
            rejected: Vec::new(),
            checked: HashSet::new(),
        }
    }

    pub fn set_exclusions(&mut self, exclusions: Exclusions) {
        self.index.exclusions = exclusions;
    }

    /// Add one rule. A rule that cannot be indexed is recorded as rejected
    /// and leaves the index untouched.
    pub fn add_rule(&mut self, rule: &RedirectRule) {
        let added = match classify(&rule.from) {
            RuleKind::Exact => {
                self.add_exact(rule);
                Ok(())
            }
            RuleKind::Pattern => self.add_pattern(rule),
        };

        if let Err(error) = added {
            log::warn!("line {}: skipped redirect row: {}", rule.line, error);
            self.rejected.push(RejectedRow { line: rule.line, error });
        }
    }

    pub fn finish(self) -> (RedirectIndex, BuildStats, Vec<RejectedRow>) {
        (self.index, self.stats, self.rejected)
    }

    fn add_exact(&mut self, rule: &RedirectRule) {
        let (path, query) = split_path_query(&rule.from);
        let path = normalize_path(path, self.options.trailing_slash);
        let terms: Vec<String> = query_terms(query).map(str::to_string).collect();
        let signature: HashSet<&str> = terms.iter().map(String::as_str).collect();

        let entries = self.index.exact.entry(path.to_string()).or_default();
        let entry = ExactEntry {
            code: rule.code,
            to: rule.to.clone(),
            query: terms.clone(),
        };

        match entries.iter_mut().find(|existing| same_terms(&existing.query, &signature)) {
            Some(existing) => {
                log::warn!(
                    "redirect from '{}' overrides an earlier rule for the same path and query",
                    rule.from
                );
                *existing = entry;
                self.stats.overridden += 1;
            }
            None => entries.push(entry),
        }
        self.stats.exact_rules += 1;
    }

    fn add_pattern(&mut self, rule: &RedirectRule) -> Result<(), RowError> {
        self.check_pattern(&rule.from)?;

        let options = self.options;
        let mut chain = Vec::new();
        let mut dropped = 0;
        if !rule.parents.is_empty() {
            for token in rule.parents.split(options.parent_regex_split_sequence.as_str()) {
                if is_pattern(token) {
                    self.check_pattern(token)?;
                    chain.push(token);
                } else {
                    // Not anchored: contributes no level. Kept silent for matching.
                    log::debug!("redirect from '{}': ignoring parent token '{}'", rule.from, token);
                    dropped += 1;
                }
            }
        }

        let mut node = NodeId::ROOT;
        for token in chain {
            node = self.index.forest.child_or_insert(node, token);
        }

        self.stats.dropped_parent_tokens += dropped;
        self.index.forest.push_redirect(
            node,
            PatternRedirect {
                code: rule.code,
                from: rule.from.clone(),
                to: rule.to.clone(),
            },
        );
        self.stats.pattern_rules += 1;
        Ok(())
    }

    fn check_pattern(&mut self, pattern: &str) -> Result<(), RowError> {
        if self.checked.contains(pattern) {
            return Ok(());
        }
        Regex::new(pattern).map_err(|e| RowError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        self.checked.insert(pattern.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rr_core::index::NodeId;
    use rr_core::{Matcher, RequestContext, RuleKind};

    use crate::exclusions::build_exclusions;
    use crate::options::RedirectOptions;
    use crate::parser::{parse_redirect_csv, RedirectRule, RejectedRow, RowError};

    use super::build_index;

    fn rule(code: u16, from: &str, to: &str, parents: &str) -> RedirectRule {
        RedirectRule {
            line: 0,
            code,
            from: from.to_string(),
            to: to.to_string(),
            parents: parents.to_string(),
            comments: String::new(),
        }
    }

    fn build(rules: &[RedirectRule], options: &RedirectOptions) -> rr_core::RedirectIndex {
        build_index(rules, build_exclusions(&options.redirect_exclusions), options).0
    }

    fn lookup(index: &rr_core::RedirectIndex, uri: &str) -> Option<(u16, String)> {
        let matcher = Matcher::new(index).expect("index should compile");
        matcher
            .find_redirect(&RequestContext::from_uri(uri))
            .map(|r| (r.code, r.to.to_string()))
    }

    #[test]
    fn exact_rules_round_trip() {
        let options = RedirectOptions::default();
        let rules: Vec<RedirectRule> = (0..20)
            .map(|i| rule(301 + (i % 2) as u16, &format!("/page-{}", i), &format!("/target-{}", i), ""))
            .collect();
        let index = build(&rules, &options);

        for (i, r) in rules.iter().enumerate() {
            assert_eq!(lookup(&index, &r.from), Some((r.code, format!("/target-{}", i))));
        }
    }

    #[test]
    fn strips_trailing_slash_before_lookup() {
        let options = RedirectOptions::default();
        let index = build(&[rule(301, "/old", "/new", "")], &options);

        assert_eq!(lookup(&index, "/old/"), Some((301, "/new".to_string())));
        assert_eq!(lookup(&index, "/old"), Some((301, "/new".to_string())));
    }

    #[test]
    fn normalizes_rule_paths_too() {
        let options = RedirectOptions::default();
        let index = build(&[rule(301, "/old/?a=1", "/new", "")], &options);

        assert!(index.exact.contains_key("/old"));
        assert_eq!(lookup(&index, "/old?a=1"), Some((301, "/new".to_string())));
    }

    #[test]
    fn keeps_root_path() {
        let options = RedirectOptions::default();
        let index = build(&[rule(301, "/", "/home", "")], &options);

        assert!(index.exact.contains_key("/"));
        assert_eq!(lookup(&index, "/"), Some((301, "/home".to_string())));
    }

    #[test]
    fn trailing_slash_option_keeps_paths_distinct() {
        let options = RedirectOptions {
            trailing_slash: true,
            ..RedirectOptions::default()
        };
        let index = build(
            &[rule(301, "/old", "/no-slash", ""), rule(302, "/old/", "/slash", "")],
            &options,
        );

        assert_eq!(lookup(&index, "/old"), Some((301, "/no-slash".to_string())));
        assert_eq!(lookup(&index, "/old/"), Some((302, "/slash".to_string())));
    }

    #[test]
    fn pattern_rule_at_root() {
        let options = RedirectOptions::default();
        let index = build(&[rule(302, r"^\/blog\/.*$", "/archive", "")], &options);

        assert_eq!(index.forest.root().redirects.len(), 1);
        assert_eq!(lookup(&index, "/blog/post-1"), Some((302, "/archive".to_string())));
        assert_eq!(lookup(&index, "/shop/post-1"), None);
    }

    #[test]
    fn default_exclusion_blocks_api_paths() {
        let options = RedirectOptions::default();
        let index = build(
            &[rule(301, "^/.*$", "/everything", ""), rule(301, "/api/users", "/exact", "")],
            &options,
        );

        assert_eq!(lookup(&index, "/api/users"), None);
        assert_eq!(lookup(&index, "/other"), Some((301, "/everything".to_string())));
    }

    #[test]
    fn punctual_exclusion_beats_exact_and_pattern_rules() {
        let options = RedirectOptions {
            redirect_exclusions: vec!["/keep".to_string()],
            ..RedirectOptions::default()
        };
        let index = build(
            &[rule(301, "/keep", "/gone", ""), rule(302, "^/k.*$", "/k", "")],
            &options,
        );

        assert_eq!(lookup(&index, "/keep"), None);
        assert_eq!(lookup(&index, "/kite"), Some((302, "/k".to_string())));
    }

    #[test]
    fn query_sets_select_entries() {
        let options = RedirectOptions::default();
        let index = build(&[rule(301, "/x?a", "/for-a", ""), rule(302, "/x?b", "/for-b", "")], &options);

        assert_eq!(index.exact["/x"].len(), 2);
        assert_eq!(lookup(&index, "/x?a"), Some((301, "/for-a".to_string())));
        assert_eq!(lookup(&index, "/x?b"), Some((302, "/for-b".to_string())));
        assert_eq!(lookup(&index, "/x?c"), None);
    }

    #[test]
    fn query_terms_are_order_insensitive() {
        let options = RedirectOptions::default();
        let index = build(&[rule(301, "/x?a=1&b=2", "/ab", "")], &options);

        assert_eq!(index.exact["/x"][0].query, vec!["a=1", "b=2"]);
        assert_eq!(lookup(&index, "/x?b=2&a=1"), Some((301, "/ab".to_string())));
        assert_eq!(lookup(&index, "/x?a=1"), None);
    }

    #[test]
    fn always_redirect_uses_first_entry() {
        let options = RedirectOptions {
            always_redirect: true,
            ..RedirectOptions::default()
        };
        let index = build(&[rule(301, "/x?a", "/for-a", ""), rule(302, "/x?b", "/for-b", "")], &options);

        assert_eq!(lookup(&index, "/x?b"), Some((302, "/for-b".to_string())));
        assert_eq!(lookup(&index, "/x?c"), Some((301, "/for-a".to_string())));
    }

    #[test]
    fn later_duplicate_overrides_earlier() {
        let options = RedirectOptions::default();
        let (index, stats, _) = build_index(
            &[rule(301, "/x?a&b", "/first", ""), rule(302, "/x/?b&a", "/second", "")],
            build_exclusions(&options.redirect_exclusions),
            &options,
        );

        assert_eq!(stats.overridden, 1);
        assert_eq!(stats.exact_rules, 2);
        assert_eq!(index.exact["/x"].len(), 1);
        assert_eq!(lookup(&index, "/x?a&b"), Some((302, "/second".to_string())));
    }

    #[test]
    fn builds_parent_chain() {
        let options = RedirectOptions::default();
        let parents = r"^\/en\/.*$$/$^\/en\/blog\/.*$";
        let index = build(&[rule(301, r"^\/en\/blog\/old-.*$", "/en/blog", parents)], &options);

        let en = index.forest.root().child(r"^\/en\/.*$").expect("first level");
        let blog = index.forest.get(en).and_then(|n| n.child(r"^\/en\/blog\/.*$")).expect("second level");
        assert!(index.forest.root().redirects.is_empty());
        assert_eq!(index.forest.get(blog).map(|n| n.redirects.len()), Some(1));
    }

    #[test]
    fn rules_share_parent_nodes() {
        let options = RedirectOptions::default();
        let index = build(
            &[
                rule(301, "^/en/a$", "/a", "^/en/.*$"),
                rule(301, "^/en/b$", "/b", "^/en/.*$"),
            ],
            &options,
        );

        assert_eq!(index.forest.len(), 2);
        let en = index.forest.root().child("^/en/.*$").expect("node");
        assert_eq!(index.forest.get(en).map(|n| n.redirects.len()), Some(2));
    }

    #[test]
    fn parent_gating_is_enforced() {
        let options = RedirectOptions::default();
        // The rule itself matches anything ending in /old; both parents must also match.
        let gated = build(&[rule(301, "^.*/old$", "/gated", "^/en/.*$$/$^.*/docs/.*$")], &options);
        let ungated = build(&[rule(301, "^.*/old$", "/gated", "")], &options);

        assert_eq!(lookup(&gated, "/en/docs/old"), Some((301, "/gated".to_string())));
        assert_eq!(lookup(&gated, "/en/blog/old"), None);
        assert_eq!(lookup(&gated, "/fr/docs/old"), None);

        assert_eq!(lookup(&ungated, "/en/blog/old"), Some((301, "/gated".to_string())));
        assert_eq!(lookup(&ungated, "/fr/docs/old"), Some((301, "/gated".to_string())));
    }

    #[test]
    fn malformed_parent_tokens_are_dropped() {
        let options = RedirectOptions::default();
        let (index, stats, _) = build_index(
            &[rule(301, "^/en/old$", "/new", "/en/$/$^/en/.*$")],
            build_exclusions(&options.redirect_exclusions),
            &options,
        );

        assert_eq!(stats.dropped_parent_tokens, 1);
        assert_eq!(index.forest.len(), 2);
        assert!(index.forest.root().child("^/en/.*$").is_some());
    }

    #[test]
    fn all_malformed_parents_attach_at_root() {
        let options = RedirectOptions::default();
        let index = build(&[rule(301, "^/old$", "/new", "not-a-pattern")], &options);

        assert_eq!(index.forest.len(), 1);
        assert_eq!(index.forest.root().redirects.len(), 1);
    }

    #[test]
    fn custom_split_sequence() {
        let options = RedirectOptions {
            parent_regex_split_sequence: " > ".to_string(),
            ..RedirectOptions::default()
        };
        let index = build(&[rule(301, "^/a/b/c$", "/abc", "^/a/.*$ > ^/a/b/.*$")], &options);

        let a = index.forest.root().child("^/a/.*$").expect("a");
        assert!(index.forest.get(a).and_then(|n| n.child("^/a/b/.*$")).is_some());
        assert_eq!(lookup(&index, "/a/b/c"), Some((301, "/abc".to_string())));
    }

    #[test]
    fn partial_anchor_is_a_literal_path() {
        let options = RedirectOptions::default();
        let index = build(&[rule(301, "^/blog", "/x", "")], &options);

        assert!(index.exact.contains_key("^/blog"));
        assert_eq!(index.forest.redirect_count(), 0);
        assert_eq!(lookup(&index, "/blog"), None);
    }

    #[test]
    fn parents_on_exact_rules_are_ignored() {
        let options = RedirectOptions::default();
        let index = build(&[rule(301, "/old", "/new", "^/.*$")], &options);

        assert_eq!(index.forest.len(), 1);
        assert_eq!(lookup(&index, "/old"), Some((301, "/new".to_string())));
    }

    #[test]
    fn building_twice_is_identical() {
        let csv = "code,from,to,parents,comments\n\
                   301,/old,/new,,\n\
                   302,/x?a,/a,,\n\
                   302,/x?b,/b,,\n\
                   301,^/en/.*/old$,/en/new,^/en/.*$,\n\
                   308,^/docs/.*$,/documentation,,\n";
        let options = RedirectOptions::default();
        let rules = parse_redirect_csv(csv).expect("csv").rules;

        let first = build(&rules, &options);
        let second = build(&rules, &options);
        assert_eq!(first, second);
    }

    #[test]
    fn unsupported_pattern_rejects_only_its_row() {
        let options = RedirectOptions::default();
        let mut lookahead = rule(302, "^/blog/(?!keep).*$", "/archive", "");
        lookahead.line = 3;
        let mut bad_parent = rule(301, "^/en/old$", "/en/new", "^/(en$");
        bad_parent.line = 4;

        let (index, stats, rejected) = build_index(
            &[rule(301, "/old", "/new", ""), lookahead, bad_parent, rule(308, "^/docs/.*$", "/d", "")],
            build_exclusions(&options.redirect_exclusions),
            &options,
        );

        assert_eq!(rejected.len(), 2);
        assert_eq!(rejected[0].line, 3);
        assert!(matches!(
            &rejected[0].error,
            RowError::InvalidPattern { pattern, .. } if pattern == "^/blog/(?!keep).*$"
        ));
        assert!(matches!(
            &rejected[1],
            RejectedRow { line: 4, error: RowError::InvalidPattern { pattern, .. } } if pattern == "^/(en$"
        ));

        // no node left behind by the rejected parent chain
        assert_eq!(index.forest.len(), 1);
        assert_eq!(stats.pattern_rules, 1);
        assert_eq!(lookup(&index, "/old"), Some((301, "/new".to_string())));
        assert_eq!(lookup(&index, "/docs/x"), Some((308, "/d".to_string())));
        assert_eq!(lookup(&index, "/blog/post"), None);
    }

    #[test]
    fn pattern_lookup_reports_kind() {
        let options = RedirectOptions::default();
        let index = build(&[rule(302, "^/p/.*$", "/p", ""), rule(301, "/e", "/e2", "")], &options);
        let matcher = Matcher::new(&index).expect("matcher");

        let pattern = matcher.find_redirect(&RequestContext::from_uri("/p/1")).expect("pattern");
        let exact = matcher.find_redirect(&RequestContext::from_uri("/e")).expect("exact");
        assert_eq!(pattern.kind, RuleKind::Pattern);
        assert_eq!(exact.kind, RuleKind::Exact);
        assert_eq!(index.forest.get(NodeId::ROOT).map(|n| n.redirects.len()), Some(1));
    }
}
