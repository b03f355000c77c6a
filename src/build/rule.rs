// src/build/rule.rs

use std::collections::BTreeSet;
use std::fmt;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::model::RuleSpec;

/// One rule as seen by a build: its normalised spec plus the files it
/// currently owns (paths relative to the source dir).
#[derive(Debug, Clone)]
pub struct Rule {
    /// Position in the effective rule list; used for work-dir names and logs.
    pub index: usize,
    pub spec: RuleSpec,
    pub files: BTreeSet<String>,
}

impl Rule {
    pub fn new(index: usize, spec: RuleSpec) -> Self {
        Self {
            index,
            spec,
            files: BTreeSet::new(),
        }
    }

    pub fn has_processors(&self) -> bool {
        !self.spec.processors.is_empty()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {:?}", self.index, self.spec.sources)
    }
}

/// Compiled `sources` patterns of a rule.
#[derive(Clone)]
struct CompiledRule {
    sources: GlobSet,
    has_processors: bool,
}

/// Matches files against the ordered rule list.
///
/// This holds only the immutable part of each rule so it can be shared with
/// the watcher while the builder mutates rule file sets.
#[derive(Clone)]
pub struct RuleMatcher {
    rules: Vec<CompiledRule>,
}

impl fmt::Debug for RuleMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleMatcher")
            .field("rules", &self.rules.len())
            .finish_non_exhaustive()
    }
}

impl RuleMatcher {
    pub fn from_specs(specs: &[RuleSpec]) -> Result<Self> {
        let mut rules = Vec::with_capacity(specs.len());
        for (idx, spec) in specs.iter().enumerate() {
            let sources = build_globset(&spec.sources)
                .with_context(|| format!("building source globset for rule #{idx}"))?;
            rules.push(CompiledRule {
                sources,
                has_processors: !spec.processors.is_empty(),
            });
        }
        Ok(Self { rules })
    }

    /// Index of the rule owning `file`, if any.
    pub fn match_rule(&self, file: &str) -> Option<usize> {
        let sets: Vec<&GlobSet> = self.rules.iter().map(|r| &r.sources).collect();
        match_rule(&sets, file)
    }

    /// Whether watch events for `file` can be dropped: either no rule owns it,
    /// or its rule is a pure copy that only the next full build refreshes.
    pub fn should_ignore(&self, file: &str) -> bool {
        match self.match_rule(file) {
            Some(idx) => !self.rules[idx].has_processors,
            None => true,
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Return the index of the last rule whose patterns match `file`.
///
/// Rules are declared built-ins first, so searching from the end lets later
/// (user) rules override earlier ones.
pub fn match_rule(rules: &[&GlobSet], file: &str) -> Option<usize> {
    rules
        .iter()
        .enumerate()
        .rev()
        .find(|(_, set)| set.is_match(file))
        .map(|(idx, _)| idx)
}

/// Build a GlobSet from simple string patterns.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat)
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_rules;
    use crate::config::model::RuleTargets;

    fn matcher(specs: Vec<RuleSpec>) -> RuleMatcher {
        RuleMatcher::from_specs(&specs).unwrap()
    }

    #[test]
    fn later_rule_overrides_earlier_one() {
        let m = matcher(vec![
            RuleSpec::new(vec!["**/*.js"], RuleTargets::None, vec!["jsmin"]),
            RuleSpec::new(vec!["vendor/*.js"], RuleTargets::One("vendor.js".into()), vec![]),
        ]);

        assert_eq!(m.match_rule("vendor/jquery.js"), Some(1));
        assert_eq!(m.match_rule("app/main.js"), Some(0));
        assert_eq!(m.match_rule("README"), None);
    }

    #[test]
    fn literal_sources_match_exactly() {
        let m = matcher(vec![RuleSpec::new(vec!["robots.txt"], RuleTargets::None, vec![])]);
        assert_eq!(m.match_rule("robots.txt"), Some(0));
        assert_eq!(m.match_rule("a/robots.txt"), None);
    }

    #[test]
    fn default_rules_route_by_extension() {
        let m = matcher(default_rules());
        assert_eq!(m.match_rule("index.html"), Some(1));
        assert_eq!(m.match_rule("css/style.less"), Some(2));
        assert_eq!(m.match_rule("app.js"), Some(3));
        assert_eq!(m.match_rule("img/logo.png"), Some(0));
    }

    #[test]
    fn pure_copy_and_unmatched_files_are_ignored_by_the_watcher() {
        let m = matcher(default_rules());
        assert!(m.should_ignore("img/logo.png"));
        assert!(!m.should_ignore("style.less"));

        let m = matcher(vec![RuleSpec::new(vec!["*.css"], RuleTargets::None, vec!["cssmin"])]);
        assert!(m.should_ignore("notes.md"));
    }
}
