// src/config/defaults.rs

//! Built-in rules placed in front of user rules.

use crate::config::model::{RuleSpec, RuleTargets};

/// The built-in rule set, lowest precedence first.
///
/// - anything: plain copy
/// - HTML: whitespace minification
/// - CSS / LESS: import inlining, then minification
/// - JS: import bundling, then minification
pub fn default_rules() -> Vec<RuleSpec> {
    vec![
        RuleSpec::new(vec!["**/*"], RuleTargets::None, Vec::new()),
        RuleSpec::new(vec!["**/*.html"], RuleTargets::None, vec!["htmlmin"]),
        RuleSpec::new(vec!["**/*.{css,less}"], RuleTargets::None, vec!["less", "cssmin"]),
        RuleSpec::new(vec!["**/*.js"], RuleTargets::None, vec!["bundle", "jsmin"]),
    ]
}
