// tests/properties.rs

use proptest::prelude::*;

use assetflow::build::DependencyMap;
use assetflow::build::rule::{RuleMatcher, build_globset};
use assetflow::config::{RuleSpec, RuleTargets};
use assetflow::engine::EditQueue;
use assetflow::types::EditKind;

const PATTERNS: &[&str] = &[
    "**/*",
    "**/*.js",
    "**/*.css",
    "vendor/**",
    "vendor/*.js",
    "*.html",
    "app.js",
    "css/*.css",
];

const FILES: &[&str] = &[
    "app.js",
    "index.html",
    "vendor/jquery.js",
    "vendor/css/x.css",
    "css/site.css",
    "docs/readme.md",
];

fn edit_kind() -> impl Strategy<Value = EditKind> {
    prop_oneof![Just(EditKind::Add), Just(EditKind::Del), Just(EditKind::Chg)]
}

proptest! {
    #[test]
    fn last_matching_rule_wins(
        picks in proptest::collection::vec(0..PATTERNS.len(), 1..8),
        file in 0..FILES.len(),
    ) {
        let specs: Vec<RuleSpec> = picks
            .iter()
            .map(|&p| RuleSpec::new(vec![PATTERNS[p]], RuleTargets::None, vec![]))
            .collect();
        let matcher = RuleMatcher::from_specs(&specs).unwrap();
        let file = FILES[file];

        let expected = specs
            .iter()
            .enumerate()
            .filter(|(_, spec)| build_globset(&spec.sources).unwrap().is_match(file))
            .map(|(idx, _)| idx)
            .last();
        prop_assert_eq!(matcher.match_rule(file), expected);
    }

    #[test]
    fn target_and_source_maps_are_exact_inverses(
        edges in proptest::collection::vec((0..6u8, 0..6u8), 0..20),
    ) {
        let tts: DependencyMap = edges
            .iter()
            .map(|(t, s)| (format!("t{t}"), format!("s{s}")))
            .collect();
        let stt = tts.flip();

        prop_assert_eq!(stt.flip(), tts.clone());
        for (target, sources) in tts.iter() {
            for source in sources {
                prop_assert!(stt.get(source).unwrap().contains(target));
            }
        }
    }

    #[test]
    fn reduction_yields_at_most_a_queued_kind(
        events in proptest::collection::vec(edit_kind(), 0..10),
    ) {
        let mut queue = EditQueue::new();
        for e in events.iter() {
            queue.push(*e);
        }
        match queue.reduce("f") {
            Some(kind) => prop_assert!(events.contains(&kind)),
            None => prop_assert!(events.len() != 1),
        }
    }
}
