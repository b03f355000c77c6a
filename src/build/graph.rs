// src/build/graph.rs

//! Target-to-sources / source-to-targets maps.
//!
//! The same type is used for both directions: a `DependencyMap` keyed by
//! targets is a TargetToSources map, and [`DependencyMap::flip`] turns it into
//! the matching SourceToTargets map.

use std::collections::{BTreeMap, BTreeSet};

use crate::errors::{AssetflowError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyMap {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map every file to itself.
    pub fn identity<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = Self::new();
        for f in files {
            let f = f.into();
            map.insert(f.clone(), f);
        }
        map
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.edges.entry(key.into()).or_default().insert(value.into());
    }

    /// Register `key` with no values yet.
    pub fn touch(&mut self, key: impl Into<String>) {
        self.edges.entry(key.into()).or_default();
    }

    pub fn get(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.edges.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.edges.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.edges.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.edges.iter()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Invert the map. Keys with no values do not appear in the result.
    pub fn flip(&self) -> DependencyMap {
        let mut flipped = DependencyMap::new();
        for (key, values) in self.edges.iter() {
            for v in values {
                flipped.insert(v.clone(), key.clone());
            }
        }
        flipped
    }

    /// Compose this stage map with the aggregate map of the previous stage.
    ///
    /// `self` maps this stage's targets to this stage's sources; `previous`
    /// maps those sources to the original stage-0 sources. The result maps
    /// this stage's targets to original sources. A stage source unknown to
    /// `previous` is its own origin.
    pub fn trace(&self, previous: &DependencyMap) -> DependencyMap {
        let mut traced = DependencyMap::new();
        for (target, sources) in self.edges.iter() {
            traced.touch(target.clone());
            for source in sources {
                match previous.get(source) {
                    Some(origins) => {
                        for origin in origins {
                            traced.insert(target.clone(), origin.clone());
                        }
                    }
                    None => traced.insert(target.clone(), source.clone()),
                }
            }
        }
        traced
    }

    /// Targets whose source set is strictly contained in another target's
    /// source set.
    ///
    /// Such a target was already folded into the larger one (an `@import`ed
    /// partial, a bundled module) and must not be processed on its own
    /// downstream. Two targets with the same source set mean a processor
    /// misreported its imports, which is fatal.
    pub fn imported_targets(&self) -> Result<BTreeSet<String>> {
        let entries: Vec<(&String, &BTreeSet<String>)> = self
            .edges
            .iter()
            .filter(|(_, sources)| !sources.is_empty())
            .collect();

        let mut seen: BTreeMap<&BTreeSet<String>, &String> = BTreeMap::new();
        for (target, sources) in entries.iter() {
            if let Some(other) = seen.insert(*sources, *target) {
                return Err(AssetflowError::InvariantViolation(format!(
                    "targets '{other}' and '{target}' have identical source sets {sources:?}"
                )));
            }
        }

        let mut imported = BTreeSet::new();
        for (target, sources) in entries.iter() {
            let subsumed = entries
                .iter()
                .any(|(other, other_sources)| other != target && sources.is_subset(other_sources));
            if subsumed {
                imported.insert((*target).clone());
            }
        }
        Ok(imported)
    }
}

impl FromIterator<(String, String)> for DependencyMap {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut map = DependencyMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}
