#![allow(dead_code)]

use std::path::Path;

use assetflow::config::{ConfigFile, ConfigSection, RawConfigFile, RuleConfig, StringOrList};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                rule: Vec::new(),
            },
        }
    }

    pub fn with_rule(mut self, rule: RuleConfig) -> Self {
        self.config.rule.push(rule);
        self
    }

    pub fn without_default_rules(mut self) -> Self {
        self.config.config.default_rules = false;
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.config.debounce_ms = ms;
        self
    }

    pub fn link_dirs(mut self, dirs: &[&str]) -> Self {
        self.config.config.link_dirs = dirs.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    /// Validate and resolve directories against `root`.
    pub fn build_at(self, root: impl AsRef<Path>) -> ConfigFile {
        ConfigFile::try_from(self.config)
            .expect("Failed to build valid config from builder")
            .with_root(root.as_ref())
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `RuleConfig`.
pub struct RuleConfigBuilder {
    rule: RuleConfig,
}

impl RuleConfigBuilder {
    pub fn new(sources: &[&str]) -> Self {
        Self {
            rule: RuleConfig {
                sources: StringOrList::Many(sources.iter().map(|s| s.to_string()).collect()),
                targets: None,
                processors: Vec::new(),
            },
        }
    }

    pub fn target(mut self, target: &str) -> Self {
        self.rule.targets = Some(StringOrList::One(target.to_string()));
        self
    }

    pub fn targets(mut self, targets: &[&str]) -> Self {
        self.rule.targets = Some(StringOrList::Many(
            targets.iter().map(|t| t.to_string()).collect(),
        ));
        self
    }

    pub fn processor(mut self, name: &str) -> Self {
        self.rule.processors.push(name.to_string());
        self
    }

    pub fn build(self) -> RuleConfig {
        self.rule
    }
}
