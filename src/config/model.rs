// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// source_dir = "src"
/// target_dir = "public"
///
/// [[rule]]
/// sources = ["vendor/**/*.js"]
/// targets = "vendor.js"
/// processors = ["jsmin"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Global directories and watch behaviour from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// User rules from `[[rule]]`, in declaration order.
    #[serde(default)]
    pub rule: Vec<RuleConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Directory scanned for source files.
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// Directory receiving finalized outputs. Anything in here that the
    /// build did not produce is deleted after each pass.
    #[serde(default = "default_target_dir")]
    pub target_dir: PathBuf,

    /// Scratch directory holding per-rule, per-build stage outputs.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Idle time after the last file event before an incremental pass starts.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Directories under the project root that are symlinked into every
    /// stage working dir so processors can resolve dependencies from there.
    #[serde(default = "default_link_dirs")]
    pub link_dirs: Vec<String>,

    /// Whether the built-in rules are placed in front of the user rules.
    #[serde(default = "default_true")]
    pub default_rules: bool,
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("src")
}

fn default_target_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".assetflow")
}

fn default_debounce_ms() -> u64 {
    250
}

fn default_link_dirs() -> Vec<String> {
    vec!["node_modules".to_string()]
}

fn default_true() -> bool {
    true
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            target_dir: default_target_dir(),
            work_dir: default_work_dir(),
            debounce_ms: default_debounce_ms(),
            link_dirs: default_link_dirs(),
            default_rules: default_true(),
        }
    }
}

/// A TOML value that may be written either as a single string or as a list.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            StringOrList::One(s) => vec![s],
            StringOrList::Many(v) => v,
        }
    }
}

/// `[[rule]]` entry exactly as written by the user.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    /// Literal paths or glob patterns, relative to the source dir.
    pub sources: StringOrList,

    /// Output shape. Omitted means every source is copied 1:1.
    #[serde(default)]
    pub targets: Option<StringOrList>,

    /// Processor chain, applied in order.
    #[serde(default)]
    pub processors: Vec<String>,
}

/// Declared output shape of a rule, normalised at load time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RuleTargets {
    /// Copy each source to the same relative path under the target dir.
    #[default]
    None,
    /// Merge every source into this one file.
    One(String),
    /// Copy the leading sources 1:1 and merge the rest into the last target.
    Many(Vec<String>),
}

impl RuleTargets {
    pub fn from_list(list: Vec<String>) -> Self {
        let mut list = list;
        match list.len() {
            0 => RuleTargets::None,
            1 => RuleTargets::One(list.remove(0)),
            _ => RuleTargets::Many(list),
        }
    }

    /// Declared targets as a slice-like list (empty for `None`).
    pub fn as_list(&self) -> Vec<String> {
        match self {
            RuleTargets::None => Vec::new(),
            RuleTargets::One(t) => vec![t.clone()],
            RuleTargets::Many(ts) => ts.clone(),
        }
    }
}

/// Validated, normalised rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSpec {
    pub sources: Vec<String>,
    pub targets: RuleTargets,
    pub processors: Vec<String>,
}

impl RuleSpec {
    pub fn new<S: Into<String>>(sources: Vec<S>, targets: RuleTargets, processors: Vec<S>) -> Self {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            targets,
            processors: processors.into_iter().map(Into::into).collect(),
        }
    }
}

/// Validated configuration.
///
/// `rules` holds the effective, ordered rule list: built-in rules first (when
/// enabled), user rules after them. Rules are matched last-to-first, so user
/// rules win over the defaults.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub rules: Vec<RuleSpec>,
    /// Directory the relative paths in `config` are resolved against.
    root_dir: PathBuf,
}

impl ConfigFile {
    /// Build a config without running validation.
    ///
    /// Callers must ensure invariants (see `validate.rs`); prefer
    /// `ConfigFile::try_from(raw)`.
    pub fn new_unchecked(config: ConfigSection, rules: Vec<RuleSpec>) -> Self {
        Self {
            config,
            rules,
            root_dir: PathBuf::from("."),
        }
    }

    /// Re-root the relative directories of this config.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root_dir = root.into();
        self
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn source_dir(&self) -> PathBuf {
        self.root_dir.join(&self.config.source_dir)
    }

    pub fn target_dir(&self) -> PathBuf {
        self.root_dir.join(&self.config.target_dir)
    }

    pub fn work_dir(&self) -> PathBuf {
        self.root_dir.join(&self.config.work_dir)
    }
}
