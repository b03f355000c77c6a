// src/config/validate.rs

use std::path::Path;

use globset::Glob;

use crate::config::defaults::default_rules;
use crate::config::model::{ConfigFile, ConfigSection, RawConfigFile, RuleConfig, RuleSpec, RuleTargets};
use crate::errors::{AssetflowError, Result};
use crate::fs::path_utils::normalize;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::AssetflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_global_config(&raw.config)?;

        let mut rules = if raw.config.default_rules {
            default_rules()
        } else {
            Vec::new()
        };
        for (idx, rule) in raw.rule.into_iter().enumerate() {
            rules.push(normalize_rule(idx, rule)?);
        }

        if rules.is_empty() {
            return Err(AssetflowError::ConfigError(
                "no rules: add a [[rule]] section or enable default_rules".to_string(),
            ));
        }

        Ok(ConfigFile::new_unchecked(raw.config, rules))
    }
}

fn validate_global_config(cfg: &ConfigSection) -> Result<()> {
    if cfg.debounce_ms == 0 {
        return Err(AssetflowError::ConfigError(
            "[config].debounce_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    for (name, dir) in [("target_dir", &cfg.target_dir), ("work_dir", &cfg.work_dir)] {
        if dirs_overlap(&cfg.source_dir, dir) {
            return Err(AssetflowError::ConfigError(format!(
                "[config].{name} {:?} overlaps source_dir {:?}",
                dir, cfg.source_dir
            )));
        }
    }
    if dirs_overlap(&cfg.target_dir, &cfg.work_dir) {
        return Err(AssetflowError::ConfigError(format!(
            "[config].work_dir {:?} overlaps target_dir {:?}",
            cfg.work_dir, cfg.target_dir
        )));
    }

    for link in cfg.link_dirs.iter() {
        if link.trim().is_empty() {
            return Err(AssetflowError::ConfigError(
                "[config].link_dirs must not contain empty names".to_string(),
            ));
        }
    }

    Ok(())
}

/// Turn a user rule into a `RuleSpec`, rejecting anything that would only
/// fail later at match or process time.
fn normalize_rule(idx: usize, rule: RuleConfig) -> Result<RuleSpec> {
    let sources = rule.sources.into_vec();
    if sources.is_empty() {
        return Err(AssetflowError::ConfigError(format!(
            "rule #{idx} has an empty `sources` list"
        )));
    }
    for pat in sources.iter() {
        Glob::new(pat).map_err(|e| {
            AssetflowError::ConfigError(format!("rule #{idx}: invalid source pattern {pat:?}: {e}"))
        })?;
    }

    let targets = rule
        .targets
        .map(|t| RuleTargets::from_list(t.into_vec()))
        .unwrap_or_default();
    for target in targets.as_list() {
        let path = Path::new(&target);
        let normalized = normalize(path);
        if target.trim().is_empty()
            || path.is_absolute()
            || normalized.as_os_str().is_empty()
            || normalized.starts_with("..")
        {
            return Err(AssetflowError::ConfigError(format!(
                "rule #{idx}: target {target:?} must be a relative path inside target_dir"
            )));
        }
    }

    for name in rule.processors.iter() {
        if name.trim().is_empty() {
            return Err(AssetflowError::ConfigError(format!(
                "rule #{idx} has an empty processor name"
            )));
        }
    }

    Ok(RuleSpec {
        sources,
        targets,
        processors: rule.processors,
    })
}

/// True if one directory is equal to or nested inside the other.
fn dirs_overlap(a: &Path, b: &Path) -> bool {
    let a = normalize(a);
    let b = normalize(b);
    a.starts_with(&b) || b.starts_with(&a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::StringOrList;
    use std::path::PathBuf;

    fn raw_with_rule(rule: RuleConfig) -> RawConfigFile {
        RawConfigFile {
            config: ConfigSection::default(),
            rule: vec![rule],
        }
    }

    #[test]
    fn user_rules_are_appended_after_defaults() {
        let raw = raw_with_rule(RuleConfig {
            sources: StringOrList::One("vendor/*.js".into()),
            targets: Some(StringOrList::One("vendor.js".into())),
            processors: vec!["jsmin".into()],
        });

        let cfg = ConfigFile::try_from(raw).unwrap();
        let last = cfg.rules.last().unwrap();
        assert_eq!(cfg.rules.len(), default_rules().len() + 1);
        assert_eq!(last.sources, vec!["vendor/*.js".to_string()]);
        assert_eq!(last.targets, RuleTargets::One("vendor.js".into()));
    }

    #[test]
    fn single_element_target_list_normalises_to_one() {
        let raw = raw_with_rule(RuleConfig {
            sources: StringOrList::Many(vec!["a.txt".into()]),
            targets: Some(StringOrList::Many(vec!["out.txt".into()])),
            processors: vec![],
        });
        let cfg = ConfigFile::try_from(raw).unwrap();
        assert_eq!(cfg.rules.last().unwrap().targets, RuleTargets::One("out.txt".into()));
    }

    #[test]
    fn invalid_glob_is_a_config_error() {
        let raw = raw_with_rule(RuleConfig {
            sources: StringOrList::One("src/[".into()),
            targets: None,
            processors: vec![],
        });
        match ConfigFile::try_from(raw) {
            Err(AssetflowError::ConfigError(msg)) => assert!(msg.contains("invalid source pattern")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn targets_escaping_the_target_dir_are_rejected() {
        let js_rule = |target: &str| RuleConfig {
            sources: StringOrList::One("*.js".into()),
            targets: Some(StringOrList::One(target.into())),
            processors: vec![],
        };
        for target in ["../escape.js", "js/../../escape.js", "js/..", "/abs.js"] {
            match ConfigFile::try_from(raw_with_rule(js_rule(target))) {
                Err(AssetflowError::ConfigError(msg)) => assert!(msg.contains(target), "{msg}"),
                other => panic!("Expected ConfigError for {target}, got: {:?}", other),
            }
        }

        assert!(ConfigFile::try_from(raw_with_rule(js_rule("js/../bundle.js"))).is_ok());
    }

    #[test]
    fn target_dir_inside_source_dir_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.config.target_dir = PathBuf::from("./src/out");
        assert!(matches!(
            ConfigFile::try_from(raw),
            Err(AssetflowError::ConfigError(_))
        ));
    }

    #[test]
    fn no_rules_at_all_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.config.default_rules = false;
        assert!(ConfigFile::try_from(raw).is_err());
    }
}
