// src/processors/registry.rs

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::{AssetflowError, Result};
use crate::processors::Processor;
use crate::processors::css::{CssMinify, LessProcessor};
use crate::processors::html::HtmlMinify;
use crate::processors::js::{CopyProcessor, JsBundle, JsMinify};

/// Processors available to rules, by name.
#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    processors: BTreeMap<String, Arc<dyn Processor>>,
}

impl fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("names", &self.processors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in processors used by the default rules.
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(LessProcessor::new()?));
        registry.register(Arc::new(CssMinify));
        registry.register(Arc::new(HtmlMinify::new()?));
        registry.register(Arc::new(JsBundle::new()?));
        registry.register(Arc::new(JsMinify::new()?));
        registry.register(Arc::new(CopyProcessor));
        Ok(registry)
    }

    /// Add a processor, replacing any previous one with the same name.
    pub fn register(&mut self, processor: Arc<dyn Processor>) {
        self.processors.insert(processor.name().to_string(), processor);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Processor>> {
        self.processors.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.processors.keys().map(String::as_str)
    }

    /// Resolve a rule's processor chain; unknown names are fatal.
    pub fn resolve_chain(&self, rule: usize, names: &[String]) -> Result<Vec<Arc<dyn Processor>>> {
        names
            .iter()
            .map(|name| {
                self.get(name).ok_or_else(|| AssetflowError::UnknownProcessor {
                    rule,
                    name: name.clone(),
                })
            })
            .collect()
    }
}
