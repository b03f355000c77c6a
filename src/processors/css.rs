// src/processors/css.rs

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Result, anyhow};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use regex::{Captures, Regex};

use crate::processors::{
    ProcessFuture, ProcessedFile, Processor, blocking, inline_imports, write_target,
};

/// Minimal LESS compiler: inlines `@import` statements and substitutes
/// top-level `@variable: value;` definitions. Writes `.less` files as `.css`.
#[derive(Debug, Clone)]
pub struct LessProcessor {
    import: Regex,
    definition: Regex,
    reference: Regex,
}

impl LessProcessor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            import: Regex::new(
                r#"(?m)^[ \t]*@import\s+(?:\([a-z, ]*\)\s*)?(?:url\()?["']([^"']+)["']\)?[ \t]*;?[ \t]*$"#,
            )?,
            definition: Regex::new(r"(?m)^[ \t]*@([A-Za-z_][\w-]*)\s*:\s*([^;\n]+);[ \t]*\n?")?,
            reference: Regex::new(r"@([A-Za-z_][\w-]*)")?,
        })
    }

    fn compile(&self, source: &Path, target: &Path) -> Result<ProcessedFile> {
        let (text, imports) = inline_imports(source, &self.import, "less")?;

        let mut vars = HashMap::new();
        for caps in self.definition.captures_iter(&text) {
            vars.insert(caps[1].to_string(), caps[2].trim().to_string());
        }
        let text = self.definition.replace_all(&text, "");
        let css = self.reference.replace_all(&text, |caps: &Captures| {
            vars.get(&caps[1]).cloned().unwrap_or_else(|| caps[0].to_string())
        });

        let out = if target.extension().is_some_and(|e| e == "less") {
            target.with_extension("css")
        } else {
            target.to_path_buf()
        };
        write_target(&out, &css)?;

        Ok(ProcessedFile {
            imports: imports.iter().map(|p| p.to_string_lossy().into_owned()).collect(),
            target: (out != target).then_some(out),
        })
    }
}

impl Processor for LessProcessor {
    fn name(&self) -> &str {
        "less"
    }

    fn process_file<'a>(&'a self, source: &'a Path, target: &'a Path) -> ProcessFuture<'a> {
        let this = self.clone();
        let (source, target) = (source.to_path_buf(), target.to_path_buf());
        blocking(move || this.compile(&source, &target))
    }
}

/// Minifies CSS through lightningcss: parse, minify, print compact.
#[derive(Debug, Clone, Copy, Default)]
pub struct CssMinify;

impl CssMinify {
    pub fn minify(&self, css: &str) -> Result<String> {
        let mut sheet = StyleSheet::parse(css, ParserOptions::default())
            .map_err(|e| anyhow!("parsing css: {e}"))?;
        sheet
            .minify(MinifyOptions::default())
            .map_err(|e| anyhow!("minifying css: {e}"))?;
        let printed = sheet
            .to_css(PrinterOptions {
                minify: true,
                ..PrinterOptions::default()
            })
            .map_err(|e| anyhow!("printing css: {e}"))?;
        Ok(printed.code)
    }
}

impl Processor for CssMinify {
    fn name(&self) -> &str {
        "cssmin"
    }

    fn process_file<'a>(&'a self, source: &'a Path, target: &'a Path) -> ProcessFuture<'a> {
        let this = *self;
        let (source, target) = (source.to_path_buf(), target.to_path_buf());
        blocking(move || {
            let css = fs::read_to_string(&source)?;
            write_target(&target, &this.minify(&css)?)?;
            Ok(ProcessedFile::default())
        })
    }
}
