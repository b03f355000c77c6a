// src/processors/js.rs

use std::fs;
use std::path::Path;

use anyhow::Result;
use regex::Regex;

use crate::processors::{
    ProcessFuture, ProcessedFile, Processor, blocking, inline_imports, write_target,
};

/// Concatenating bundler: replaces side-effect imports
/// (`import "./util.js";`) with the imported module's code, once per module.
#[derive(Debug, Clone)]
pub struct JsBundle {
    import: Regex,
}

impl JsBundle {
    pub fn new() -> Result<Self> {
        Ok(Self {
            import: Regex::new(r#"(?m)^[ \t]*import\s+["']([^"']+)["'][ \t]*;?[ \t]*$"#)?,
        })
    }
}

impl Processor for JsBundle {
    fn name(&self) -> &str {
        "bundle"
    }

    fn process_file<'a>(&'a self, source: &'a Path, target: &'a Path) -> ProcessFuture<'a> {
        let this = self.clone();
        let (source, target) = (source.to_path_buf(), target.to_path_buf());
        blocking(move || {
            let (code, imports) = inline_imports(&source, &this.import, "js")?;
            write_target(&target, &code)?;
            Ok(ProcessedFile {
                imports: imports.iter().map(|p| p.to_string_lossy().into_owned()).collect(),
                target: None,
            })
        })
    }
}

/// Line-based minifier: removes comments, indentation and blank lines.
#[derive(Debug, Clone)]
pub struct JsMinify {
    block_comments: Regex,
    line_comments: Regex,
}

impl JsMinify {
    pub fn new() -> Result<Self> {
        Ok(Self {
            block_comments: Regex::new(r"(?s)/\*.*?\*/")?,
            line_comments: Regex::new(r"(?m)^\s*//.*$")?,
        })
    }

    pub fn minify(&self, js: &str) -> String {
        let js = self.block_comments.replace_all(js, "");
        let js = self.line_comments.replace_all(&js, "");
        js.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Processor for JsMinify {
    fn name(&self) -> &str {
        "jsmin"
    }

    fn process_file<'a>(&'a self, source: &'a Path, target: &'a Path) -> ProcessFuture<'a> {
        let this = self.clone();
        let (source, target) = (source.to_path_buf(), target.to_path_buf());
        blocking(move || {
            let js = fs::read_to_string(&source)?;
            write_target(&target, &this.minify(&js))?;
            Ok(ProcessedFile::default())
        })
    }
}

/// Identity processor.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyProcessor;

impl Processor for CopyProcessor {
    fn name(&self) -> &str {
        "copy"
    }

    fn process_file<'a>(&'a self, source: &'a Path, target: &'a Path) -> ProcessFuture<'a> {
        Box::pin(async move {
            tokio::fs::copy(source, target).await?;
            Ok(ProcessedFile::default())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bundle_inlines_each_module_once() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        fs::write(dir.join("a.js"), "import \"./shared.js\";\nconst a = 1;\n").unwrap();
        fs::write(dir.join("shared.js"), "const shared = 0;\n").unwrap();
        fs::write(
            dir.join("main.js"),
            "import \"./a.js\";\nimport \"./shared\";\nconsole.log(a);\n",
        )
        .unwrap();
        let target = dir.join("out/main.js");

        let bundle = JsBundle::new().unwrap();
        let processed = bundle.process_file(&dir.join("main.js"), &target).await.unwrap();

        assert_eq!(processed.imports.len(), 2);
        let code = fs::read_to_string(target).unwrap();
        assert_eq!(code.matches("const shared = 0;").count(), 1);
        assert!(code.contains("const a = 1;"));
        assert!(!code.contains("import"));
    }

    #[test]
    fn jsmin_drops_comments_and_blank_lines() {
        let min = JsMinify::new().unwrap();
        let js = "/* banner */\nfunction f() {\n    // note\n    return 1;\n}\n\n";
        assert_eq!(min.minify(js), "function f() {\nreturn 1;\n}");
    }
}
