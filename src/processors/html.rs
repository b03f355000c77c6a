// src/processors/html.rs

use std::fs;
use std::path::Path;

use anyhow::Result;
use regex::Regex;

use crate::processors::{ProcessFuture, ProcessedFile, Processor, blocking, write_target};

/// Block-level and head elements; whitespace next to their tags does not
/// render.
const BLOCK_TAGS: &str = "html|head|body|title|meta|link|div|p|h[1-6]|ul|ol|li|dl|dt|dd|\
table|thead|tbody|tfoot|tr|td|th|section|article|nav|header|footer|main|aside|form|br|hr";

/// Drops comments and collapses whitespace. Runs of whitespace between
/// inline content shrink to one space; next to block-level tags they go
/// away. `pre`, `textarea`, `script` and `style` elements are copied as is.
#[derive(Debug, Clone)]
pub struct HtmlMinify {
    preserved: Regex,
    comments: Regex,
    whitespace: Regex,
    around_blocks: Regex,
}

impl HtmlMinify {
    pub fn new() -> Result<Self> {
        Ok(Self {
            preserved: Regex::new(
                r"(?is)<pre\b.*?</pre\s*>|<textarea\b.*?</textarea\s*>|<script\b.*?</script\s*>|<style\b.*?</style\s*>",
            )?,
            comments: Regex::new(r"(?s)<!--.*?-->")?,
            whitespace: Regex::new(r"\s+")?,
            around_blocks: Regex::new(&format!(r"(?i)\s*(</?(?:{BLOCK_TAGS})\b[^>]*>)\s*"))?,
        })
    }

    pub fn minify(&self, html: &str) -> String {
        let mut out = String::with_capacity(html.len());
        let mut last = 0;
        for block in self.preserved.find_iter(html) {
            out.push_str(&self.minify_flow(&html[last..block.start()]));
            out.push_str(block.as_str());
            last = block.end();
        }
        out.push_str(&self.minify_flow(&html[last..]));
        out.trim().to_string()
    }

    fn minify_flow(&self, html: &str) -> String {
        let html = self.comments.replace_all(html, "");
        let html = self.whitespace.replace_all(&html, " ");
        self.around_blocks.replace_all(&html, "$1").into_owned()
    }
}

impl Processor for HtmlMinify {
    fn name(&self) -> &str {
        "htmlmin"
    }

    fn process_file<'a>(&'a self, source: &'a Path, target: &'a Path) -> ProcessFuture<'a> {
        let this = self.clone();
        let (source, target) = (source.to_path_buf(), target.to_path_buf());
        blocking(move || {
            let html = fs::read_to_string(&source)?;
            write_target(&target, &this.minify(&html))?;
            Ok(ProcessedFile::default())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_comments_and_inter_tag_whitespace() {
        let min = HtmlMinify::new().unwrap();
        let html = "<html>\n  <!-- nav -->\n  <body>\n    <p>Hello   world</p>\n  </body>\n</html>\n";
        assert_eq!(min.minify(html), "<html><body><p>Hello world</p></body></html>");
    }

    #[test]
    fn keeps_the_space_between_inline_elements() {
        let min = HtmlMinify::new().unwrap();
        assert_eq!(
            min.minify("<p>\n  <b>a</b>\n  <i>b</i>\n</p>"),
            "<p><b>a</b> <i>b</i></p>"
        );
    }

    #[test]
    fn preformatted_blocks_are_untouched() {
        let min = HtmlMinify::new().unwrap();
        let html = "<div>\n  <pre>\n  x\n    y\n</pre>\n  <textarea>a  b</textarea>\n</div>";
        assert_eq!(
            min.minify(html),
            "<div><pre>\n  x\n    y\n</pre> <textarea>a  b</textarea></div>"
        );
    }
}
