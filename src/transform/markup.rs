// src/transform/markup.rs

//! HTML whitespace collapsing and comment stripping.

use regex::Regex;

use crate::config::MarkupOptions;
use crate::errors::{Result, SiteflowError};
use crate::transform::{Asset, StepFuture, TransformStep};

/// Elements whose content is emitted untouched.
const RAW_ELEMENTS: &[&str] = &["pre", "textarea", "script", "style"];

/// Block-level and document-structure elements. Whitespace next to them on
/// both sides never renders.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "br", "dd", "details", "div", "dl",
    "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5",
    "h6", "head", "header", "hr", "html", "li", "link", "main", "meta", "nav", "noscript", "ol",
    "option", "p", "pre", "script", "section", "select", "style", "summary", "table", "tbody",
    "td", "tfoot", "th", "thead", "title", "tr", "ul",
];

#[derive(Debug, Clone)]
pub struct MinifyHtml {
    collapse_whitespace: bool,
    remove_comments: bool,
    whitespace: Regex,
}

impl MinifyHtml {
    pub fn new(options: &MarkupOptions) -> Result<Self> {
        let whitespace = Regex::new(r"\s+").map_err(|e| SiteflowError::Other(e.into()))?;
        Ok(Self {
            collapse_whitespace: options.collapse_whitespace,
            remove_comments: options.remove_comments,
            whitespace,
        })
    }

    pub fn minify(&self, src: &str) -> String {
        let mut out = String::with_capacity(src.len());
        let mut text = String::new();
        let mut rest = src;
        // Whether the last emitted token ends a block; the document start does.
        let mut after_block = true;

        while !rest.is_empty() {
            if rest.starts_with("<!--") {
                let end = rest.find("-->").map(|i| i + 3).unwrap_or(rest.len());
                let comment = &rest[..end];
                // Conditional comments carry markup for old browsers.
                if !self.remove_comments || comment.starts_with("<!--[if") {
                    self.flush_text(&mut text, &mut out, after_block, true);
                    out.push_str(comment);
                    after_block = true;
                }
                rest = &rest[end..];
            } else if starts_tag(rest) {
                let end = tag_end(rest);
                let tag = &rest[..end];
                let block = is_block_tag(tag);
                self.flush_text(&mut text, &mut out, after_block, block);
                out.push_str(tag);
                after_block = block;
                rest = &rest[end..];

                if let Some(name) = raw_element(tag) {
                    let close = format!("</{name}");
                    let idx = rest.to_ascii_lowercase().find(&close).unwrap_or(rest.len());
                    out.push_str(&rest[..idx]);
                    rest = &rest[idx..];
                }
            } else {
                // Text runs to the next tag; a lone '<' is text.
                let idx = rest
                    .char_indices()
                    .skip(1)
                    .find(|(_, c)| *c == '<')
                    .map(|(i, _)| i)
                    .unwrap_or(rest.len());
                text.push_str(&rest[..idx]);
                rest = &rest[idx..];
            }
        }
        self.flush_text(&mut text, &mut out, after_block, true);
        out
    }

    /// Emit pending text between two tokens.
    ///
    /// Whitespace is dropped only where it touches a block boundary; between
    /// inline neighbours a single space is kept.
    fn flush_text(
        &self,
        text: &mut String,
        out: &mut String,
        after_block: bool,
        before_block: bool,
    ) {
        if text.is_empty() {
            return;
        }
        if !self.collapse_whitespace {
            out.push_str(text);
        } else if text.trim().is_empty() {
            if !(after_block && before_block) {
                out.push(' ');
            }
        } else {
            let collapsed = self.whitespace.replace_all(text.as_str(), " ");
            let mut collapsed: &str = &collapsed;
            if after_block {
                collapsed = collapsed.trim_start();
            }
            if before_block {
                collapsed = collapsed.trim_end();
            }
            out.push_str(collapsed);
        }
        text.clear();
    }
}

fn starts_tag(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next() == Some('<')
        && matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '/' || c == '!' || c == '?')
}

/// Byte index just past the `>` that closes the tag at the start of `s`.
fn tag_end(s: &str) -> usize {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return i + 1,
            None => {}
        }
    }
    s.len()
}

fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('<')
        .trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Doctypes and processing instructions count as block boundaries.
fn is_block_tag(tag: &str) -> bool {
    if tag.starts_with("<!") || tag.starts_with("<?") {
        return true;
    }
    BLOCK_ELEMENTS.contains(&tag_name(tag).as_str())
}

fn raw_element(tag: &str) -> Option<&'static str> {
    if tag.starts_with("</") || tag.ends_with("/>") {
        return None;
    }
    let name = tag_name(tag);
    RAW_ELEMENTS.iter().copied().find(|raw| *raw == name)
}

impl TransformStep for MinifyHtml {
    fn name(&self) -> &str {
        "minify-html"
    }

    fn apply(&self, asset: Asset) -> StepFuture<'_> {
        Box::pin(async move {
            let bytes = self.minify(asset.text()?).into_bytes();
            Ok(Asset { bytes, ..asset })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minifier() -> MinifyHtml {
        MinifyHtml::new(&MarkupOptions::default()).unwrap()
    }

    #[test]
    fn collapses_indentation_and_runs() {
        let html = "<html>\n  <body>\n    <p>Hello    world</p>\n  </body>\n</html>\n";
        assert_eq!(
            minifier().minify(html),
            "<html><body><p>Hello world</p></body></html>"
        );
    }

    #[test]
    fn strips_comments_but_keeps_conditionals() {
        let html = "<p>a</p><!-- note --><!--[if IE]><p>old</p><![endif]-->";
        assert_eq!(
            minifier().minify(html),
            "<p>a</p><!--[if IE]><p>old</p><![endif]-->"
        );
    }

    #[test]
    fn raw_elements_are_verbatim() {
        let html = "<pre>\n  keep   this\n</pre>\n<script>\n if (a < b) {}\n</script>";
        assert_eq!(
            minifier().minify(html),
            "<pre>\n  keep   this\n</pre><script>\n if (a < b) {}\n</script>"
        );
    }

    #[test]
    fn inline_space_between_elements_survives() {
        let html = "<p><b>a</b> <i>b</i></p>";
        assert_eq!(minifier().minify(html), html);
    }

    #[test]
    fn newline_between_inline_elements_becomes_a_space() {
        let html = "<p><b>Hello</b>\n<i>world</i></p>";
        assert_eq!(minifier().minify(html), "<p><b>Hello</b> <i>world</i></p>");

        let html = "<li>\n  <a href=\"/\">home</a>\n  <a href=\"/x\">x</a>\n</li>";
        assert_eq!(
            minifier().minify(html),
            "<li> <a href=\"/\">home</a> <a href=\"/x\">x</a> </li>"
        );
    }

    #[test]
    fn text_is_trimmed_only_against_block_tags() {
        let html = "<!DOCTYPE html>\n<div>\n  Hello <em>there</em>\n  friend\n</div>";
        assert_eq!(
            minifier().minify(html),
            "<!DOCTYPE html><div>Hello <em>there</em> friend</div>"
        );
    }

    #[test]
    fn removed_comment_between_blocks_leaves_no_space() {
        let html = "<body>\n  <!-- nav -->\n  <p>a</p>\n</body>";
        assert_eq!(minifier().minify(html), "<body><p>a</p></body>");
    }

    #[test]
    fn quoted_gt_does_not_end_tag() {
        let html = "<a title=\"1 > 0\">x</a>";
        assert_eq!(minifier().minify(html), html);
    }

    #[test]
    fn disabled_options_pass_through() {
        let m = MinifyHtml::new(&MarkupOptions {
            collapse_whitespace: false,
            remove_comments: false,
            cmd: None,
        })
        .unwrap();
        let html = "<p>\n  a  <!-- c -->\n</p>";
        assert_eq!(m.minify(html), html);
    }
}
