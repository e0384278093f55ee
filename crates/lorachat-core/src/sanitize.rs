//! Sanitization of parsed assistant answers
//!
//! Second rendering stage. Answers come from a model and are treated as
//! untrusted: raw HTML is removed (together with the body of `<script>` and
//! `<style>` elements), links and images with a URL scheme outside
//! [`SAFE_SCHEMES`] lose their target, and terminal control sequences are
//! stripped from every piece of text.
//!
//! [`SanitizedDocument`] can only be built by [`sanitize`], so anything that
//! renders one is guaranteed to see cleaned content.

use std::sync::OnceLock;

use regex::Regex;

use crate::markdown::{Block, Document, Inline};

/// URL schemes allowed to stay on links and images. Relative URLs are kept.
pub const SAFE_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Elements whose text content is dropped along with their tags
const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizedDocument {
    blocks: Vec<Block>,
}

impl SanitizedDocument {
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[derive(Default)]
struct Removed {
    html: usize,
    urls: usize,
}

pub fn sanitize(document: Document) -> SanitizedDocument {
    let mut removed = Removed::default();
    let blocks = clean_blocks(document.blocks, &mut removed);

    if removed.html > 0 || removed.urls > 0 {
        tracing::debug!(
            html = removed.html,
            urls = removed.urls,
            "removed unsafe content from answer"
        );
    }

    SanitizedDocument { blocks }
}

/// Whether `url` may be kept as a link or image target
pub fn is_safe_url(url: &str) -> bool {
    match url_scheme(url) {
        Some(scheme) => SAFE_SCHEMES.contains(&scheme.as_str()),
        None => true,
    }
}

/// Remove ANSI escape sequences and control characters other than newline
/// and tab.
pub fn strip_controls(text: &str) -> String {
    static ESCAPES: OnceLock<Regex> = OnceLock::new();
    let escapes = ESCAPES.get_or_init(|| {
        Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)?|\x1b[@-_]?")
            .expect("escape sequence pattern is valid")
    });

    escapes
        .replace_all(text, "")
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

fn url_scheme(url: &str) -> Option<String> {
    // Browsers skip whitespace and control characters inside a scheme, so
    // "java\tscript:" still counts as javascript.
    let compact: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect();
    let colon = compact.find(':')?;
    let candidate = &compact[..colon];
    if candidate.contains(|c| matches!(c, '/' | '?' | '#')) {
        return None;
    }
    Some(candidate.to_ascii_lowercase())
}

fn clean_blocks(blocks: Vec<Block>, removed: &mut Removed) -> Vec<Block> {
    blocks
        .into_iter()
        .filter_map(|block| clean_block(block, removed))
        .collect()
}

fn clean_block(block: Block, removed: &mut Removed) -> Option<Block> {
    match block {
        Block::Html(_) => {
            removed.html += 1;
            None
        }
        Block::Paragraph(inlines) => {
            let inlines = clean_inlines(inlines, removed);
            (!inlines.is_empty()).then_some(Block::Paragraph(inlines))
        }
        Block::Heading { level, content } => Some(Block::Heading {
            level,
            content: clean_inlines(content, removed),
        }),
        Block::CodeBlock { language, code } => Some(Block::CodeBlock {
            language: language.map(|lang| strip_controls(&lang)),
            code: strip_controls(&code),
        }),
        Block::List { start, items } => Some(Block::List {
            start,
            items: items
                .into_iter()
                .map(|item| clean_blocks(item, removed))
                .collect(),
        }),
        Block::Quote(blocks) => Some(Block::Quote(clean_blocks(blocks, removed))),
        Block::Rule => Some(Block::Rule),
    }
}

fn clean_inlines(inlines: Vec<Inline>, removed: &mut Removed) -> Vec<Inline> {
    let mut out = Vec::with_capacity(inlines.len());
    let mut skipping: Option<&'static str> = None;

    for inline in inlines {
        if let Inline::Html(html) = &inline {
            removed.html += 1;
            skipping = match skipping {
                Some(tag) if closes_tag(html, tag) => None,
                Some(tag) => Some(tag),
                None => opens_raw_text_tag(html),
            };
            continue;
        }
        if skipping.is_some() {
            removed.html += 1;
            continue;
        }

        match inline {
            Inline::Text(text) => out.push(Inline::Text(strip_controls(&text))),
            Inline::Code(code) => out.push(Inline::Code(strip_controls(&code))),
            Inline::Emphasis(children) => {
                out.push(Inline::Emphasis(clean_inlines(children, removed)))
            }
            Inline::Strong(children) => out.push(Inline::Strong(clean_inlines(children, removed))),
            Inline::Strikethrough(children) => {
                out.push(Inline::Strikethrough(clean_inlines(children, removed)))
            }
            Inline::Link { url, content } => {
                let content = clean_inlines(content, removed);
                if is_safe_url(&url) {
                    out.push(Inline::Link {
                        url: strip_controls(&url),
                        content,
                    });
                } else {
                    removed.urls += 1;
                    out.extend(content);
                }
            }
            Inline::Image { url, alt } => {
                let url = if is_safe_url(&url) {
                    strip_controls(&url)
                } else {
                    removed.urls += 1;
                    String::new()
                };
                out.push(Inline::Image {
                    url,
                    alt: strip_controls(&alt),
                });
            }
            Inline::SoftBreak | Inline::HardBreak => out.push(inline),
            Inline::Html(_) => {}
        }
    }

    out
}

fn opens_raw_text_tag(html: &str) -> Option<&'static str> {
    let lower = html.trim_start().to_ascii_lowercase();
    RAW_TEXT_TAGS.iter().copied().find(|tag| {
        let Some(rest) = lower.strip_prefix('<').and_then(|s| s.strip_prefix(tag)) else {
            return false;
        };
        let is_tag_name_end = rest
            .chars()
            .next()
            .map_or(true, |c| c == '>' || c == '/' || c.is_whitespace());
        is_tag_name_end && !closes_tag(&lower, tag)
    })
}

fn closes_tag(html: &str, tag: &str) -> bool {
    html.to_ascii_lowercase().contains(&format!("</{}", tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::{parse, plain_text};
    use pretty_assertions::assert_eq;

    fn clean(source: &str) -> SanitizedDocument {
        sanitize(parse(source))
    }

    fn all_text(doc: &SanitizedDocument) -> String {
        fn walk(blocks: &[Block], out: &mut String) {
            for block in blocks {
                match block {
                    Block::Paragraph(inlines) | Block::Heading { content: inlines, .. } => {
                        out.push_str(&plain_text(inlines));
                        for inline in inlines {
                            if let Inline::Link { url, .. } | Inline::Image { url, .. } = inline {
                                out.push_str(url);
                            }
                        }
                    }
                    Block::CodeBlock { code, .. } => out.push_str(code),
                    Block::List { items, .. } => items.iter().for_each(|item| walk(item, out)),
                    Block::Quote(blocks) => walk(blocks, out),
                    Block::Html(html) => out.push_str(html),
                    Block::Rule => {}
                }
                out.push('\n');
            }
        }
        let mut out = String::new();
        walk(doc.blocks(), &mut out);
        out
    }

    #[test]
    fn script_block_is_removed() {
        let doc = clean("Before\n\n<script>\nalert('x')\n</script>\n\nAfter");
        let text = all_text(&doc);
        assert!(!text.contains("script"));
        assert!(!text.contains("alert"));
        assert!(text.contains("Before") && text.contains("After"));
    }

    #[test]
    fn inline_script_body_is_removed() {
        let doc = clean("Hi <script>steal(document.cookie)</script> there");
        assert_eq!(
            doc.blocks(),
            &[Block::Paragraph(vec![
                Inline::Text("Hi ".to_string()),
                Inline::Text(" there".to_string()),
            ])]
        );
    }

    #[test]
    fn inline_style_body_is_removed() {
        let doc = clean("Plain <style>body { display: none }</style>text");
        assert_eq!(
            doc.blocks(),
            &[Block::Paragraph(vec![
                Inline::Text("Plain ".to_string()),
                Inline::Text("text".to_string()),
            ])]
        );
    }

    #[test]
    fn event_handler_attribute_is_removed() {
        let doc = clean("look <img src=x onerror=\"alert(1)\"> here");
        let text = all_text(&doc);
        assert!(!text.contains("onerror"));
        assert!(!text.contains("<img"));
    }

    #[test]
    fn paragraph_of_only_html_disappears() {
        let doc = clean("<b onclick=\"x()\">");
        assert!(doc.is_empty());
    }

    #[test]
    fn javascript_link_keeps_text_only() {
        let doc = clean("[click me](javascript:alert(1))");
        assert_eq!(
            doc.blocks(),
            &[Block::Paragraph(vec![Inline::Text("click me".to_string())])]
        );
    }

    #[test]
    fn scheme_detection_ignores_case_and_whitespace() {
        assert!(!is_safe_url("JaVaScRiPt:alert(1)"));
        assert!(!is_safe_url(" java\tscript:alert(1)"));
        assert!(!is_safe_url("data:text/html;base64,PHNjcmlwdD4="));
        assert!(!is_safe_url("vbscript:msgbox"));
    }

    #[test]
    fn ordinary_urls_are_kept() {
        assert!(is_safe_url("https://lora-alliance.org/resource-hub"));
        assert!(is_safe_url("http://localhost:8000/chat"));
        assert!(is_safe_url("mailto:ops@example.com"));
        assert!(is_safe_url("/docs/adr"));
        assert!(is_safe_url("docs/page?a=b:c"));
        assert!(is_safe_url("#section"));
    }

    #[test]
    fn unsafe_image_loses_url() {
        let doc = clean("![diagram](javascript:alert(1))");
        assert_eq!(
            doc.blocks(),
            &[Block::Paragraph(vec![Inline::Image {
                url: String::new(),
                alt: "diagram".to_string(),
            }])]
        );
    }

    #[test]
    fn terminal_escapes_are_stripped() {
        assert_eq!(strip_controls("\x1b[31mred\x1b[0m"), "red");
        assert_eq!(strip_controls("\x1b]0;pwned\x07title"), "title");
        assert_eq!(strip_controls("bell\x07 and\u{9b}2J c1"), "bell and2J c1");
        assert_eq!(strip_controls("keep\nlines\tand tabs"), "keep\nlines\tand tabs");
    }

    #[test]
    fn code_blocks_are_stripped_but_kept() {
        let doc = clean("```\nat+join\x1b[2J\n```");
        assert_eq!(
            doc.blocks(),
            &[Block::CodeBlock {
                language: None,
                code: "at+join".to_string(),
            }]
        );
    }

    #[test]
    fn nested_content_is_cleaned() {
        let doc = clean("> - [bad](javascript:x) <script>x</script>ok");
        let text = all_text(&doc);
        assert!(text.contains("bad"));
        assert!(text.contains("ok"));
        assert!(!text.contains("javascript"));
        assert!(!text.contains("script"));
    }
}
