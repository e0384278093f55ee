//! Markdown parsing for assistant answers
//!
//! This is the first of two rendering stages: it turns the raw answer into an
//! owned [`Document`] tree and keeps everything the source contains, raw HTML
//! included. Nothing produced here is safe to display until it has passed
//! through [`crate::sanitize::sanitize`].

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Vec<Inline>),
    Heading { level: u8, content: Vec<Inline> },
    CodeBlock { language: Option<String>, code: String },
    /// `start` is set for ordered lists
    List { start: Option<u64>, items: Vec<Vec<Block>> },
    Quote(Vec<Block>),
    Rule,
    Html(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Code(String),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Link { url: String, content: Vec<Inline> },
    Image { url: String, alt: String },
    Html(String),
    SoftBreak,
    HardBreak,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

pub fn parse(source: &str) -> Document {
    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let mut builder = TreeBuilder::new();
    for event in Parser::new_ext(source, options) {
        builder.event(event);
    }
    builder.finish()
}

/// Concatenated text of a run of inlines, without markup
pub fn plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    collect_text(inlines, &mut out);
    out
}

fn collect_text(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(text) | Inline::Code(text) => out.push_str(text),
            Inline::Emphasis(children)
            | Inline::Strong(children)
            | Inline::Strikethrough(children)
            | Inline::Link {
                content: children, ..
            } => collect_text(children, out),
            Inline::Image { alt, .. } => out.push_str(alt),
            Inline::SoftBreak | Inline::HardBreak => out.push(' '),
            Inline::Html(_) => {}
        }
    }
}

enum Container {
    Root,
    Item,
    Quote,
}

enum SpanKind {
    Paragraph,
    Heading(u8),
    Emphasis,
    Strong,
    Strikethrough,
    Link(String),
    Image(String),
}

enum Frame {
    /// Block container. `loose` collects inline content of tight list items,
    /// which pulldown-cmark emits without a paragraph around it.
    Blocks {
        container: Container,
        blocks: Vec<Block>,
        loose: Vec<Inline>,
    },
    List {
        start: Option<u64>,
        items: Vec<Vec<Block>>,
    },
    Inlines {
        kind: SpanKind,
        inlines: Vec<Inline>,
    },
    Code {
        language: Option<String>,
        code: String,
    },
}

impl Frame {
    fn blocks(container: Container) -> Self {
        Frame::Blocks {
            container,
            blocks: Vec::new(),
            loose: Vec::new(),
        }
    }

    fn inlines(kind: SpanKind) -> Self {
        Frame::Inlines {
            kind,
            inlines: Vec::new(),
        }
    }
}

struct TreeBuilder {
    stack: Vec<Frame>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![Frame::blocks(Container::Root)],
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.open(tag),
            Event::End(tag) => {
                if opens_frame(&tag) {
                    self.close();
                }
            }
            Event::Text(text) => match self.stack.last_mut() {
                Some(Frame::Code { code, .. }) => code.push_str(&text),
                _ => self.push_inline(Inline::Text(text.into_string())),
            },
            Event::Code(code) => self.push_inline(Inline::Code(code.into_string())),
            Event::Html(html) => {
                let inline_context = match self.stack.last() {
                    Some(Frame::Inlines { .. }) => true,
                    Some(Frame::Blocks { loose, .. }) => !loose.is_empty(),
                    _ => false,
                };
                if inline_context {
                    self.push_inline(Inline::Html(html.into_string()));
                } else {
                    self.push_block(Block::Html(html.into_string()));
                }
            }
            Event::SoftBreak => self.push_inline(Inline::SoftBreak),
            Event::HardBreak => self.push_inline(Inline::HardBreak),
            Event::Rule => self.push_block(Block::Rule),
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                self.push_inline(Inline::Text(marker.to_string()));
            }
            Event::FootnoteReference(label) => {
                self.push_inline(Inline::Text(format!("[^{}]", label)));
            }
        }
    }

    fn open(&mut self, tag: Tag<'_>) {
        let frame = match tag {
            Tag::Paragraph => Frame::inlines(SpanKind::Paragraph),
            Tag::Heading(level, _, _) => Frame::inlines(SpanKind::Heading(heading_level(level))),
            Tag::BlockQuote => Frame::blocks(Container::Quote),
            Tag::CodeBlock(kind) => Frame::Code {
                language: match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(|lang| lang.to_string()),
                    CodeBlockKind::Indented => None,
                },
                code: String::new(),
            },
            Tag::List(start) => Frame::List {
                start,
                items: Vec::new(),
            },
            Tag::Item => Frame::blocks(Container::Item),
            Tag::Emphasis => Frame::inlines(SpanKind::Emphasis),
            Tag::Strong => Frame::inlines(SpanKind::Strong),
            Tag::Strikethrough => Frame::inlines(SpanKind::Strikethrough),
            Tag::Link(_, url, _) => Frame::inlines(SpanKind::Link(url.into_string())),
            Tag::Image(_, url, _) => Frame::inlines(SpanKind::Image(url.into_string())),
            _ => return,
        };

        if matches!(
            frame,
            Frame::Blocks { .. } | Frame::List { .. } | Frame::Code { .. }
        ) || matches!(
            frame,
            Frame::Inlines {
                kind: SpanKind::Paragraph | SpanKind::Heading(_),
                ..
            }
        ) {
            self.flush_loose();
        }
        self.stack.push(frame);
    }

    fn close(&mut self) {
        if self.stack.len() <= 1 {
            return;
        }
        let Some(frame) = self.stack.pop() else {
            return;
        };

        match frame {
            Frame::Inlines { kind, inlines } => match kind {
                SpanKind::Paragraph => self.push_block(Block::Paragraph(inlines)),
                SpanKind::Heading(level) => self.push_block(Block::Heading {
                    level,
                    content: inlines,
                }),
                SpanKind::Emphasis => self.push_inline(Inline::Emphasis(inlines)),
                SpanKind::Strong => self.push_inline(Inline::Strong(inlines)),
                SpanKind::Strikethrough => self.push_inline(Inline::Strikethrough(inlines)),
                SpanKind::Link(url) => self.push_inline(Inline::Link {
                    url,
                    content: inlines,
                }),
                SpanKind::Image(url) => self.push_inline(Inline::Image {
                    url,
                    alt: plain_text(&inlines),
                }),
            },
            Frame::Blocks {
                container,
                mut blocks,
                loose,
            } => {
                if !loose.is_empty() {
                    blocks.push(Block::Paragraph(loose));
                }
                match container {
                    Container::Item => {
                        if let Some(Frame::List { items, .. }) = self.stack.last_mut() {
                            items.push(blocks);
                        }
                    }
                    Container::Quote => self.push_block(Block::Quote(blocks)),
                    Container::Root => {}
                }
            }
            Frame::List { start, items } => self.push_block(Block::List { start, items }),
            Frame::Code { language, code } => self.push_block(Block::CodeBlock {
                language,
                code: code.trim_end_matches('\n').to_string(),
            }),
        }
    }

    fn flush_loose(&mut self) {
        if let Some(Frame::Blocks { blocks, loose, .. }) = self.stack.last_mut() {
            if !loose.is_empty() {
                blocks.push(Block::Paragraph(std::mem::take(loose)));
            }
        }
    }

    fn push_block(&mut self, block: Block) {
        self.flush_loose();
        match self.stack.last_mut() {
            Some(Frame::Blocks { blocks, .. }) => blocks.push(block),
            _ => tracing::debug!(?block, "dropping block outside of a block container"),
        }
    }

    fn push_inline(&mut self, inline: Inline) {
        match self.stack.last_mut() {
            Some(Frame::Inlines { inlines, .. }) => inlines.push(inline),
            Some(Frame::Blocks { loose, .. }) => loose.push(inline),
            _ => {}
        }
    }

    fn finish(mut self) -> Document {
        while self.stack.len() > 1 {
            self.close();
        }
        match self.stack.pop() {
            Some(Frame::Blocks {
                mut blocks, loose, ..
            }) => {
                if !loose.is_empty() {
                    blocks.push(Block::Paragraph(loose));
                }
                Document { blocks }
            }
            _ => Document::default(),
        }
    }
}

fn opens_frame(tag: &Tag<'_>) -> bool {
    matches!(
        tag,
        Tag::Paragraph
            | Tag::Heading(..)
            | Tag::BlockQuote
            | Tag::CodeBlock(_)
            | Tag::List(_)
            | Tag::Item
            | Tag::Emphasis
            | Tag::Strong
            | Tag::Strikethrough
            | Tag::Link(..)
            | Tag::Image(..)
    )
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    #[test]
    fn heading_and_paragraph() {
        let doc = parse("## Gateways\n\nA **gateway** forwards *frames*.");
        assert_eq!(
            doc.blocks,
            vec![
                Block::Heading {
                    level: 2,
                    content: vec![text("Gateways")],
                },
                Block::Paragraph(vec![
                    text("A "),
                    Inline::Strong(vec![text("gateway")]),
                    text(" forwards "),
                    Inline::Emphasis(vec![text("frames")]),
                    text("."),
                ]),
            ]
        );
    }

    #[test]
    fn tight_list_items_get_paragraphs() {
        let doc = parse("1. join\n2. uplink\n");
        assert_eq!(
            doc.blocks,
            vec![Block::List {
                start: Some(1),
                items: vec![
                    vec![Block::Paragraph(vec![text("join")])],
                    vec![Block::Paragraph(vec![text("uplink")])],
                ],
            }]
        );
    }

    #[test]
    fn nested_list_follows_item_text() {
        let doc = parse("- classes\n  - A\n  - B\n");
        let Block::List { items, .. } = &doc.blocks[0] else {
            panic!("expected list, got {:?}", doc.blocks);
        };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0][0], Block::Paragraph(vec![text("classes")]));
        assert!(matches!(items[0][1], Block::List { start: None, .. }));
    }

    #[test]
    fn fenced_code_keeps_language_and_text() {
        let doc = parse("```rust\nlet sf = 7;\n```\n");
        assert_eq!(
            doc.blocks,
            vec![Block::CodeBlock {
                language: Some("rust".to_string()),
                code: "let sf = 7;".to_string(),
            }]
        );
    }

    #[test]
    fn raw_html_is_kept_for_the_sanitizer() {
        let doc = parse("<script>alert(1)</script>\n\nok <img src=x onerror=alert(1)>");
        assert!(matches!(&doc.blocks[0], Block::Html(html) if html.contains("<script>")));
        let Block::Paragraph(inlines) = &doc.blocks[doc.blocks.len() - 1] else {
            panic!("expected paragraph, got {:?}", doc.blocks);
        };
        assert!(inlines
            .iter()
            .any(|i| matches!(i, Inline::Html(html) if html.contains("onerror"))));
    }

    #[test]
    fn link_and_image_keep_urls() {
        let doc = parse("[spec](https://lora-alliance.org) ![map](map.png)");
        let Block::Paragraph(inlines) = &doc.blocks[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(
            inlines[0],
            Inline::Link {
                url: "https://lora-alliance.org".to_string(),
                content: vec![text("spec")],
            }
        );
        assert_eq!(
            inlines[2],
            Inline::Image {
                url: "map.png".to_string(),
                alt: "map".to_string(),
            }
        );
    }

    #[test]
    fn task_markers_become_text() {
        let doc = parse("- [x] done\n- [ ] todo\n");
        assert_eq!(plain_text_of_first_item(&doc), "[x] done");
    }

    fn plain_text_of_first_item(doc: &Document) -> String {
        match &doc.blocks[0] {
            Block::List { items, .. } => match &items[0][0] {
                Block::Paragraph(inlines) => plain_text(inlines),
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn empty_input_gives_empty_document() {
        assert_eq!(parse(""), Document::default());
    }
}
