//! Styling of sanitized answers into terminal lines
//!
//! Only [`SanitizedDocument`] is accepted here; raw parser output has to go
//! through `lorachat_core::sanitize` first.

use lorachat_core::markdown::plain_text;
use lorachat_core::{Block, Inline, SanitizedDocument};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

const RULE_WIDTH: usize = 40;

pub fn document_lines(document: &SanitizedDocument) -> Vec<Line<'static>> {
    let mut out = Vec::new();
    render_blocks(document.blocks(), &mut out);
    out
}

fn render_blocks(blocks: &[Block], out: &mut Vec<Line<'static>>) {
    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            out.push(Line::default());
        }
        render_block(block, out);
    }
}

fn render_block(block: &Block, out: &mut Vec<Line<'static>>) {
    match block {
        Block::Paragraph(inlines) => out.extend(inline_lines(inlines, Style::default())),
        Block::Heading { level, content } => {
            let style = match level {
                1 => Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                2 => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                _ => Style::default().add_modifier(Modifier::BOLD),
            };
            out.extend(inline_lines(content, style));
        }
        Block::CodeBlock { language, code } => {
            let gutter = Style::default().fg(Color::DarkGray);
            if let Some(language) = language {
                out.push(Line::from(Span::styled(
                    format!("  ╭ {}", language),
                    gutter.add_modifier(Modifier::ITALIC),
                )));
            }
            let code_style = Style::default().fg(Color::Green);
            for line in code.split('\n') {
                out.push(Line::from(vec![
                    Span::styled("  │ ", gutter),
                    Span::styled(line.to_string(), code_style),
                ]));
            }
        }
        Block::List { start, items } => {
            let marker_style = Style::default().fg(Color::Yellow);
            for (n, item) in items.iter().enumerate() {
                let marker = match start {
                    Some(first) => format!("{}. ", first + n as u64),
                    None => "• ".to_string(),
                };
                let indent = " ".repeat(marker.chars().count());

                let mut item_lines = Vec::new();
                render_blocks(item, &mut item_lines);
                if item_lines.is_empty() {
                    item_lines.push(Line::default());
                }
                out.extend(prefixed(
                    item_lines,
                    Span::styled(marker, marker_style),
                    Span::raw(indent),
                ));
            }
        }
        Block::Quote(blocks) => {
            let mut quoted = Vec::new();
            render_blocks(blocks, &mut quoted);
            let bar = Span::styled("│ ", Style::default().fg(Color::DarkGray));
            out.extend(prefixed(quoted, bar.clone(), bar));
        }
        Block::Rule => out.push(Line::from(Span::styled(
            "─".repeat(RULE_WIDTH),
            Style::default().fg(Color::DarkGray),
        ))),
        Block::Html(_) => {}
    }
}

fn prefixed(
    lines: Vec<Line<'static>>,
    first: Span<'static>,
    rest: Span<'static>,
) -> Vec<Line<'static>> {
    lines
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            let prefix = if i == 0 { first.clone() } else { rest.clone() };
            let mut spans = Vec::with_capacity(line.spans.len() + 1);
            spans.push(prefix);
            spans.extend(line.spans);
            Line::from(spans)
        })
        .collect()
}

fn inline_lines(inlines: &[Inline], style: Style) -> Vec<Line<'static>> {
    let mut lines: Vec<Vec<Span<'static>>> = vec![Vec::new()];
    push_inlines(inlines, style, &mut lines);
    lines.into_iter().map(Line::from).collect()
}

fn push_span(lines: &mut [Vec<Span<'static>>], span: Span<'static>) {
    if let Some(current) = lines.last_mut() {
        current.push(span);
    }
}

fn push_inlines(inlines: &[Inline], style: Style, lines: &mut Vec<Vec<Span<'static>>>) {
    for inline in inlines {
        match inline {
            Inline::Text(text) => {
                for (i, part) in text.split('\n').enumerate() {
                    if i > 0 {
                        lines.push(Vec::new());
                    }
                    if !part.is_empty() {
                        push_span(lines, Span::styled(part.to_string(), style));
                    }
                }
            }
            Inline::Code(code) => push_span(
                lines,
                Span::styled(code.clone(), style.fg(Color::Green).bg(Color::Black)),
            ),
            Inline::Emphasis(children) => {
                push_inlines(children, style.add_modifier(Modifier::ITALIC), lines)
            }
            Inline::Strong(children) => {
                push_inlines(children, style.add_modifier(Modifier::BOLD), lines)
            }
            Inline::Strikethrough(children) => {
                push_inlines(children, style.add_modifier(Modifier::CROSSED_OUT), lines)
            }
            Inline::Link { url, content } => {
                let link_style = style.fg(Color::Blue).add_modifier(Modifier::UNDERLINED);
                push_inlines(content, link_style, lines);
                if !url.is_empty() && *url != plain_text(content) {
                    push_span(
                        lines,
                        Span::styled(format!(" ({})", url), Style::default().fg(Color::DarkGray)),
                    );
                }
            }
            Inline::Image { url, alt } => {
                let label = match (alt.is_empty(), url.is_empty()) {
                    (false, false) => format!("[image: {} ({})]", alt, url),
                    (false, true) => format!("[image: {}]", alt),
                    (true, false) => format!("[image ({})]", url),
                    (true, true) => "[image]".to_string(),
                };
                push_span(
                    lines,
                    Span::styled(
                        label,
                        Style::default()
                            .fg(Color::DarkGray)
                            .add_modifier(Modifier::ITALIC),
                    ),
                );
            }
            Inline::SoftBreak => push_span(lines, Span::styled(" ", style)),
            Inline::HardBreak => lines.push(Vec::new()),
            Inline::Html(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lorachat_core::{markdown, sanitize};
    use pretty_assertions::assert_eq;

    fn rendered(source: &str) -> Vec<String> {
        document_lines(&sanitize(markdown::parse(source)))
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn paragraphs_are_separated_by_blank_line() {
        assert_eq!(
            rendered("First line\nstill first.\n\nSecond."),
            vec!["First line still first.", "", "Second."]
        );
    }

    #[test]
    fn lists_get_markers_and_hanging_indent() {
        assert_eq!(
            rendered("- uplink\n- downlink\n\n3. join\n4. ack"),
            vec!["• uplink", "• downlink", "", "3. join", "4. ack"]
        );
    }

    #[test]
    fn code_block_lines_are_kept_verbatim() {
        assert_eq!(
            rendered("```sh\nat+mode=0\n  at+join\n```"),
            vec!["  ╭ sh", "  │ at+mode=0", "  │   at+join"]
        );
    }

    #[test]
    fn quotes_are_prefixed() {
        assert_eq!(rendered("> duty cycle\n> limits"), vec!["│ duty cycle limits"]);
    }

    #[test]
    fn links_show_their_target() {
        assert_eq!(
            rendered("See [the spec](https://lora-alliance.org)."),
            vec!["See the spec (https://lora-alliance.org)."]
        );
    }

    #[test]
    fn strong_text_is_bold() {
        let lines = document_lines(&sanitize(markdown::parse("**Class A** devices")));
        let bold = &lines[0].spans[0];
        assert_eq!(bold.content, "Class A");
        assert!(bold.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn hard_break_starts_new_line() {
        assert_eq!(rendered("one  \ntwo"), vec!["one", "two"]);
    }

    #[test]
    fn unsafe_markup_never_reaches_the_screen() {
        let text = rendered(
            "Hi <script>alert(1)</script>\n\n<img src=x onerror=alert(2)>\n\n[x](javascript:alert(3))",
        )
        .join("\n");
        assert!(!text.contains("script"));
        assert!(!text.contains("onerror"));
        assert!(!text.contains("alert"));
    }
}
