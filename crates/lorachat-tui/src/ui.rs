use lorachat_core::{markdown, sanitize, Message, Sender};
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame,
};

use crate::app::App;
use crate::rich_text;

pub const TITLE: &str = "LoRa Chatbot: Intelligent Conversations for IoT Networks";
const EMPTY_HINT: &str = "Ask a question about LoRa and LoRaWAN networks to get started.";
const INPUT_PLACEHOLDER: &str = "Type your message...";

pub fn render(app: &mut App, frame: &mut Frame) {
    // Main layout: header, conversation, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    render_header(app, frame, header_area);
    render_conversation(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

/// Lines for the whole conversation plus the typing indicator
pub fn conversation_lines(
    messages: &[Message],
    pending: bool,
    animation_frame: u8,
) -> Vec<Line<'static>> {
    if messages.is_empty() && !pending {
        return vec![Line::from(Span::styled(
            EMPTY_HINT,
            Style::default().fg(Color::DarkGray),
        ))];
    }

    let mut lines: Vec<Line<'static>> = messages.iter().flat_map(message_lines).collect();

    if pending {
        lines.push(sender_label(Sender::Ai));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat(animation_frame as usize + 1);
        lines.push(Line::from(Span::styled(
            format!("Assistant is typing{}", dots),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

/// Lines for one message, followed by a blank separator line.
///
/// User text is shown literally. Assistant text is parsed as markdown and
/// sanitized before it is styled.
pub fn message_lines(message: &Message) -> Vec<Line<'static>> {
    let mut lines = vec![sender_label(message.sender)];

    match message.sender {
        Sender::User => {
            let style = Style::default().fg(Color::Cyan);
            lines.extend(
                message
                    .content
                    .split('\n')
                    .map(|line| Line::from(Span::styled(line.to_string(), style)).alignment(Alignment::Right)),
            );
        }
        Sender::Ai => {
            let document = sanitize(markdown::parse(&message.content));
            lines.extend(rich_text::document_lines(&document));
        }
    }

    lines.push(Line::default());
    lines
}

fn sender_label(sender: Sender) -> Line<'static> {
    match sender {
        Sender::User => Line::from(Span::styled(
            format!("{} ●", sender.display_name()),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Right),
        Sender::Ai => Line::from(Span::styled(
            format!("◆ {}", sender.display_name()),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(format!(" {} ", TITLE), Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.endpoint.clone(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_conversation(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue))
        .title(" Conversation ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let lines = conversation_lines(
        app.chat.messages(),
        app.chat.is_pending(),
        app.animation_frame,
    );
    let paragraph = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });

    // Pin after layout so the offset accounts for wrapped lines
    let content_lines = paragraph.line_count(inner.width);
    let offset = app
        .scroll
        .sync(app.chat.messages().len(), content_lines, inner.height);

    frame.render_widget(paragraph.scroll((offset, 0)), inner);

    if app.scroll.max_offset() > 0 {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(None)
            .end_symbol(None);
        let mut scrollbar_state =
            ScrollbarState::new(app.scroll.max_offset() as usize).position(offset as usize);
        frame.render_stateful_widget(scrollbar, area, &mut scrollbar_state);
    }
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let pending = app.chat.is_pending();
    let (border_color, title) = if pending {
        (Color::DarkGray, " Waiting for the answer... ")
    } else {
        (Color::Yellow, " Message ")
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Calculate visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let input = if app.chat.input.is_empty() {
        Paragraph::new(Span::styled(
            INPUT_PLACEHOLDER,
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let visible_text: String = app
            .chat
            .input
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        let text_color = if pending { Color::DarkGray } else { Color::Cyan };
        Paragraph::new(visible_text).style(Style::default().fg(text_color))
    };

    frame.render_widget(input.block(input_block), area);

    if inner_width > 0 {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = if app.chat.is_pending() {
        (" WAITING ", Style::default().bg(Color::Yellow).fg(Color::Black))
    } else {
        (" READY ", Style::default().bg(Color::Blue).fg(Color::White))
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let send_label = if app.chat.can_submit() {
        " send "
    } else {
        " send (disabled) "
    };

    let footer_content = Line::from(vec![
        Span::styled(mode_text, mode_style),
        Span::styled(" ", label_style),
        Span::styled(" Enter ", key_style),
        Span::styled(send_label, label_style),
        Span::styled(" ↑/↓ ", key_style),
        Span::styled(" scroll ", label_style),
        Span::styled(" PgUp/PgDn ", key_style),
        Span::styled(" page ", label_style),
        Span::styled(" Esc ", key_style),
        Span::styled(" quit ", label_style),
    ]);

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}
