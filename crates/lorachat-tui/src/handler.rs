use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::App;
use crate::tui::AppEvent;

const WHEEL_LINES: u16 = 3;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
        AppEvent::QueryFinished(completion) => app.finish_query(completion),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Windows reports both press and release
    if key.kind == KeyEventKind::Release {
        return;
    }

    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Enter => app.submit(),

        // Conversation scrolling
        KeyCode::Up => app.scroll.scroll_up(1),
        KeyCode::Down => app.scroll.scroll_down(1),
        KeyCode::PageUp => app.scroll.scroll_half_page_up(),
        KeyCode::PageDown => app.scroll.scroll_half_page_down(),

        KeyCode::Home if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll.scroll_to_top()
        }
        KeyCode::End if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll.scroll_to_bottom()
        }

        // Input editing
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Backspace => app.delete_before_cursor(),
        KeyCode::Delete => app.delete_at_cursor(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => app.insert_char(c),

        _ => {}
    }
}

fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll.scroll_down(WHEEL_LINES),
        MouseEventKind::ScrollUp => app.scroll.scroll_up(WHEEL_LINES),
        _ => {}
    }
}
