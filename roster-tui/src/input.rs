//! Keyboard input dispatch: overlays first, then roster keys.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::app::{AppState, Overlay};

pub fn handle_key(app: &mut AppState, key: KeyEvent) {
    // Only handle key press events (Windows sends both Press and Release).
    if key.kind != KeyEventKind::Press {
        return;
    }

    match &app.overlay {
        Overlay::Welcome | Overlay::Help => {
            app.overlay = Overlay::None;
            return;
        }
        Overlay::ErrorHistory => {
            handle_error_overlay(app, key);
            return;
        }
        Overlay::ConfirmRemove(member) => {
            let member = member.clone();
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => app.confirm_removal(&member),
                KeyCode::Char('n') | KeyCode::Esc | KeyCode::Char('q') => {
                    app.overlay = Overlay::None;
                }
                _ => {}
            }
            return;
        }
        Overlay::None => {}
    }

    match key.code {
        KeyCode::Char('q') => app.running = false,
        KeyCode::Char('j') | KeyCode::Down => app.move_cursor(1),
        KeyCode::Char('k') | KeyCode::Up => app.move_cursor(-1),
        KeyCode::Char('l') | KeyCode::Char('n') | KeyCode::Right => app.next_page(),
        KeyCode::Char('h') | KeyCode::Char('p') | KeyCode::Left => app.prev_page(),
        KeyCode::Char('x') | KeyCode::Delete => app.request_removal(),
        KeyCode::Char('r') => app.refresh(),
        KeyCode::Char('c') => app.cycle_layout(),
        KeyCode::Char('e') => {
            app.error_scroll = 0;
            app.overlay = Overlay::ErrorHistory;
        }
        KeyCode::Char('?') => app.overlay = Overlay::Help,
        _ => {}
    }
}

fn handle_error_overlay(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('e') => {
            app.overlay = Overlay::None;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            if app.error_scroll + 1 < app.error_history.len() {
                app.error_scroll += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.error_scroll = app.error_scroll.saturating_sub(1);
        }
        _ => {}
    }
}
