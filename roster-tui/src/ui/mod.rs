//! Top-level UI layout: members panel with a status bar underneath.

pub mod overlays;
pub mod roster_panel;
pub mod status_bar;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};

use crate::app::{AppState, Overlay};
use crate::theme::Theme;

use roster_panel::{RosterPanel, roster_view};

pub fn draw(f: &mut Frame, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(f.area());

    let main_area = chunks[0];
    let status_area = chunks[1];

    let view = roster_view(&app.controller);
    let theme = Theme::default();
    let cards = app.layout.use_cards(main_area.width);
    f.render_widget(RosterPanel::new(&view, app.cursor, cards, &theme), main_area);

    status_bar::render(f, status_area, app);

    match &app.overlay {
        Overlay::Welcome => overlays::render_welcome(f, main_area, app.demo),
        Overlay::Help => overlays::render_help(f, main_area),
        Overlay::ErrorHistory => overlays::render_error_history(f, main_area, app),
        Overlay::ConfirmRemove(member) => overlays::render_confirm_remove(f, main_area, member),
        Overlay::None => {}
    }
}

/// Compute a centered rect for overlays.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let [_, middle, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(area);

    let [_, center, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(middle);
    center
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{Terminal, backend::TestBackend};

    use crate::app::tests::{harness, select_non_leader};

    fn screen(app: &AppState, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        let buf = terminal.backend().buffer();
        (0..height)
            .map(|y| (0..width).map(|x| buf[(x, y)].symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn centered_rect_is_inside_area() {
        let area = Rect::new(0, 0, 100, 50);
        let popup = centered_rect(60, 40, area);
        assert_eq!(popup.width, 60);
        assert_eq!(popup.height, 20);
        assert_eq!((popup.x, popup.y), (20, 15));
    }

    #[test]
    fn draws_members_and_status() {
        let h = harness(3, true);
        let text = screen(&h.app, 100, 20);
        assert!(text.contains("Members"));
        assert!(text.contains("Team Rank"));
        assert!(text.contains("q:Quit"));
    }

    #[test]
    fn narrow_terminal_uses_cards() {
        let h = harness(3, true);
        let text = screen(&h.app, 50, 20);
        assert!(!text.contains("Team Rank"));
        assert!(text.contains("PnL"));
    }

    #[test]
    fn confirmation_overlay_names_member() {
        let mut h = harness(3, true);
        select_non_leader(&mut h);
        h.app.request_removal();
        let Overlay::ConfirmRemove(member) = &h.app.overlay else {
            panic!("expected confirmation overlay");
        };
        let text = screen(&h.app, 120, 30);
        assert!(text.contains("Remove member"));
        assert!(text.contains("Remove this member from the team?"));
        assert!(text.contains(&member.address.to_string()));
    }
}
