//! Bottom status bar: key hints, pending transactions, last status message.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::app::{AppState, StatusLevel};
use crate::theme;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    f.render_widget(Paragraph::new(line(app)), area);
}

fn line(app: &AppState) -> Line<'_> {
    let mut spans: Vec<Span> = Vec::new();

    if app.demo {
        spans.push(Span::styled(" DEMO ", theme::warning()));
    }

    spans.push(Span::styled(
        " j/k:Move h/l:Page x:Remove r:Refresh c:Layout e:Errors ?:Help q:Quit",
        theme::muted(),
    ));

    if !app.pending_txns.is_empty() {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            format!("{} pending", app.pending_txns.len()),
            theme::warning(),
        ));
    }

    if let Some(removal) = app.controller.removal() {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            format!("removing {}", removal.target.address.shorten(12)),
            theme::warning(),
        ));
    }

    if let Some((msg, level)) = &app.status_message {
        spans.push(Span::raw(" | "));
        let style = match level {
            StatusLevel::Info => theme::accent(),
            StatusLevel::Warning => theme::warning(),
            StatusLevel::Error => theme::negative(),
        };
        spans.push(Span::styled(msg.as_str(), style));
    }

    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{harness, select_non_leader};
    use crate::app::{Overlay, PendingTxn};

    fn text(app: &AppState) -> String {
        line(app).spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn demo_tag_and_hints() {
        let h = harness(3, true);
        let text = text(&h.app);
        assert!(text.starts_with(" DEMO "));
        assert!(text.contains("x:Remove"));
        assert!(!text.contains("pending"));
    }

    #[test]
    fn pending_transactions_are_counted() {
        let mut h = harness(3, true);
        h.app.pending_txns.push(PendingTxn {
            tx: format!("0x{:064x}", 1).parse().unwrap(),
            message: "Removing user from team".into(),
            submitted_at: chrono::Local::now(),
        });
        h.app.set_warning("A member removal is already in progress");
        let text = text(&h.app);
        assert!(text.contains("1 pending"));
        assert!(text.ends_with("already in progress"));
    }

    #[test]
    fn in_flight_removal_names_its_target() {
        let mut h = harness(3, true);
        select_non_leader(&mut h);
        h.app.request_removal();
        let Overlay::ConfirmRemove(member) = h.app.overlay.clone() else {
            panic!("expected confirmation overlay");
        };
        h.app.confirm_removal(&member);
        let expected = format!("removing {}", member.address.shorten(12));
        assert!(text(&h.app).contains(&expected));

        h.pump();
        assert!(!text(&h.app).contains(&expected));
    }
}
