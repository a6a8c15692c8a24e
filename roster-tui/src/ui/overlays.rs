//! Overlay widgets: welcome, help, error history and removal confirmation.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Modifier;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use roster_core::MemberStat;

use crate::app::AppState;
use crate::theme;
use crate::ui::centered_rect;
use crate::ui::roster_panel::format_pnl;

/// First-run welcome overlay.
pub fn render_welcome(f: &mut Frame, area: Rect, demo: bool) {
    let popup = centered_rect(60, 40, area);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::accent())
        .title(" Team Roster ")
        .title_style(theme::accent_bold());

    let mut text = vec![
        Line::from(""),
        Line::from(Span::styled("Getting started:", theme::accent_bold())),
        Line::from(""),
        Line::from(Span::styled(
            "  1. Move through members with j/k",
            theme::muted(),
        )),
        Line::from(Span::styled("  2. Page with h/l", theme::muted())),
        Line::from(Span::styled(
            "  3. Team leaders remove a member with x",
            theme::muted(),
        )),
    ];
    if demo {
        text.push(Line::from(""));
        text.push(Line::from(Span::styled(
            "Running against a simulated registry.",
            theme::warning(),
        )));
    }
    text.push(Line::from(""));
    text.push(Line::from(Span::styled(
        "Press any key to dismiss...",
        theme::neutral(),
    )));

    let para = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    f.render_widget(para, popup);
}

const HELP: &[(&str, &str)] = &[
    ("j / k", "move cursor"),
    ("h / l", "previous / next page"),
    ("x", "remove selected member"),
    ("r", "refresh members"),
    ("c", "cycle layout (auto, table, cards)"),
    ("e", "error history"),
    ("?", "this help"),
    ("q", "quit"),
];

pub fn render_help(f: &mut Frame, area: Rect) {
    let popup = centered_rect(50, 50, area);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::accent())
        .title(" Keys ")
        .title_style(theme::accent_bold());

    let lines: Vec<Line> = HELP
        .iter()
        .map(|(key, action)| {
            Line::from(vec![
                Span::styled(format!("{key:>7}  "), theme::accent_bold()),
                Span::styled(*action, theme::text()),
            ])
        })
        .collect();

    f.render_widget(Paragraph::new(lines).block(block), popup);
}

/// Error history overlay.
pub fn render_error_history(f: &mut Frame, area: Rect, app: &AppState) {
    let popup = centered_rect(80, 70, area);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::negative())
        .title(format!(
            " Errors ({}) [Esc]close [j/k]scroll ",
            app.error_history.len()
        ))
        .title_style(theme::negative());

    let inner = block.inner(popup);
    f.render_widget(block, popup);

    if app.error_history.is_empty() {
        let text = Paragraph::new(Span::styled("No errors recorded.", theme::muted()));
        f.render_widget(text, inner);
        return;
    }

    let lines: Vec<Line> = app
        .error_history
        .iter()
        .enumerate()
        .skip(app.error_scroll)
        .take(inner.height as usize)
        .flat_map(|(i, err)| {
            let style = if i == app.error_scroll {
                theme::negative().add_modifier(Modifier::BOLD)
            } else {
                theme::muted()
            };
            let mut lines = vec![Line::from(vec![
                Span::styled(
                    format!("[{}] ", err.timestamp.format("%H:%M:%S")),
                    theme::muted(),
                ),
                Span::styled(format!("[{}] ", err.category.label()), theme::warning()),
                Span::styled(err.message.as_str(), style),
            ])];
            if !err.context.is_empty() {
                lines.push(Line::from(vec![
                    Span::raw("  "),
                    Span::styled(err.context.as_str(), theme::muted()),
                ]));
            }
            lines
        })
        .collect();

    f.render_widget(Paragraph::new(lines), inner);
}

pub fn render_confirm_remove(f: &mut Frame, area: Rect, member: &MemberStat) {
    let popup = centered_rect(60, 30, area);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::warning())
        .title(" Remove member [y]confirm [n]cancel ")
        .title_style(theme::warning());

    let text = vec![
        Line::from(""),
        Line::from(Span::styled("Remove this member from the team?", theme::text())),
        Line::from(""),
        Line::from(Span::styled(member.address.to_string(), theme::accent_bold())),
        Line::from(vec![
            Span::styled("PnL ", theme::muted()),
            Span::styled(format_pnl(member.pnl), theme::pnl(member.pnl)),
        ]),
    ];

    let para = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    f.render_widget(para, popup);
}
