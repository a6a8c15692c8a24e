//! Members panel: manage header, ranked roster and pagination.
//!
//! [`roster_view`] derives everything shown from the controller alone;
//! [`RosterPanel`] only draws that view.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Widget},
};

use roster_core::{Address, CompetitionIndex, LoadState, RosterController};

use crate::theme::{self, Theme};

pub const TITLE: &str = "Members";
pub const LOADING: &str = "Loading members...";
pub const EMPTY: &str = "No members";

/// State of a row's remove control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveControl {
    Hidden,
    Enabled,
    /// Shown but inert while another removal is in flight.
    Disabled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub rank: usize,
    pub address: Address,
    pub pnl: f64,
    pub remove: RemoveControl,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Loading,
    Failed(String),
    Empty,
    Rows(Vec<RowView>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderView {
    pub is_leader: bool,
    pub competition: CompetitionIndex,
    pub member_count: usize,
    pub max_team_size: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationView {
    pub page: u32,
    pub page_count: u32,
    pub previous_enabled: bool,
    pub next_enabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RosterView {
    pub header: Option<HeaderView>,
    pub body: Body,
    pub pagination: Option<PaginationView>,
}

pub fn roster_view(controller: &RosterController) -> RosterView {
    let team = controller.team();

    let header = controller.show_manage_controls().then(|| HeaderView {
        is_leader: controller.account().is_some_and(|a| team.is_leader(a)),
        competition: team.competition_index(),
        member_count: team.members().len(),
        max_team_size: controller.competition().and_then(|c| c.max_team_size),
    });

    let (members, state) = controller.roster();
    let body = match state {
        LoadState::Loading => Body::Loading,
        LoadState::Failed(message) => Body::Failed(message.clone()),
        LoadState::Ready if members.is_empty() => Body::Empty,
        LoadState::Ready => Body::Rows(
            controller
                .rows()
                .into_iter()
                .map(|row| RowView {
                    rank: row.rank,
                    address: row.stat.address.clone(),
                    pnl: row.stat.pnl,
                    remove: match (row.removable, controller.is_removing()) {
                        (false, _) => RemoveControl::Hidden,
                        (true, false) => RemoveControl::Enabled,
                        (true, true) => RemoveControl::Disabled,
                    },
                })
                .collect(),
        ),
    };

    let p = controller.pagination();
    let pagination = p.shows_controls().then(|| PaginationView {
        page: p.page(),
        page_count: p.page_count(),
        previous_enabled: p.has_previous(),
        next_enabled: p.has_next(),
    });

    RosterView {
        header,
        body,
        pagination,
    }
}

pub fn format_pnl(pnl: f64) -> String {
    format!("{pnl:+.2}")
}

pub struct RosterPanel<'a> {
    view: &'a RosterView,
    selected: usize,
    cards: bool,
    theme: &'a Theme,
}

impl<'a> RosterPanel<'a> {
    pub fn new(view: &'a RosterView, selected: usize, cards: bool, theme: &'a Theme) -> Self {
        Self {
            view,
            selected,
            cards,
            theme,
        }
    }

    fn header_lines(&self, header: &HeaderView) -> Vec<Line<'static>> {
        let size = match header.max_team_size {
            Some(max) => format!("{}/{max} members", header.member_count),
            None => format!("{} members", header.member_count),
        };
        let summary = Line::from(vec![
            Span::styled("Manage team", theme::accent_bold()),
            Span::styled(
                format!("  competition #{}  {size}", header.competition),
                theme::muted(),
            ),
        ]);
        let hints = if header.is_leader {
            "[x] remove member  [r] refresh"
        } else {
            "Registration open  [r] refresh"
        };
        vec![summary, Line::from(Span::styled(hints, theme::muted()))]
    }

    fn status_message(&self) -> Option<(String, Style)> {
        match &self.view.body {
            Body::Loading => Some((LOADING.to_string(), theme::muted())),
            Body::Failed(message) => Some((
                format!("Failed to load members: {message}"),
                theme::negative(),
            )),
            Body::Empty => Some((EMPTY.to_string(), theme::muted())),
            Body::Rows(_) => None,
        }
    }

    fn remove_cell(&self, control: RemoveControl) -> Cell<'static> {
        match control {
            RemoveControl::Hidden => Cell::from(""),
            RemoveControl::Enabled => Cell::from("Remove").style(theme::control(true)),
            RemoveControl::Disabled => Cell::from("Remove").style(theme::control(false)),
        }
    }

    fn render_table(&self, area: Rect, buf: &mut Buffer) {
        let header = Row::new(["Team Rank", "Address", "PnL", ""].map(|h| {
            Cell::from(h).style(
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            )
        }))
        .height(1);

        let rows: Vec<Row> = match (&self.view.body, self.status_message()) {
            (Body::Rows(rows), _) => rows
                .iter()
                .enumerate()
                .map(|(i, row)| {
                    let style = if i == self.selected {
                        theme::selected_row()
                    } else {
                        Style::default().fg(self.theme.text_primary)
                    };
                    Row::new(vec![
                        Cell::from(format!("#{}", row.rank)),
                        Cell::from(row.address.to_string()),
                        Cell::from(format_pnl(row.pnl))
                            .style(Style::default().fg(self.theme.pnl_color(row.pnl))),
                        self.remove_cell(row.remove),
                    ])
                    .style(style)
                })
                .collect(),
            (_, Some((message, style))) => vec![Row::new(vec![
                Cell::from(""),
                Cell::from(message).style(style),
            ])],
            (_, None) => Vec::new(),
        };

        let widths = [
            Constraint::Length(10),
            Constraint::Length(44),
            Constraint::Length(14),
            Constraint::Length(8),
        ];
        Table::new(rows, widths)
            .header(header)
            .column_spacing(1)
            .render(area, buf);
    }

    fn render_cards(&self, area: Rect, buf: &mut Buffer) {
        let mut lines: Vec<Line> = Vec::new();
        match (&self.view.body, self.status_message()) {
            (Body::Rows(rows), _) => {
                for (i, row) in rows.iter().enumerate() {
                    let title_style = if i == self.selected {
                        theme::selected_row()
                    } else {
                        theme::accent_bold()
                    };
                    let mut title = vec![Span::styled(row.address.shorten(12), title_style)];
                    match row.remove {
                        RemoveControl::Hidden => {}
                        RemoveControl::Enabled => {
                            title.push(Span::styled("  Remove", theme::control(true)))
                        }
                        RemoveControl::Disabled => {
                            title.push(Span::styled("  Remove", theme::control(false)))
                        }
                    }
                    lines.push(Line::from(title));
                    lines.push(Line::from(vec![
                        Span::styled("  PnL  ", theme::muted()),
                        Span::styled(format_pnl(row.pnl), theme::pnl(row.pnl)),
                        Span::styled(format!("   #{}", row.rank), theme::muted()),
                    ]));
                }
            }
            (_, Some((message, style))) => lines.push(Line::from(Span::styled(message, style))),
            (_, None) => {}
        }
        Paragraph::new(lines).render(area, buf);
    }

    fn pagination_line(p: &PaginationView) -> Line<'static> {
        Line::from(vec![
            Span::styled("< Previous", theme::control(p.previous_enabled)),
            Span::styled(format!("   Page {}/{}   ", p.page, p.page_count), theme::muted()),
            Span::styled("Next >", theme::control(p.next_enabled)),
        ])
    }
}

impl Widget for RosterPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(format!(" {TITLE} "))
            .title_style(theme::accent_bold())
            .borders(Borders::ALL)
            .border_style(theme::panel_border(true))
            .style(Style::default().bg(self.theme.background));
        let inner = block.inner(area);
        block.render(area, buf);

        let header_height = if self.view.header.is_some() { 3 } else { 0 };
        let pagination_height = if self.view.pagination.is_some() { 1 } else { 0 };
        let [header_area, body_area, pagination_area] = Layout::vertical([
            Constraint::Length(header_height),
            Constraint::Min(1),
            Constraint::Length(pagination_height),
        ])
        .areas(inner);

        if let Some(header) = &self.view.header {
            Paragraph::new(self.header_lines(header)).render(header_area, buf);
        }

        if self.cards {
            self.render_cards(body_area, buf);
        } else {
            self.render_table(body_area, buf);
        }

        if let Some(p) = &self.view.pagination {
            Paragraph::new(Self::pagination_line(p)).render(pagination_area, buf);
        }
    }
}
