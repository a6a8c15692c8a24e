//! Application state. Single owner, main thread only.
//!
//! The roster controller lives here. Requests it emits go to the worker;
//! responses come back through [`AppState::handle_response`].

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, Sender};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use roster_core::controller::LoadTarget;
use roster_core::{
    MemberStat, RemovalError, RosterController, RosterEvent, RosterRequest, SourceError, Team,
    TxHash,
};

use crate::worker::{WorkerCommand, WorkerResponse};

const ERROR_HISTORY_CAP: usize = 50;

/// Below this width the roster falls back to cards.
pub const COMPACT_WIDTH: u16 = 72;

/// Status message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub timestamp: DateTime<Local>,
    pub category: ErrorCategory,
    pub message: String,
    pub context: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Chain,
    Removal,
    Other,
}

impl ErrorCategory {
    pub fn label(self) -> &'static str {
        match self {
            ErrorCategory::Network => "NET",
            ErrorCategory::Chain => "CHAIN",
            ErrorCategory::Removal => "TX",
            ErrorCategory::Other => "ERR",
        }
    }
}

/// A submitted transaction still waiting for its receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTxn {
    pub tx: TxHash,
    pub message: String,
    pub submitted_at: DateTime<Local>,
}

/// How the roster body is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LayoutMode {
    /// Table when wide, cards when narrow.
    #[default]
    Auto,
    Table,
    Cards,
}

impl LayoutMode {
    pub fn next(self) -> Self {
        match self {
            LayoutMode::Auto => LayoutMode::Table,
            LayoutMode::Table => LayoutMode::Cards,
            LayoutMode::Cards => LayoutMode::Auto,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LayoutMode::Auto => "auto",
            LayoutMode::Table => "table",
            LayoutMode::Cards => "cards",
        }
    }

    pub fn use_cards(self, width: u16) -> bool {
        match self {
            LayoutMode::Auto => width < COMPACT_WIDTH,
            LayoutMode::Table => false,
            LayoutMode::Cards => true,
        }
    }
}

/// Which overlay (if any) is shown on top.
#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    None,
    Welcome,
    Help,
    ErrorHistory,
    ConfirmRemove(MemberStat),
}

pub struct AppState {
    pub running: bool,
    pub controller: RosterController,
    /// Row under the cursor on the current page.
    pub cursor: usize,
    pub layout: LayoutMode,
    pub demo: bool,

    pub worker_tx: Sender<WorkerCommand>,
    pub worker_rx: Receiver<WorkerResponse>,

    pub status_message: Option<(String, StatusLevel)>,
    pub error_history: VecDeque<ErrorRecord>,
    pub error_scroll: usize,
    pub overlay: Overlay,
    pub pending_txns: Vec<PendingTxn>,
}

impl AppState {
    pub fn new(
        controller: RosterController,
        worker_tx: Sender<WorkerCommand>,
        worker_rx: Receiver<WorkerResponse>,
        demo: bool,
    ) -> Self {
        Self {
            running: true,
            controller,
            cursor: 0,
            layout: LayoutMode::Auto,
            demo,
            worker_tx,
            worker_rx,
            status_message: None,
            error_history: VecDeque::with_capacity(ERROR_HISTORY_CAP),
            error_scroll: 0,
            overlay: Overlay::None,
            pending_txns: Vec::new(),
        }
    }

    /// Kick off the controller's initial loads.
    pub fn start(&mut self) {
        let requests = self.controller.start();
        self.dispatch(requests);
    }

    fn dispatch(&mut self, requests: impl IntoIterator<Item = RosterRequest>) {
        for request in requests {
            self.send(WorkerCommand::Execute(request));
        }
    }

    fn send(&mut self, command: WorkerCommand) {
        if self.worker_tx.send(command).is_err() {
            self.push_error(
                ErrorCategory::Other,
                "background worker stopped".into(),
                "worker channel closed".into(),
            );
        }
    }

    pub fn handle_response(&mut self, response: WorkerResponse) {
        match response {
            WorkerResponse::Outcome(outcome) => {
                let follow_up = self.controller.apply(outcome);
                self.dispatch(follow_up);
            }
            WorkerResponse::TeamRefreshed(result) => self.on_team_refreshed(result),
        }
        self.process_events();
        self.clamp_cursor();
    }

    fn on_team_refreshed(&mut self, result: Result<Option<Team>, SourceError>) {
        match result {
            Ok(Some(team)) => {
                debug!(members = team.members().len(), "team snapshot refreshed");
                let request = self.controller.replace_team(team);
                self.dispatch(request);
            }
            Ok(None) => self.set_warning("Team no longer exists"),
            Err(e) => self.push_error(
                ErrorCategory::Network,
                format!("Failed to refresh team: {e}"),
                self.controller.team().leader_address().to_string(),
            ),
        }
    }

    /// Turn controller notifications into status, history and team refreshes.
    pub fn process_events(&mut self) {
        for event in self.controller.drain_events() {
            match event {
                RosterEvent::MembersChanged => {
                    let team = self.controller.team();
                    let command = WorkerCommand::RefreshTeam {
                        competition_index: team.competition_index(),
                        leader: team.leader_address().clone(),
                    };
                    self.send(command);
                }
                RosterEvent::RemovalSubmitted { tx, message, .. } => {
                    self.pending_txns.push(PendingTxn {
                        tx,
                        message: message.clone(),
                        submitted_at: Local::now(),
                    });
                    self.set_status(message);
                }
                RosterEvent::RemovalConfirmed { member, tx, message } => {
                    self.pending_txns.retain(|p| p.tx != tx);
                    self.set_status(format!("{message} {}", member.shorten(12)));
                }
                RosterEvent::RemovalFailed(error) => {
                    self.on_removal_failed(error);
                }
                RosterEvent::LoadFailed { target, message } => {
                    let category = match target {
                        LoadTarget::AccountTeam => ErrorCategory::Chain,
                        LoadTarget::Competition | LoadTarget::Roster => ErrorCategory::Network,
                    };
                    self.push_error(category, message, format!("loading {target}"));
                }
            }
        }
    }

    fn on_removal_failed(&mut self, error: RemovalError) {
        // Only one removal runs at a time, so any pending entry belongs to it.
        self.pending_txns.clear();
        let context = match &error {
            RemovalError::Reverted { tx } => format!("tx {tx}"),
            _ => "member removal".to_string(),
        };
        warn!(%error, "member removal failed");
        self.push_error(
            ErrorCategory::Removal,
            format!("User removal failed: {error}"),
            context,
        );
    }

    pub fn selected_member(&self) -> Option<&MemberStat> {
        self.controller.roster().0.get(self.cursor)
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.controller.roster().0.len();
        if len == 0 {
            self.cursor = 0;
            return;
        }
        self.cursor = self.cursor.saturating_add_signed(delta).min(len - 1);
    }

    fn clamp_cursor(&mut self) {
        let len = self.controller.roster().0.len();
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }

    pub fn next_page(&mut self) {
        if let Some(request) = self.controller.next_page() {
            self.cursor = 0;
            self.dispatch([request]);
        }
    }

    pub fn prev_page(&mut self) {
        if let Some(request) = self.controller.prev_page() {
            self.cursor = 0;
            self.dispatch([request]);
        }
    }

    pub fn refresh(&mut self) {
        let request = self.controller.revalidate();
        self.dispatch([request]);
        self.process_events();
        self.set_status("Refreshing members...");
    }

    /// Ask for confirmation before removing the member under the cursor.
    pub fn request_removal(&mut self) {
        let Some(member) = self.selected_member().cloned() else {
            return;
        };
        if self.controller.is_removing() {
            self.set_warning("A member removal is already in progress");
            return;
        }
        if !self.controller.can_remove(&member) {
            self.set_warning("You cannot remove this member");
            return;
        }
        self.overlay = Overlay::ConfirmRemove(member);
    }

    pub fn confirm_removal(&mut self, member: &MemberStat) {
        self.overlay = Overlay::None;
        match self.controller.remove_member(member) {
            Ok(request) => {
                self.dispatch([request]);
                self.set_status(format!("Removing {}...", member.address.shorten(12)));
            }
            Err(e) => self.set_warning(e.to_string()),
        }
    }

    pub fn cycle_layout(&mut self) {
        self.layout = self.layout.next();
        self.set_status(format!("Layout: {}", self.layout.label()));
    }

    /// Push an error to the history, capping at 50.
    pub fn push_error(&mut self, category: ErrorCategory, message: String, context: String) {
        let record = ErrorRecord {
            timestamp: Local::now(),
            category,
            message: message.clone(),
            context,
        };
        self.error_history.push_front(record);
        if self.error_history.len() > ERROR_HISTORY_CAP {
            self.error_history.pop_back();
        }
        self.status_message = Some((message, StatusLevel::Error));
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Info));
    }

    pub fn set_warning(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Warning));
    }
}
