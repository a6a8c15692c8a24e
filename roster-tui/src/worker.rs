//! Background worker thread. Every collaborator call runs here.
//!
//! The UI thread sends [`WorkerCommand`]s and drains [`WorkerResponse`]s each
//! tick. Commands run one at a time in arrival order, so a removal's receipt
//! wait holds back later page loads until it resolves.

use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::{debug, info};

use roster_core::controller::execute;
use roster_core::{
    Address, ChainId, Collaborators, CompetitionIndex, RosterOutcome, RosterRequest, SourceError,
    Team,
};

/// Commands sent from the TUI to the worker.
#[derive(Debug)]
pub enum WorkerCommand {
    Execute(RosterRequest),
    RefreshTeam {
        competition_index: CompetitionIndex,
        leader: Address,
    },
    Shutdown,
}

/// Responses sent from the worker back to the TUI.
#[derive(Debug)]
pub enum WorkerResponse {
    Outcome(RosterOutcome),
    TeamRefreshed(Result<Option<Team>, SourceError>),
}

/// Spawn the background worker thread.
pub fn spawn_worker(
    rx: Receiver<WorkerCommand>,
    tx: Sender<WorkerResponse>,
    collaborators: Collaborators,
    chain: ChainId,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name("roster-worker".into())
        .spawn(move || worker_loop(rx, tx, collaborators, chain))
        .expect("failed to spawn worker thread")
}

fn worker_loop(
    rx: Receiver<WorkerCommand>,
    tx: Sender<WorkerResponse>,
    collaborators: Collaborators,
    chain: ChainId,
) {
    info!(?collaborators, %chain, "worker started");
    loop {
        match rx.recv() {
            Ok(WorkerCommand::Shutdown) | Err(_) => break,
            Ok(cmd) => handle_command(cmd, &tx, &collaborators, chain),
        }
    }
    info!("worker stopped");
}

fn handle_command(
    cmd: WorkerCommand,
    tx: &Sender<WorkerResponse>,
    collaborators: &Collaborators,
    chain: ChainId,
) {
    match cmd {
        WorkerCommand::Execute(request) => {
            debug!(?request, "executing");
            execute(collaborators, chain, request, &mut |outcome| {
                let _ = tx.send(WorkerResponse::Outcome(outcome));
            });
        }
        WorkerCommand::RefreshTeam {
            competition_index,
            leader,
        } => {
            let result = collaborators.teams.team(chain, competition_index, &leader);
            let _ = tx.send(WorkerResponse::TeamRefreshed(result));
        }
        WorkerCommand::Shutdown => {} // handled in loop
    }
}
