//! Team roster TUI: ranked members of one competition team, with removal
//! for the team leader.
//!
//! Runs against a seeded simulated registry unless `--live` (or
//! `[indexer] enabled = true`) points it at a GraphQL indexer.

mod app;
mod input;
mod persistence;
mod theme;
mod ui;
mod worker;

use std::fs::File;
use std::io::{self, stdout};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, mpsc};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use roster_core::{Address, Backend, ChainId, RosterConfig, RosterController, Team};

use crate::app::AppState;
use crate::worker::WorkerCommand;

#[derive(Parser, Debug)]
#[command(name = "roster-tui", about = "Browse and manage a competition team")]
struct Args {
    /// Config file (TOML). Defaults to the user config directory.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Query the live indexer instead of the simulated registry.
    #[arg(long)]
    live: bool,

    /// Chain name or numeric id.
    #[arg(long)]
    chain: Option<ChainId>,

    /// Connected account.
    #[arg(long)]
    account: Option<Address>,

    /// Leader of the team to show.
    #[arg(long)]
    leader: Option<Address>,
}

fn app_dir(base: Option<PathBuf>) -> PathBuf {
    base.unwrap_or_else(|| PathBuf::from(".")).join("team-roster")
}

fn init_logging(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let file = File::create(dir.join("roster-tui.log"))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Configured leader first, then the team shown last time, then the first
/// demo team.
fn resolve_team(backend: &Backend, leader: Option<&Address>, last: Option<&Address>) -> Result<Team> {
    if let Some(leader) = leader {
        return Ok(backend.resolve_team(Some(leader))?);
    }
    if let Some(last) = last {
        match backend.resolve_team(Some(last)) {
            Ok(team) => return Ok(team),
            Err(e) => warn!(leader = %last, error = %e, "last team unavailable"),
        }
    }
    Ok(backend.resolve_team(None)?)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let state_dir = app_dir(dirs::state_dir().or_else(dirs::data_local_dir));
    init_logging(&state_dir)?;

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| app_dir(dirs::config_dir()).join("config.toml"));
    let mut config = RosterConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if args.live {
        config.indexer.enabled = true;
    }
    if let Some(chain) = args.chain {
        config.view.chain = chain;
    }

    let state_path = app_dir(dirs::config_dir()).join("state.json");
    let persisted = persistence::load(&state_path);

    let backend = config.backend()?;
    let leader = args.leader.as_ref().or(config.view.leader.as_ref());
    let team = resolve_team(&backend, leader, persisted.last_leader.as_ref())?;
    let account = args
        .account
        .or_else(|| config.view.account.clone())
        .or_else(|| backend.is_demo().then(|| team.leader_address().clone()));
    info!(
        chain = %backend.chain,
        competition = %backend.competition_index,
        leader = %team.leader_address(),
        account = ?account,
        demo = backend.is_demo(),
        "starting"
    );

    let controller = RosterController::new(backend.chain, team, account)
        .with_current_competition(Some(backend.competition_index));

    // Install a panic hook that restores the terminal before printing the panic.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stderr(), LeaveAlternateScreen);
        default_hook(info);
    }));

    let (cmd_tx, cmd_rx) = mpsc::channel();
    let (resp_tx, resp_rx) = mpsc::channel();
    let worker_handle = worker::spawn_worker(
        cmd_rx,
        resp_tx,
        backend.collaborators.clone(),
        backend.chain,
    );

    let mut app = AppState::new(controller, cmd_tx.clone(), resp_rx, backend.is_demo());
    persistence::apply(&mut app, &persisted);
    app.start();

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;

    let result = run_app(&mut terminal, &mut app);

    if let Err(e) = persistence::save(&state_path, &persistence::extract(&app)) {
        warn!(error = %e, "failed to save UI state");
    }

    let _ = cmd_tx.send(WorkerCommand::Shutdown);
    let _ = worker_handle.join();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        while let Ok(resp) = app.worker_rx.try_recv() {
            app.handle_response(resp);
        }

        // 50ms poll keeps the UI ticking at ~20 FPS.
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                input::handle_key(app, key);
            }
        }

        if !app.running {
            break;
        }
    }
    Ok(())
}
