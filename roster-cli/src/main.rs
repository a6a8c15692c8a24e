//! Team roster CLI: one-shot member listing, removal and visibility checks.
//!
//! Commands:
//! - `members` prints one ranked page as a table, JSON or CSV
//! - `remove` removes a member (the acting account must lead the team)
//! - `visibility` reports whether the manage controls would be shown
//!
//! Without `--live` every command runs against the seeded simulated
//! registry, so removals only last for the lifetime of the process.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use roster_core::controller::drive;
use roster_core::{
    Address, Backend, ChainId, CompetitionIndex, LoadState, MemberStat, RemovalError,
    RosterConfig, RosterController, RosterEvent,
};

#[derive(Parser)]
#[command(name = "roster", about = "Team roster: list, remove and inspect members")]
struct Cli {
    /// Config file (TOML).
    #[arg(long, global = true, default_value = "roster.toml")]
    config: PathBuf,

    /// Query the live indexer instead of the simulated registry.
    #[arg(long, global = true, default_value_t = false)]
    live: bool,

    /// Chain name or numeric id.
    #[arg(long, global = true)]
    chain: Option<ChainId>,

    /// Competition index. Defaults to the chain's current competition.
    #[arg(long, global = true)]
    competition: Option<u64>,

    /// Acting account. Defaults to the team leader in demo mode.
    #[arg(long, global = true)]
    account: Option<Address>,

    /// Leader of the team. Defaults to the first demo team.
    #[arg(long, global = true)]
    leader: Option<Address>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print one page of ranked members.
    Members {
        /// 1-based page number.
        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },
    /// Remove a member from the team.
    Remove {
        /// Address of the member to remove.
        member: Address,
    },
    /// Report whether the manage controls are visible to the account.
    Visibility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Json,
    Csv,
}

/// One printed roster row.
#[derive(Debug, Clone, PartialEq, Serialize)]
struct MemberRow {
    rank: usize,
    address: Address,
    pnl: f64,
    removable: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let mut config = RosterConfig::load(&cli.config)?;
    if cli.live {
        config.indexer.enabled = true;
    }
    if let Some(chain) = cli.chain {
        config.view.chain = chain;
    }
    if let Some(competition) = cli.competition {
        config.view.competition = Some(CompetitionIndex(competition));
    }
    if cli.leader.is_some() {
        config.view.leader = cli.leader.clone();
    }
    if cli.account.is_some() {
        config.view.account = cli.account.clone();
    }

    let backend = config.backend()?;
    let mut controller = mount(&backend, &config)?;
    let mut out = io::stdout().lock();

    match cli.command {
        Commands::Members { page, format } => {
            let rows = members_page(&mut controller, &backend, page)?;
            print_rows(&mut out, &rows, format)?;
        }
        Commands::Remove { member } => {
            let message = remove(&mut controller, &backend, &member)?;
            writeln!(out, "{message}")?;
        }
        Commands::Visibility => {
            writeln!(out, "{}", visibility_report(&controller))?;
        }
    }
    Ok(())
}

/// Build the controller for the configured team and run its initial loads.
fn mount(backend: &Backend, config: &RosterConfig) -> Result<RosterController> {
    let team = backend.resolve_team(config.view.leader.as_ref())?;
    let account = config
        .view
        .account
        .clone()
        .or_else(|| backend.is_demo().then(|| team.leader_address().clone()));
    info!(
        leader = %team.leader_address(),
        competition = %team.competition_index(),
        members = team.members().len(),
        "team resolved"
    );

    let mut controller = RosterController::new(backend.chain, team, account)
        .with_current_competition(Some(backend.competition_index));
    let requests = controller.start();
    drive(&mut controller, &backend.collaborators, requests);
    report_load_failures(&mut controller);
    Ok(controller)
}

fn report_load_failures(controller: &mut RosterController) {
    for event in controller.drain_events() {
        if let RosterEvent::LoadFailed { target, message } = event {
            warn!(%target, %message, "load failed");
        }
    }
}

fn members_page(
    controller: &mut RosterController,
    backend: &Backend,
    page: u32,
) -> Result<Vec<MemberRow>> {
    if page != controller.pagination().page() {
        let Some(request) = controller.set_page(page) else {
            bail!(
                "page {page} out of range (team has {} page(s))",
                controller.pagination().page_count()
            );
        };
        drive(controller, &backend.collaborators, [request]);
        report_load_failures(controller);
    }
    if let (_, LoadState::Failed(message)) = controller.roster() {
        bail!("failed to load members: {message}");
    }
    Ok(rows(controller))
}

fn rows(controller: &RosterController) -> Vec<MemberRow> {
    controller
        .rows()
        .into_iter()
        .map(|row| MemberRow {
            rank: row.rank,
            address: row.stat.address.clone(),
            pnl: row.stat.pnl,
            removable: row.removable,
        })
        .collect()
}

fn print_rows(out: &mut impl Write, rows: &[MemberRow], format: Format) -> Result<()> {
    match format {
        Format::Table => {
            if rows.is_empty() {
                writeln!(out, "No members")?;
                return Ok(());
            }
            writeln!(out, "{:>9}  {:<42}  {:>14}", "Team Rank", "Address", "PnL")?;
            for row in rows {
                let marker = if row.removable { "  removable" } else { "" };
                writeln!(
                    out,
                    "{:>9}  {:<42}  {:>14}{marker}",
                    format!("#{}", row.rank),
                    row.address,
                    format!("{:+.2}", row.pnl),
                )?;
            }
        }
        Format::Json => {
            serde_json::to_writer_pretty(&mut *out, rows)?;
            writeln!(out)?;
        }
        Format::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            for row in rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}

/// Find `address` on any page of the team.
fn find_member(
    controller: &mut RosterController,
    backend: &Backend,
    address: &Address,
) -> Result<MemberStat> {
    if !controller.team().contains(address) {
        bail!("{address} is not a member of this team");
    }
    for page in 1..=controller.pagination().page_count() {
        members_page(controller, backend, page)?;
        if let Some(stat) = controller.roster().0.iter().find(|m| &m.address == address) {
            return Ok(stat.clone());
        }
    }
    bail!("{address} has no stats in this competition")
}

fn remove(
    controller: &mut RosterController,
    backend: &Backend,
    address: &Address,
) -> Result<String> {
    let member = find_member(controller, backend, address)?;
    let request = controller
        .remove_member(&member)
        .with_context(|| format!("cannot remove {address}"))?;
    drive(controller, &backend.collaborators, [request]);

    let mut outcome: Option<Result<String, RemovalError>> = None;
    for event in controller.drain_events() {
        match event {
            RosterEvent::RemovalSubmitted { tx, message, .. } => {
                info!(%tx, "{message}");
            }
            RosterEvent::RemovalConfirmed { member, tx, message } => {
                outcome = Some(Ok(format!("{message}: {member} (tx {tx})")));
            }
            RosterEvent::RemovalFailed(error) => outcome = Some(Err(error)),
            RosterEvent::LoadFailed { target, message } => {
                warn!(%target, %message, "load failed");
            }
            RosterEvent::MembersChanged => {}
        }
    }
    match outcome {
        Some(Ok(message)) => Ok(message),
        Some(Err(error)) => Err(error).context("member removal failed"),
        None => Err(RemovalError::Abandoned).context("member removal failed"),
    }
}

fn visibility_report(controller: &RosterController) -> String {
    let registration = match controller.competition() {
        Some(c) if c.registration_active => "open",
        Some(_) => "closed",
        None => "unknown",
    };
    let account = controller
        .account()
        .map_or_else(|| "none".to_string(), Address::to_string);
    let role = match controller.account() {
        Some(a) if controller.team().is_leader(a) => "leader",
        Some(a) if controller.team().contains(a) => "member",
        Some(_) => "outsider",
        None => "disconnected",
    };
    format!(
        "account: {account} ({role})\nregistration: {registration}\nmanage controls: {}",
        if controller.show_manage_controls() {
            "visible"
        } else {
            "hidden"
        }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_config(members: usize) -> RosterConfig {
        let mut config = RosterConfig::default();
        config.view.competition = Some(CompetitionIndex(0));
        config.demo.teams = 2;
        config.demo.members_per_team = members;
        config
    }

    fn mounted(config: &RosterConfig) -> (Backend, RosterController) {
        let backend = config.backend().unwrap();
        let controller = mount(&backend, config).unwrap();
        (backend, controller)
    }

    #[test]
    fn second_page_continues_ranks() {
        let config = demo_config(7);
        let (backend, mut controller) = mounted(&config);
        let rows = members_page(&mut controller, &backend, 2).unwrap();
        assert_eq!(rows.iter().map(|r| r.rank).collect::<Vec<_>>(), vec![6, 7]);
    }

    #[test]
    fn out_of_range_page_is_an_error() {
        let config = demo_config(3);
        let (backend, mut controller) = mounted(&config);
        let err = members_page(&mut controller, &backend, 4).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn leader_removes_member_in_demo() {
        let config = demo_config(8);
        let (backend, mut controller) = mounted(&config);
        let target = controller.team().members()[7].clone();

        let message = remove(&mut controller, &backend, &target).unwrap();
        assert!(message.contains(&target.to_string()));
        let registry = backend.registry.as_ref().unwrap();
        assert_eq!(registry.remove_calls(), 1);
    }

    #[test]
    fn outsider_cannot_remove() {
        let mut config = demo_config(3);
        config.view.account = Some(format!("0x{:040x}", 5).parse().unwrap());
        let (backend, mut controller) = mounted(&config);
        let target = controller.team().members()[1].clone();

        let err = remove(&mut controller, &backend, &target).unwrap_err();
        assert!(err.to_string().contains("cannot remove"));
        assert_eq!(backend.registry.as_ref().unwrap().remove_calls(), 0);
    }

    #[test]
    fn non_member_is_rejected_before_submission() {
        let config = demo_config(3);
        let (backend, mut controller) = mounted(&config);
        let stranger: Address = format!("0x{:040x}", 6).parse().unwrap();
        assert!(remove(&mut controller, &backend, &stranger).is_err());
        assert_eq!(backend.registry.as_ref().unwrap().remove_calls(), 0);
    }

    #[test]
    fn visibility_for_leader_and_outsider() {
        let config = demo_config(3);
        let (_, controller) = mounted(&config);
        let report = visibility_report(&controller);
        assert!(report.contains("(leader)"));
        assert!(report.contains("manage controls: visible"));

        let mut config = demo_config(3);
        config.demo.registration_active = false;
        let (_, controller) = mounted(&config);
        assert!(visibility_report(&controller).contains("manage controls: hidden"));
    }

    #[test]
    fn csv_and_json_output() {
        let rows = vec![MemberRow {
            rank: 1,
            address: format!("0x{:040x}", 1).parse().unwrap(),
            pnl: 12.5,
            removable: false,
        }];

        let mut csv_out = Vec::new();
        print_rows(&mut csv_out, &rows, Format::Csv).unwrap();
        let csv_text = String::from_utf8(csv_out).unwrap();
        assert!(csv_text.starts_with("rank,address,pnl,removable\n"));
        assert!(csv_text.contains(",12.5,false"));

        let mut json_out = Vec::new();
        print_rows(&mut json_out, &rows, Format::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&json_out).unwrap();
        assert_eq!(parsed[0]["rank"], 1);

        let mut table_out = Vec::new();
        print_rows(&mut table_out, &[], Format::Table).unwrap();
        assert_eq!(String::from_utf8(table_out).unwrap(), "No members\n");
    }
}
