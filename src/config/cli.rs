use crate::app::report_export::ReportFormat;
use crate::domain::model::TeamRow;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "workerly")]
#[command(about = "Remaining work reports and workspace administration for Azure DevOps")]
#[command(version)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, short, global = true, env = "WORKERLY_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, short, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Remaining work per team below a work item
    RemainingWork(ReportArgs),
    /// Reported time per team on a work item
    ReportingInfo(ReportArgs),
    #[command(subcommand)]
    Users(UsersCommand),
    #[command(subcommand)]
    Workspaces(WorkspacesCommand),
    #[command(subcommand)]
    Connection(ConnectionCommand),
    #[command(subcommand)]
    Teams(TeamsCommand),
    #[command(subcommand)]
    Snapshots(SnapshotsCommand),
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[arg(long)]
    pub work_item: i64,

    /// Use this workspace's connection and teams instead of the configured service connection
    #[arg(long)]
    pub workspace: Option<Uuid>,

    /// Requesting user; must be a member of `--workspace`
    #[arg(long, requires = "workspace")]
    pub user: Option<Uuid>,

    #[arg(long, default_value_t = ReportFormat::Json)]
    pub format: ReportFormat,

    /// Write the report to a file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    /// Record a user so they can be invited by email
    Register {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        email: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum WorkspacesCommand {
    List {
        #[arg(long)]
        user: Uuid,
    },
    Create {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        name: String,
    },
    Select {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        workspace: Uuid,
    },
    Invite {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        workspace: Uuid,
        #[arg(long)]
        email: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConnectionCommand {
    Set {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        workspace: Uuid,
        #[arg(long)]
        organization: String,
        #[arg(long, env = "WORKERLY_PAT", hide_env_values = true)]
        pat: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum TeamsCommand {
    Show {
        #[arg(long)]
        workspace: Uuid,
    },
    /// Replace the team mapping, one `--team "Name=member1,member2"` per team
    Set {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        workspace: Uuid,
        #[arg(long = "team", value_parser = parse_team_row)]
        teams: Vec<TeamRow>,
    },
}

#[derive(Debug, Subcommand)]
pub enum SnapshotsCommand {
    List {
        #[arg(long)]
        workspace: Uuid,
        #[arg(long)]
        work_item: i64,
    },
}

fn parse_team_row(value: &str) -> Result<TeamRow, String> {
    let (team, members) = value.split_once('=').unwrap_or((value, ""));
    if team.trim().is_empty() {
        return Err(format!("'{}' has no team name; expected Name=member1,member2", value));
    }
    Ok(TeamRow {
        team: team.trim().to_string(),
        members_csv: Some(members.to_string()),
    })
}
