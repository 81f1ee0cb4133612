use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;
use workerly::app::report_export::{render_remaining_work, render_reporting_info};
use workerly::app::{SnapshotService, UserService, WorkspaceConfigService, WorkspaceService};
use workerly::config::cli::{
    Cli, Command, ConnectionCommand, ReportArgs, SnapshotsCommand, TeamsCommand, UsersCommand,
    WorkspacesCommand,
};
use workerly::domain::model::{
    InviteUserResult, SaveConnectionResult, SaveTeamsResult, TeamsDefinition, User,
};
use workerly::utils::{logger, validation::Validate};
use workerly::{
    AzureDevOpsClient, DocumentStore, LocalStorage, RemainingWorkEngine, ReportingInfoEngine,
    Result, WorkerlyConfig, WorkerlyError,
};

struct Services {
    users: UserService<LocalStorage>,
    workspaces: WorkspaceService<LocalStorage>,
    configs: WorkspaceConfigService<LocalStorage>,
    snapshots: SnapshotService<LocalStorage>,
}

impl Services {
    fn new(config: &WorkerlyConfig) -> Self {
        let store = Arc::new(DocumentStore::new(LocalStorage::new(&config.storage.data_dir)));
        let containers = &config.storage.containers;
        Self {
            users: UserService::new(Arc::clone(&store), containers),
            workspaces: WorkspaceService::new(Arc::clone(&store), containers),
            configs: WorkspaceConfigService::new(Arc::clone(&store), containers),
            snapshots: SnapshotService::new(store, containers),
        }
    }
}

fn rejected(message: impl Into<String>) -> WorkerlyError {
    WorkerlyError::ProcessingError {
        message: message.into(),
    }
}

async fn emit(content: &str, output: Option<&PathBuf>) -> Result<()> {
    match output {
        Some(path) => {
            tokio::fs::write(path, content).await?;
            tracing::info!("📁 Report saved to: {}", path.display());
        }
        None => println!("{}", content.trim_end()),
    }
    Ok(())
}

/// Client and teams for a report: the workspace's own connection when
/// `--workspace` is given, the configured service connection otherwise.
async fn report_source(
    args: &ReportArgs,
    config: &WorkerlyConfig,
    services: &Services,
) -> Result<(AzureDevOpsClient, TeamsDefinition)> {
    let Some(workspace_id) = args.workspace else {
        let client = config.azure_devops.service_client()?.ok_or_else(|| {
            WorkerlyError::MissingConfigError {
                field: "azure_devops.organization_url/access_token".to_string(),
            }
        })?;
        return Ok((client, config.teams_definition()));
    };

    if let Some(user_id) = args.user {
        if !services.workspaces.is_member(user_id, workspace_id).await? {
            return Err(rejected(format!(
                "User {} is not a member of workspace {}",
                user_id, workspace_id
            )));
        }
    }

    let connection = services
        .configs
        .get(workspace_id)
        .await?
        .filter(|c| c.is_configured())
        .ok_or_else(|| WorkerlyError::MissingConfigError {
            field: format!("workspace {} connection", workspace_id),
        })?;
    let client = AzureDevOpsClient::for_connection(
        &config.azure_devops.base_url,
        &connection,
        config.azure_devops.timeout_seconds,
    )?;
    Ok((client, connection.teams_definition))
}

async fn run(command: Command, config: &WorkerlyConfig) -> Result<()> {
    let services = Services::new(config);

    match command {
        Command::RemainingWork(args) => {
            let (client, teams) = report_source(&args, config, &services).await?;
            let engine =
                RemainingWorkEngine::new(client).with_batch_size(config.azure_devops.batch_size);
            let report = engine
                .compute(args.work_item, &teams)
                .await?
                .ok_or_else(|| rejected(format!("Work item {} not found", args.work_item)))?;
            emit(&render_remaining_work(&report, args.format)?, args.output.as_ref()).await?;
        }
        Command::ReportingInfo(args) => {
            let (client, teams) = report_source(&args, config, &services).await?;
            let engine = ReportingInfoEngine::new(client)
                .with_field_name(config.azure_devops.reporting_info_field.clone());
            let report = engine
                .compute(args.work_item, &teams)
                .await?
                .ok_or_else(|| rejected(format!("Work item {} not found", args.work_item)))?;
            emit(&render_reporting_info(&report, args.format)?, args.output.as_ref()).await?;
        }
        Command::Users(UsersCommand::Register { user, email }) => {
            services.users.ensure_exists(User { id: user, email }).await?;
            println!("✅ User {} registered", user);
        }
        Command::Workspaces(command) => run_workspaces(command, &services).await?,
        Command::Connection(ConnectionCommand::Set {
            user,
            workspace,
            organization,
            pat,
        }) => match services
            .configs
            .upsert_connection(user, workspace, &organization, &pat)
            .await
        {
            SaveConnectionResult::Success => println!("✅ Connection saved"),
            other => return Err(rejected(format!("Connection not saved: {:?}", other))),
        },
        Command::Teams(TeamsCommand::Show { workspace }) => {
            for row in services.configs.get_teams(workspace).await?.to_rows() {
                println!("{}: {}", row.team, row.members_csv.unwrap_or_default());
            }
        }
        Command::Teams(TeamsCommand::Set {
            user,
            workspace,
            teams,
        }) => match services
            .configs
            .save_teams(user, workspace, TeamsDefinition::from_rows(&teams))
            .await
        {
            SaveTeamsResult::Success => println!("✅ Teams saved"),
            other => return Err(rejected(format!("Teams not saved: {:?}", other))),
        },
        Command::Snapshots(SnapshotsCommand::List {
            workspace,
            work_item,
        }) => {
            let history = services.snapshots.list_for_work_item(workspace, work_item).await?;
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
    }

    Ok(())
}

async fn run_workspaces(command: WorkspacesCommand, services: &Services) -> Result<()> {
    match command {
        WorkspacesCommand::List { user } => {
            for workspace in services.workspaces.get_for_user(user).await? {
                let marker = if workspace.is_selected { "*" } else { " " };
                println!("{} {} ({})", marker, workspace.name, workspace.id);
            }
        }
        WorkspacesCommand::Create { user, name } => {
            let id: Uuid = services.workspaces.create(&name, user).await?;
            println!("✅ Workspace created: {}", id);
        }
        WorkspacesCommand::Select { user, workspace } => {
            if !services.workspaces.is_member(user, workspace).await? {
                return Err(rejected(format!(
                    "User {} is not a member of workspace {}",
                    user, workspace
                )));
            }
            services.workspaces.set_selected(user, workspace).await?;
            println!("✅ Workspace {} selected", workspace);
        }
        WorkspacesCommand::Invite {
            user,
            workspace,
            email,
        } => match services
            .workspaces
            .invite_user_by_email(user, workspace, &email)
            .await
        {
            InviteUserResult::Success => println!("✅ {} invited", email.trim()),
            other => return Err(rejected(format!("Invitation failed: {:?}", other))),
        },
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logger::init_cli_logger(cli.verbose);
    tracing::info!("Starting workerly CLI");

    let config = match WorkerlyConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.exit_code().max(1));
        }
    };

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if let Err(e) = run(cli.command, &config).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        std::process::exit(e.exit_code().max(1));
    }

    Ok(())
}
