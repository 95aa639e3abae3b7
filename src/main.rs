use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use voxelflow::cli::commands::{
    BackendOptions, CancelCommand, CreateCommand, DecideCommand, DecisionKind, DelegateCommand,
    GrantCommand, HistoryCommand, InitCommand, JoinCommand, ListCommand, ShowCommand,
    SummaryCommand, UpdateCommand,
};
use voxelflow::cli::{Cli, Commands};
use voxelflow::workflow::{ItemChanges, ItemDraft, ListQuery};
use voxelflow::{config, init_telemetry, workflow_metrics, VoxelflowConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_file = VoxelflowConfig::load_env_file();
    let settings = match &cli.config {
        Some(path) => VoxelflowConfig::load_from(Some(path.as_path()))?,
        None => config()?.clone(),
    };
    init_telemetry(&settings.observability)?;
    match env_file {
        Ok(true) => info!("Loaded environment variables from .env file"),
        Ok(false) => {}
        Err(err) => warn!("Ignoring unreadable .env file: {err}"),
    }

    let options = BackendOptions {
        database_url: cli.database.clone(),
        in_memory: cli.in_memory,
        config: settings,
    };

    let Some(command) = cli.command else {
        println!("voxelflow: approval workflow tracker. Run 'voxelflow --help' for commands.");
        return Ok(());
    };

    let outcome = match command {
        Commands::Init { write_config } => {
            InitCommand {
                options,
                write_config,
            }
            .execute()
            .await
        }
        Commands::Grant { uid, roles } => GrantCommand { options, uid, roles }.execute().await,
        Commands::Join { uid, group } => JoinCommand { options, uid, group }.execute().await,
        Commands::Create {
            kind,
            title,
            description,
            priority,
            requirement_type,
            req_code,
            actor,
        } => {
            let mut draft = ItemDraft::new(title).description(description);
            if let Some(p) = priority {
                draft = draft.priority(p);
            }
            if let Some(t) = requirement_type {
                draft = draft.requirement_type(t);
            }
            if let Some(r) = req_code {
                draft = draft.req_code(r);
            }
            CreateCommand {
                options,
                kind,
                draft,
                actor,
            }
            .execute()
            .await
        }
        Commands::Show { code, json } => ShowCommand { options, code, json }.execute().await,
        Commands::List {
            kind,
            title,
            status,
            priority,
            page,
            page_size,
            order_by,
            order_dir,
        } => {
            let query = ListQuery {
                title,
                status,
                priority,
                page_num: page,
                page_size,
                order_by,
                order_dir,
            };
            ListCommand {
                options,
                kind,
                query,
            }
            .execute()
            .await
        }
        Commands::Update {
            code,
            title,
            description,
            priority,
            requirement_type,
            req_code,
            actor,
        } => {
            let changes = ItemChanges {
                title,
                description,
                priority,
                requirement_type,
                req_code,
            };
            UpdateCommand {
                options,
                code,
                changes,
                actor,
            }
            .execute()
            .await
        }
        Commands::Approve {
            code,
            next,
            reason,
            actor,
        } => {
            DecideCommand {
                options,
                kind: DecisionKind::Approve,
                code,
                next_operators: next,
                reason,
                actor,
            }
            .execute()
            .await
        }
        Commands::Reject {
            code,
            next,
            reason,
            actor,
        } => {
            DecideCommand {
                options,
                kind: DecisionKind::Reject,
                code,
                next_operators: next,
                reason,
                actor,
            }
            .execute()
            .await
        }
        Commands::Cancel {
            code,
            reason,
            actor,
        } => {
            CancelCommand {
                options,
                code,
                reason,
                actor,
            }
            .execute()
            .await
        }
        Commands::Assign {
            code,
            assignee,
            actor,
        } => {
            DelegateCommand {
                options,
                code,
                assignee,
                actor,
                withdraw: false,
            }
            .execute()
            .await
        }
        Commands::Unassign {
            code,
            assignee,
            actor,
        } => {
            DelegateCommand {
                options,
                code,
                assignee,
                actor,
                withdraw: true,
            }
            .execute()
            .await
        }
        Commands::History { code, json } => HistoryCommand { options, code, json }.execute().await,
        Commands::Summary { actor } => SummaryCommand { options, uid: actor }.execute().await,
    };

    workflow_metrics().log_stats();
    outcome
}
