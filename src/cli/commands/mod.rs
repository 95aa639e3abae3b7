pub mod decide;
pub mod delegate;
pub mod directory;
pub mod init;
pub mod items;

pub use decide::{CancelCommand, DecideCommand, DecisionKind};
pub use delegate::DelegateCommand;
pub use directory::{GrantCommand, JoinCommand, SummaryCommand};
pub use init::InitCommand;
pub use items::{CreateCommand, HistoryCommand, ListCommand, ShowCommand, UpdateCommand};

use anyhow::{anyhow, Result};
use std::sync::Arc;

use crate::config::VoxelflowConfig;
#[cfg(feature = "database")]
use crate::database::{DatabaseManager, SqliteStore};
use crate::workflow::{
    status_label, Decision, InMemoryStore, OperatorRelation, Role, WorkItem, WorkflowTracker,
};

/// Where a command reads and writes its work items
#[derive(Debug, Clone, Default)]
pub struct BackendOptions {
    pub database_url: Option<String>,
    pub in_memory: bool,
    pub config: VoxelflowConfig,
}

enum Admin {
    #[cfg(feature = "database")]
    Sqlite(SqliteStore),
    Memory(Arc<InMemoryStore>),
}

/// An opened store plus the tracker running on it
pub struct Backend {
    pub tracker: WorkflowTracker,
    admin: Admin,
    #[cfg(feature = "database")]
    manager: Option<DatabaseManager>,
}

impl Backend {
    pub async fn open(options: &BackendOptions) -> Result<Self> {
        let settings = options.config.engine_settings();
        if options.in_memory {
            let store = Arc::new(InMemoryStore::new());
            return Ok(Self {
                tracker: WorkflowTracker::new(store.clone(), settings),
                admin: Admin::Memory(store),
                #[cfg(feature = "database")]
                manager: None,
            });
        }

        Self::open_sqlite(options).await
    }

    #[cfg(feature = "database")]
    async fn open_sqlite(options: &BackendOptions) -> Result<Self> {
        let mut db = options
            .config
            .database
            .clone()
            .ok_or_else(|| anyhow!("No database configured; pass --database or --in-memory"))?;
        if let Some(url) = &options.database_url {
            db.url = url.clone();
        }
        let manager = DatabaseManager::from_config(&db).await?;
        let store = manager.store();
        let settings = options.config.engine_settings();
        Ok(Self {
            tracker: WorkflowTracker::new(Arc::new(store.clone()), settings),
            admin: Admin::Sqlite(store),
            manager: Some(manager),
        })
    }

    #[cfg(not(feature = "database"))]
    async fn open_sqlite(_options: &BackendOptions) -> Result<Self> {
        Err(anyhow!("Built without database support; pass --in-memory"))
    }

    pub async fn grant(&self, uid: &str, roles: &[Role]) -> Result<()> {
        match &self.admin {
            #[cfg(feature = "database")]
            Admin::Sqlite(store) => {
                for role in roles {
                    store.grant_role(uid, *role).await?;
                }
            }
            Admin::Memory(store) => store.grant_roles(uid, roles).await,
        }
        Ok(())
    }

    pub async fn join(&self, uid: &str, group_code: &str) -> Result<()> {
        match &self.admin {
            #[cfg(feature = "database")]
            Admin::Sqlite(store) => store.set_group(uid, group_code).await?,
            Admin::Memory(store) => store.set_group(uid, group_code).await,
        }
        Ok(())
    }

    /// Apply pending migrations even when the configuration disables auto-migrate
    #[cfg(feature = "database")]
    pub async fn migrate(&self) -> Result<()> {
        if let Some(manager) = &self.manager {
            manager.migrate().await?;
        }
        Ok(())
    }

    #[cfg(not(feature = "database"))]
    pub async fn migrate(&self) -> Result<()> {
        Ok(())
    }

    #[cfg(feature = "database")]
    pub async fn close(self) {
        if let Some(manager) = self.manager {
            manager.close().await;
        }
    }

    #[cfg(not(feature = "database"))]
    pub async fn close(self) {}
}

pub(crate) fn print_item(item: &WorkItem) {
    let label = status_label(item.kind(), &item.status).unwrap_or("?");
    println!("📋 {} [{}] {}", item.code, item.kind(), item.title);
    println!("   Status:   {} ({})", label, item.status);
    if let Some(priority) = item.priority {
        println!("   Priority: {}", priority);
    }
    if let Some(t) = item.details.requirement_type() {
        println!("   Type:     {}", t);
    }
    if let Some(req) = item.details.req_code() {
        println!("   Requirement: {}", req);
    }
    if !item.description.is_empty() {
        println!("   {}", item.description);
    }
    println!(
        "   Created by {} at {}, updated by {} at {}",
        item.audit.created_by,
        item.audit.created_at.format("%Y-%m-%d %H:%M"),
        item.audit.updated_by,
        item.audit.updated_at.format("%Y-%m-%d %H:%M"),
    );
}

pub(crate) fn print_decision(decision: &Decision<String>) {
    if decision.advanced {
        println!("✅ {}: {} → {}", decision.code, decision.from, decision.to);
    } else {
        println!(
            "⏳ {}: approval recorded at {}, waiting on {} more",
            decision.code, decision.from, decision.pending
        );
    }
}

pub(crate) fn print_relation(relation: &OperatorRelation) {
    let outcome = relation.new_status.as_deref().unwrap_or("…");
    print!(
        "   #{:<4} {:<10} {:<12} {} → {}",
        relation.id,
        relation.relation_type.as_str(),
        relation.uid,
        relation.old_status,
        outcome
    );
    match &relation.description {
        Some(d) => println!("  \"{}\"", d),
        None => println!(),
    }
}
