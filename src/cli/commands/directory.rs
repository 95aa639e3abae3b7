use anyhow::Result;

use super::{Backend, BackendOptions};
use crate::workflow::{Role, RoleSet};

pub struct GrantCommand {
    pub options: BackendOptions,
    pub uid: String,
    pub roles: Vec<String>,
}

impl GrantCommand {
    pub async fn execute(&self) -> Result<()> {
        let roles = self
            .roles
            .iter()
            .map(|r| r.parse::<Role>())
            .collect::<Result<Vec<_>, _>>()?;
        let backend = Backend::open(&self.options).await?;
        let result = backend.grant(&self.uid, &roles).await;
        backend.close().await;
        result?;
        println!(
            "✅ Granted {} to {}",
            roles.into_iter().collect::<RoleSet>(),
            self.uid
        );
        Ok(())
    }
}

pub struct JoinCommand {
    pub options: BackendOptions,
    pub uid: String,
    pub group: String,
}

impl JoinCommand {
    pub async fn execute(&self) -> Result<()> {
        let group = self.group.trim().to_ascii_uppercase();
        crate::workflow::sequence::validate_prefix(&group)?;
        let backend = Backend::open(&self.options).await?;
        let result = backend.join(&self.uid, &group).await;
        backend.close().await;
        result?;
        println!("✅ {} joined group {}", self.uid, group);
        Ok(())
    }
}

pub struct SummaryCommand {
    pub options: BackendOptions,
    pub uid: String,
}

impl SummaryCommand {
    pub async fn execute(&self) -> Result<()> {
        let backend = Backend::open(&self.options).await?;
        let result = backend.tracker.summary(&self.uid).await;
        backend.close().await;
        let summary = result?;
        println!("📊 Workload for {}", summary.uid);
        println!("   Waiting on you: {}", summary.assigned);
        println!("   Open items:     {}", summary.open);
        Ok(())
    }
}
