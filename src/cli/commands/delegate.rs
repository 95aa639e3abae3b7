use anyhow::Result;

use super::{Backend, BackendOptions};

/// Assign, or with `withdraw` set, unassign the current step
pub struct DelegateCommand {
    pub options: BackendOptions,
    pub code: String,
    pub assignee: String,
    pub actor: String,
    pub withdraw: bool,
}

impl DelegateCommand {
    pub async fn execute(&self) -> Result<()> {
        let backend = Backend::open(&self.options).await?;
        let result = if self.withdraw {
            backend
                .tracker
                .unassign(&self.code, &self.assignee, &self.actor)
                .await
        } else {
            backend
                .tracker
                .assign(&self.code, &self.assignee, &self.actor)
                .await
        };
        backend.close().await;

        match (self.withdraw, result?) {
            (false, true) => println!("🎯 {} now waits on {}", self.code, self.assignee),
            (false, false) => println!("ℹ️  {} already waits on {}", self.code, self.assignee),
            (true, true) => println!("↩️  {} no longer waits on {}", self.code, self.assignee),
            (true, false) => {
                println!(
                    "ℹ️  {} had no pending delegation for {}",
                    self.code, self.assignee
                )
            }
        }
        Ok(())
    }
}
