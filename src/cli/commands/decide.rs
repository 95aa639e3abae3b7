use anyhow::Result;

use super::{print_decision, Backend, BackendOptions};
use crate::workflow::{Decision, WorkflowError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionKind {
    Approve,
    Reject,
}

pub struct DecideCommand {
    pub options: BackendOptions,
    pub kind: DecisionKind,
    pub code: String,
    pub next_operators: Vec<String>,
    pub reason: String,
    pub actor: String,
}

impl DecideCommand {
    pub async fn execute(&self) -> Result<()> {
        let backend = Backend::open(&self.options).await?;
        let result = match self.kind {
            DecisionKind::Approve => {
                backend
                    .tracker
                    .approve(&self.code, &self.next_operators, &self.reason, &self.actor)
                    .await
            }
            DecisionKind::Reject => {
                backend
                    .tracker
                    .reject(&self.code, &self.next_operators, &self.reason, &self.actor)
                    .await
            }
        };
        backend.close().await;
        report(result)
    }
}

pub struct CancelCommand {
    pub options: BackendOptions,
    pub code: String,
    pub reason: String,
    pub actor: String,
}

impl CancelCommand {
    pub async fn execute(&self) -> Result<()> {
        let backend = Backend::open(&self.options).await?;
        let result = backend
            .tracker
            .cancel(&self.code, &self.reason, &self.actor)
            .await;
        backend.close().await;
        report(result)
    }
}

fn report(result: Result<Decision<String>, WorkflowError>) -> Result<()> {
    match result {
        Ok(decision) => {
            print_decision(&decision);
            Ok(())
        }
        Err(e) if e.is_retryable() => {
            println!("⚠️  Someone else acted on this item first; check its status and retry");
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}
