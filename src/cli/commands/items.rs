use anyhow::Result;

use super::{print_item, print_relation, Backend, BackendOptions};
use crate::workflow::{ItemChanges, ItemDraft, ListQuery, WorkItemKind};

pub struct CreateCommand {
    pub options: BackendOptions,
    pub kind: String,
    pub draft: ItemDraft,
    pub actor: String,
}

impl CreateCommand {
    pub async fn execute(&self) -> Result<()> {
        let kind: WorkItemKind = self.kind.parse()?;
        println!("🔄 Creating {} '{}'...", kind, self.draft.title);
        let backend = Backend::open(&self.options).await?;
        let result = backend
            .tracker
            .create(kind, self.draft.clone(), &self.actor)
            .await;
        backend.close().await;
        let item = result?;
        println!("✅ Created {}", item.code);
        print_item(&item);
        Ok(())
    }
}

pub struct UpdateCommand {
    pub options: BackendOptions,
    pub code: String,
    pub changes: ItemChanges,
    pub actor: String,
}

impl UpdateCommand {
    pub async fn execute(&self) -> Result<()> {
        let backend = Backend::open(&self.options).await?;
        let result = backend
            .tracker
            .update(&self.code, self.changes.clone(), &self.actor)
            .await;
        backend.close().await;
        let item = result?;
        println!("✅ Updated {}", item.code);
        print_item(&item);
        Ok(())
    }
}

pub struct ShowCommand {
    pub options: BackendOptions,
    pub code: String,
    pub json: bool,
}

impl ShowCommand {
    pub async fn execute(&self) -> Result<()> {
        let backend = Backend::open(&self.options).await?;
        let result = backend.tracker.locate(&self.code).await;
        backend.close().await;
        let item = result?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&item)?);
        } else {
            print_item(&item);
        }
        Ok(())
    }
}

pub struct ListCommand {
    pub options: BackendOptions,
    pub kind: String,
    pub query: ListQuery,
}

impl ListCommand {
    pub async fn execute(&self) -> Result<()> {
        let kind: WorkItemKind = self.kind.parse()?;
        let backend = Backend::open(&self.options).await?;
        let result = backend.tracker.list(kind, &self.query).await;
        backend.close().await;
        let page = result?;

        if page.items.is_empty() {
            println!("📭 No {} items match", kind);
            return Ok(());
        }
        println!(
            "📋 {} {} item(s), page {}/{}",
            page.total,
            kind,
            page.page_num,
            page.total_pages()
        );
        for item in &page.items {
            let priority = item
                .priority
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "   {:<10} {:<22} {:>3}  {}",
                item.code, item.status, priority, item.title
            );
        }
        Ok(())
    }
}

pub struct HistoryCommand {
    pub options: BackendOptions,
    pub code: String,
    pub json: bool,
}

impl HistoryCommand {
    pub async fn execute(&self) -> Result<()> {
        let backend = Backend::open(&self.options).await?;
        let result = backend.tracker.history(&self.code).await;
        backend.close().await;
        let relations = result?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&relations)?);
            return Ok(());
        }
        if relations.is_empty() {
            println!("📭 {} has no operator history", self.code);
            return Ok(());
        }
        println!("📜 Operator history for {}", self.code);
        for relation in &relations {
            print_relation(relation);
        }
        Ok(())
    }
}
