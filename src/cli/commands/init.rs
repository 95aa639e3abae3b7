use anyhow::Result;

use super::{Backend, BackendOptions};

pub struct InitCommand {
    pub options: BackendOptions,
    pub write_config: bool,
}

impl InitCommand {
    pub async fn execute(&self) -> Result<()> {
        if self.options.in_memory {
            println!("ℹ️  In-memory store needs no initialization");
            return Ok(());
        }

        let target = self
            .options
            .database_url
            .clone()
            .or_else(|| {
                let database = self.options.config.database.as_ref();
                database.map(|db| db.url.clone())
            })
            .unwrap_or_default();
        println!("🔄 Preparing {}...", target);

        let backend = Backend::open(&self.options).await?;
        let result = backend.migrate().await;
        backend.close().await;
        result?;
        println!("✅ Database ready");

        if self.write_config {
            let mut config = self.options.config.clone();
            if let (Some(url), Some(db)) = (&self.options.database_url, config.database.as_mut()) {
                db.url = url.clone();
            }
            config.save_to_file("voxelflow.toml")?;
            println!("📝 Wrote voxelflow.toml");
        }
        Ok(())
    }
}
