use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::workflow::EngineSettings;

/// Main configuration structure for voxelflow
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VoxelflowConfig {
    /// Database settings (optional)
    pub database: Option<DatabaseConfig>,
    /// Observability settings
    pub observability: ObservabilityConfig,
    /// Workflow engine settings
    pub workflow: WorkflowConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// SQLite connection string
    pub url: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Enable automatic migrations
    pub auto_migrate: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level or filter directive, overridden by RUST_LOG
    pub log_level: String,
    /// Emit JSON log lines instead of plain text
    pub json_logs: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WorkflowConfig {
    /// Page size used when a listing does not ask for one
    pub default_page_size: u32,
    /// Upper bound on any requested page size
    pub max_page_size: u32,
}

impl Default for VoxelflowConfig {
    fn default() -> Self {
        Self {
            database: Some(DatabaseConfig {
                url: "sqlite://voxelflow.db".to_string(),
                max_connections: 5,
                auto_migrate: true,
            }),
            observability: ObservabilityConfig {
                log_level: "warn".to_string(),
                json_logs: false,
            },
            workflow: WorkflowConfig {
                default_page_size: 20,
                max_page_size: 100,
            },
        }
    }
}

impl From<&WorkflowConfig> for EngineSettings {
    fn from(config: &WorkflowConfig) -> Self {
        Self {
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
        }
    }
}

impl VoxelflowConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (voxelflow.toml, .voxelflow-rc)
    /// 3. Environment variables (VOXELFLOW__SECTION__KEY)
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Same as `load`, with an explicit file layered on top of the defaults
    pub fn load_from(explicit: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if Path::new("voxelflow.toml").exists() {
            builder = builder.add_source(File::with_name("voxelflow"));
        }

        if Path::new(".voxelflow-rc").exists() {
            builder = builder.add_source(File::new(".voxelflow-rc", config::FileFormat::Toml));
        }

        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("VOXELFLOW")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings::from(&self.workflow)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load `.env` from the working directory. `Ok(false)` when there is none.
    pub fn load_env_file() -> Result<bool> {
        Self::load_env_file_from(Path::new(".env"))
    }

    pub fn load_env_file_from(path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }
        dotenvy::from_path(path)?;
        Ok(true)
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<VoxelflowConfig, anyhow::Error>> =
    std::sync::LazyLock::new(VoxelflowConfig::load);

/// Get the global configuration
pub fn config() -> Result<&'static VoxelflowConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voxelflow.toml");

        let mut original = VoxelflowConfig::default();
        original.workflow.max_page_size = 250;
        original.save_to_file(&path).unwrap();

        let loaded = VoxelflowConfig::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.workflow.max_page_size, 250);
        assert_eq!(loaded.engine_settings().default_page_size, 20);
        assert!(loaded.database.is_some());
    }

    #[test]
    fn test_explicit_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[observability]\nlog_level = \"debug\"\njson_logs = true\n",
        )
        .unwrap();

        let loaded = VoxelflowConfig::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.observability.log_level, "debug");
        assert!(loaded.observability.json_logs);
        assert_eq!(loaded.workflow, VoxelflowConfig::default().workflow);
    }

    #[test]
    fn test_env_file_loading_reports_what_happened() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.env");
        assert!(!VoxelflowConfig::load_env_file_from(&missing).unwrap());

        let good = dir.path().join("good.env");
        std::fs::write(&good, "VOXELFLOW_DOTENV_TEST_MARKER=loaded\n").unwrap();
        assert!(VoxelflowConfig::load_env_file_from(&good).unwrap());
        assert_eq!(
            std::env::var("VOXELFLOW_DOTENV_TEST_MARKER").as_deref(),
            Ok("loaded")
        );

        let broken = dir.path().join("broken.env");
        std::fs::write(&broken, "THIS LINE HAS NO EQUALS SIGN\n").unwrap();
        assert!(VoxelflowConfig::load_env_file_from(&broken).is_err());
    }
}
