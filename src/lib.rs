// Voxelflow Library - Multi-actor approval workflows
// Exposes the workflow engine, its stores and the CLI plumbing for testing and integration

pub mod cli;
pub mod config;
#[cfg(feature = "database")]
pub mod database;
pub mod observability;
pub mod telemetry;
pub mod workflow;

// Re-export key types for easy access
pub use config::{config, VoxelflowConfig};
#[cfg(feature = "database")]
pub use database::{DatabaseManager, SqliteStore};
pub use observability::{workflow_metrics, OperationTimer, WorkflowMetrics};
pub use telemetry::{create_workflow_span, generate_correlation_id, init_telemetry};
pub use workflow::{
    ApprovalEngine, Decision, InMemoryStore, ItemDraft, Role, WorkItem, WorkItemKind,
    WorkflowError, WorkflowTracker,
};
