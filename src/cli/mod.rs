use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser)]
#[command(name = "voxelflow")]
#[command(about = "Approval workflow tracker for requirements, stories, issues and retrospectives")]
#[command(long_about = "voxelflow walks work items through their review pipelines. \
    Every state names the roles allowed to act on it. Approvals and rejections move items \
    along and delegate the next operators. \
    Get started with 'voxelflow init' and 'voxelflow grant'.")]
pub struct Cli {
    /// SQLite connection string, overrides the configured database
    #[arg(long, global = true, help = "Database URL, e.g. sqlite://voxelflow.db")]
    pub database: Option<String>,
    /// Keep everything in memory for this invocation only
    #[arg(long, global = true, help = "Use a throwaway in-memory store instead of SQLite")]
    pub in_memory: bool,
    /// Extra configuration file layered over voxelflow.toml
    #[arg(long, global = true, help = "Path to a TOML configuration file")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database and apply migrations
    Init {
        /// Also write the effective configuration to voxelflow.toml
        #[arg(long, help = "Write the effective configuration to voxelflow.toml")]
        write_config: bool,
    },
    /// Give a user one or more roles
    Grant {
        /// User id
        uid: String,
        /// Roles such as BUSINESS, PRODUCT, TEST or SUPER_ADMIN
        #[arg(required = true, help = "Roles to grant")]
        roles: Vec<String>,
    },
    /// Put a user in a group; stories they create are prefixed with its code
    Join {
        /// User id
        uid: String,
        /// Group code, uppercase letters and digits
        group: String,
    },
    /// Create a work item
    Create {
        /// requirement, story, issue or retrospective
        kind: String,
        #[arg(long, help = "Title of the work item")]
        title: String,
        #[arg(long, default_value = "", help = "Longer description")]
        description: String,
        #[arg(long, help = "Priority, zero or greater")]
        priority: Option<i32>,
        /// Requirement type: BUILDING, MOD, DATAPACK, MODPACK, SERVER, EFFICIENCY,
        /// RECONSTRUCTION or OTHER
        #[arg(long)]
        requirement_type: Option<String>,
        #[arg(long, help = "Requirement a story belongs to")]
        req_code: Option<String>,
        #[arg(long = "as", value_name = "UID", help = "Acting user")]
        actor: String,
    },
    /// Show one work item
    Show {
        code: String,
        #[arg(long, help = "Print the item as JSON")]
        json: bool,
    },
    /// List work items of one kind
    List {
        /// requirement, story, issue or retrospective
        kind: String,
        #[arg(long, help = "Keywords that must all appear in the title")]
        title: Option<String>,
        #[arg(long, help = "Only items in this status")]
        status: Option<String>,
        #[arg(long, help = "Only items with this priority")]
        priority: Option<i32>,
        #[arg(long, help = "1-based page number")]
        page: Option<u32>,
        #[arg(long, help = "Items per page")]
        page_size: Option<u32>,
        #[arg(long, help = "code, title, status, priority, createdAt or updatedAt")]
        order_by: Option<String>,
        #[arg(long, help = "asc or desc")]
        order_dir: Option<String>,
    },
    /// Change title, description, priority or kind-specific fields
    Update {
        code: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        priority: Option<i32>,
        #[arg(long)]
        requirement_type: Option<String>,
        #[arg(long)]
        req_code: Option<String>,
        #[arg(long = "as", value_name = "UID", help = "Acting user")]
        actor: String,
    },
    /// Approve the current step and hand the item to the next operators
    Approve {
        code: String,
        #[arg(long = "next", value_name = "UID", help = "Operator for the next step, repeatable")]
        next: Vec<String>,
        #[arg(long, default_value = "", help = "Rationale recorded in the ledger")]
        reason: String,
        #[arg(long = "as", value_name = "UID", help = "Acting user")]
        actor: String,
    },
    /// Reject the current step and send the item where its workflow says
    Reject {
        code: String,
        #[arg(long = "next", value_name = "UID", help = "Operator for the next step, repeatable")]
        next: Vec<String>,
        #[arg(long, default_value = "", help = "Rationale recorded in the ledger")]
        reason: String,
        #[arg(long = "as", value_name = "UID", help = "Acting user")]
        actor: String,
    },
    /// Cancel an open work item
    Cancel {
        code: String,
        #[arg(long, default_value = "", help = "Why the item is canceled")]
        reason: String,
        #[arg(long = "as", value_name = "UID", help = "Acting user")]
        actor: String,
    },
    /// Delegate the current step to a user
    Assign {
        code: String,
        assignee: String,
        #[arg(long = "as", value_name = "UID", help = "Acting user")]
        actor: String,
    },
    /// Withdraw a pending delegation
    Unassign {
        code: String,
        assignee: String,
        #[arg(long = "as", value_name = "UID", help = "Acting user")]
        actor: String,
    },
    /// Show the operator ledger of a work item
    History {
        code: String,
        #[arg(long, help = "Print the ledger as JSON")]
        json: bool,
    },
    /// Pending delegations for a user and open work overall
    Summary {
        #[arg(long = "as", value_name = "UID", help = "User to summarize")]
        actor: String,
    },
}
