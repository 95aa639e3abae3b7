use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Counters for workflow decisions made by this process
#[derive(Debug, Default)]
pub struct WorkflowMetrics {
    pub created: AtomicU64,
    pub approvals: AtomicU64,
    pub partial_approvals: AtomicU64,
    pub rejections: AtomicU64,
    pub cancellations: AtomicU64,
    pub assignments: AtomicU64,
    pub revocations: AtomicU64,
    pub denials: AtomicU64,
    pub conflicts: AtomicU64,
}

impl WorkflowMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_creation(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_approval(&self) {
        self.approvals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_partial_approval(&self) {
        self.partial_approvals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejection(&self) {
        self.rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancellation(&self) {
        self.cancellations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_assignment(&self) {
        self.assignments.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_revocation(&self) {
        self.revocations.fetch_add(1, Ordering::Relaxed);
    }

    /// Forbidden actor or unusable delegate
    pub fn record_denial(&self) {
        self.denials.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_conflict(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> WorkflowStats {
        WorkflowStats {
            created: self.created.load(Ordering::Relaxed),
            approvals: self.approvals.load(Ordering::Relaxed),
            partial_approvals: self.partial_approvals.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
            cancellations: self.cancellations.load(Ordering::Relaxed),
            assignments: self.assignments.load(Ordering::Relaxed),
            revocations: self.revocations.load(Ordering::Relaxed),
            denials: self.denials.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            created = stats.created,
            approvals = stats.approvals,
            partial_approvals = stats.partial_approvals,
            rejections = stats.rejections,
            cancellations = stats.cancellations,
            assignments = stats.assignments,
            revocations = stats.revocations,
            denials = stats.denials,
            conflicts = stats.conflicts,
            "Workflow metrics"
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowStats {
    pub created: u64,
    pub approvals: u64,
    pub partial_approvals: u64,
    pub rejections: u64,
    pub cancellations: u64,
    pub assignments: u64,
    pub revocations: u64,
    pub denials: u64,
    pub conflicts: u64,
}

/// Global metrics instance
static WORKFLOW_METRICS: std::sync::LazyLock<WorkflowMetrics> =
    std::sync::LazyLock::new(WorkflowMetrics::new);

pub fn workflow_metrics() -> &'static WorkflowMetrics {
    &WORKFLOW_METRICS
}

/// Time an operation and log its duration
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis() as u64,
            "Operation completed"
        );
    }
}
