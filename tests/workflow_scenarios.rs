// End-to-end workflow scenarios through the public tracker API
// Every test runs against the in-memory store with a fixed cast of users

use std::sync::Arc;
use voxelflow::workflow::{
    EngineSettings, InMemoryStore, ItemDraft, RelationType, Role, WorkItemKind, WorkflowError,
    WorkflowStore, WorkflowTracker,
};

async fn team() -> (Arc<InMemoryStore>, WorkflowTracker) {
    let store = Arc::new(InMemoryStore::new());
    store.grant_roles("ann", &[Role::Business]).await;
    store.grant_roles("pete", &[Role::Product]).await;
    store.grant_roles("dev", &[Role::Development]).await;
    store.grant_roles("tess", &[Role::Test]).await;
    store.grant_roles("root", &[Role::SuperAdmin]).await;
    store.set_group("dev", "BLD").await;
    let tracker = WorkflowTracker::new(store.clone(), EngineSettings::default());
    (store, tracker)
}

fn ops(uids: &[&str]) -> Vec<String> {
    uids.iter().map(|uid| uid.to_string()).collect()
}

#[tokio::test]
async fn test_requirement_countersigning_is_gated_by_role() {
    let (store, tracker) = team().await;

    let item = tracker
        .create(
            WorkItemKind::Requirement,
            ItemDraft::new("Spawn castle").requirement_type("BUILDING"),
            "ann",
        )
        .await
        .unwrap();
    assert_eq!(item.code, "REQ-1");
    assert_eq!(item.status, "REVIEWING");

    let decision = tracker
        .approve("REQ-1", &ops(&["pete"]), "looks right", "ann")
        .await
        .unwrap();
    assert_eq!(decision.from, "REVIEWING");
    assert_eq!(decision.to, "COUNTERSIGNING");
    assert!(decision.advanced);

    let relations = store.relations_of("REQ-1").await.unwrap();
    let pending: Vec<_> = relations.iter().filter(|r| r.is_pending()).collect();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].uid, "pete");
    assert_eq!(pending[0].relation_type, RelationType::Handling);

    let err = tracker.approve("REQ-1", &[], "", "dev").await.unwrap_err();
    assert!(matches!(err, WorkflowError::Forbidden { .. }));
    assert_eq!(
        tracker.locate("REQ-1").await.unwrap().status,
        "COUNTERSIGNING"
    );
}

#[tokio::test]
async fn test_issue_round_trip_through_rejection() {
    let (store, tracker) = team().await;
    let bug = tracker
        .create(
            WorkItemKind::Issue,
            ItemDraft::new("Creeper spawns in lobby"),
            "ann",
        )
        .await
        .unwrap();
    assert_eq!(bug.code, "BUG-1");

    tracker
        .approve("BUG-1", &ops(&["dev"]), "", "ann")
        .await
        .unwrap();
    tracker
        .approve("BUG-1", &ops(&["dev"]), "reproduced", "dev")
        .await
        .unwrap();
    let to_test = tracker
        .approve("BUG-1", &ops(&["tess"]), "fixed", "dev")
        .await
        .unwrap();
    assert_eq!(to_test.to, "TESTING");

    let back = tracker
        .reject("BUG-1", &ops(&["dev"]), "still spawns at night", "tess")
        .await
        .unwrap();
    assert_eq!(back.from, "TESTING");
    assert_eq!(back.to, "HANDLING");

    let history = tracker.history("BUG-1").await.unwrap();
    let rejected = history
        .iter()
        .find(|r| r.relation_type == RelationType::Rejected)
        .unwrap();
    assert_eq!(rejected.uid, "tess");
    assert_eq!(rejected.old_status, "TESTING");
    assert_eq!(rejected.new_status.as_deref(), Some("HANDLING"));
    assert_eq!(
        rejected.description.as_deref(),
        Some("still spawns at night")
    );

    let pending: Vec<_> = store
        .relations_of("BUG-1")
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.is_pending())
        .collect();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].old_status, "HANDLING");
}

#[tokio::test]
async fn test_retrospective_advances_on_last_signature() {
    let (_store, tracker) = team().await;
    let retro = tracker
        .create(
            WorkItemKind::Retrospective,
            ItemDraft::new("Sprint 12"),
            "ann",
        )
        .await
        .unwrap();
    assert_eq!(retro.code, "RTS-1");

    for uid in ["ann", "dev", "tess"] {
        assert!(tracker.assign("RTS-1", uid, "root").await.unwrap());
    }

    let first = tracker.approve("RTS-1", &[], "", "ann").await.unwrap();
    assert!(!first.advanced);
    assert_eq!(first.pending, 2);
    let second = tracker.approve("RTS-1", &[], "", "tess").await.unwrap();
    assert!(!second.advanced);
    assert_eq!(second.pending, 1);
    assert_eq!(tracker.locate("RTS-1").await.unwrap().status, "READY");

    let last = tracker
        .approve("RTS-1", &ops(&["dev"]), "", "dev")
        .await
        .unwrap();
    assert!(last.advanced);
    assert_eq!(last.to, "HANDLING");

    let approvals = tracker
        .history("RTS-1")
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.relation_type == RelationType::Approved && r.old_status == "READY")
        .count();
    assert_eq!(approvals, 3);
}

#[tokio::test]
async fn test_story_code_and_cancellation() {
    let (_store, tracker) = team().await;
    tracker
        .create(
            WorkItemKind::Requirement,
            ItemDraft::new("Nether hub").requirement_type("MOD"),
            "ann",
        )
        .await
        .unwrap();
    let story = tracker
        .create(
            WorkItemKind::Story,
            ItemDraft::new("Portal frame").req_code("REQ-1"),
            "dev",
        )
        .await
        .unwrap();
    assert_eq!(story.code, "BLD-1");
    assert_eq!(story.details.req_code(), Some("REQ-1"));

    let canceled = tracker.cancel("BLD-1", "scope cut", "dev").await.unwrap();
    assert_eq!(canceled.to, "CANCELED");

    let err = tracker.approve("BLD-1", &[], "", "root").await.unwrap_err();
    assert!(matches!(err, WorkflowError::NotModifiable { .. }));
    let err = tracker.assign("BLD-1", "dev", "root").await.unwrap_err();
    assert!(matches!(err, WorkflowError::NotModifiable { .. }));
}

#[tokio::test]
async fn test_unknown_code_is_not_found_everywhere() {
    let (_store, tracker) = team().await;

    let err = tracker
        .approve("NOPE-7", &[], "", "root")
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound { .. }));
    let err = tracker.history("NOPE-7").await.unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound { .. }));
    let err = tracker.cancel("NOPE-7", "", "root").await.unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound { .. }));
}

#[tokio::test]
async fn test_summary_tracks_delegations_across_kinds() {
    let (_store, tracker) = team().await;
    tracker
        .create(WorkItemKind::Issue, ItemDraft::new("Lag spike"), "ann")
        .await
        .unwrap();
    tracker
        .create(
            WorkItemKind::Retrospective,
            ItemDraft::new("Sprint 13"),
            "ann",
        )
        .await
        .unwrap();
    tracker
        .approve("BUG-1", &ops(&["dev"]), "", "ann")
        .await
        .unwrap();
    tracker.assign("RTS-1", "dev", "root").await.unwrap();

    let summary = tracker.summary("dev").await.unwrap();
    assert_eq!(summary.assigned, 2);
    assert_eq!(summary.open, 2);

    tracker.cancel("BUG-1", "duplicate", "root").await.unwrap();
    let summary = tracker.summary("dev").await.unwrap();
    assert_eq!(summary.assigned, 1);
    assert_eq!(summary.open, 1);
}
