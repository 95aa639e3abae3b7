// SQLite-backed store tests against a throwaway database file
#![cfg(feature = "database")]

use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;
use voxelflow::workflow::sequence::next_sequence;
use voxelflow::workflow::{
    Audit, EngineSettings, GroupDirectory, ItemChanges, ItemDetails, ItemDraft, ListQuery,
    RelationType, Role, RoleDirectory, WorkItem, WorkItemKind, WorkflowStore, WorkflowTracker,
};
use voxelflow::{DatabaseManager, SqliteStore};

async fn open_store() -> (TempDir, DatabaseManager, SqliteStore) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("voxelflow.db").display());
    let manager = DatabaseManager::new(&url, 5, true).await.unwrap();
    let store = manager.store();
    (dir, manager, store)
}

async fn seeded() -> (TempDir, DatabaseManager, Arc<SqliteStore>, WorkflowTracker) {
    let (dir, manager, store) = open_store().await;
    store.grant_role("ann", Role::Business).await.unwrap();
    store.grant_role("pete", Role::Product).await.unwrap();
    store.grant_role("dev", Role::Development).await.unwrap();
    store.grant_role("tess", Role::Test).await.unwrap();
    store.grant_role("root", Role::SuperAdmin).await.unwrap();
    store.set_group("dev", "BLD").await.unwrap();
    let store = Arc::new(store);
    let tracker = WorkflowTracker::new(store.clone(), EngineSettings::default());
    (dir, manager, store, tracker)
}

fn draft_item(code: &str) -> WorkItem {
    WorkItem {
        code: code.to_string(),
        title: "Detached".to_string(),
        description: String::new(),
        status: "REVIEWING".to_string(),
        priority: None,
        details: ItemDetails::Issue,
        audit: Audit::new("ann"),
    }
}

#[tokio::test]
async fn test_roles_and_groups_round_trip() {
    let (_dir, _manager, store) = open_store().await;

    assert!(store.grant_role("ann", Role::Business).await.unwrap());
    assert!(!store.grant_role("ann", Role::Business).await.unwrap());
    assert!(store.grant_role("ann", Role::Test).await.unwrap());

    let roles = store.roles_of("ann").await.unwrap();
    assert!(roles.contains(Role::Business));
    assert!(roles.contains(Role::Test));
    assert_eq!(roles.len(), 2);

    assert!(store.revoke_role("ann", Role::Test).await.unwrap());
    assert!(!store.revoke_role("ann", Role::Test).await.unwrap());
    assert!(store.roles_of("nobody").await.unwrap().is_empty());

    assert_eq!(store.group_of("dev").await.unwrap(), None);
    store.set_group("dev", "BLD").await.unwrap();
    store.set_group("dev", "ART").await.unwrap();
    assert_eq!(store.group_of("dev").await.unwrap().as_deref(), Some("ART"));
}

#[tokio::test]
async fn test_sequences_are_per_prefix() {
    let (_dir, _manager, store) = open_store().await;

    assert_eq!(next_sequence(&store, "REQ", "ann").await.unwrap(), 1);
    assert_eq!(next_sequence(&store, "REQ", "ann").await.unwrap(), 2);
    assert_eq!(next_sequence(&store, "BUG", "ann").await.unwrap(), 1);
    assert_eq!(next_sequence(&store, "REQ", "pete").await.unwrap(), 3);
}

#[tokio::test]
async fn test_dropped_transaction_rolls_back() {
    let (_dir, _manager, store) = open_store().await;

    {
        let mut tx = store.begin().await.unwrap();
        tx.insert_item(&draft_item("BUG-9")).await.unwrap();
    }
    assert!(store.find_item("BUG-9").await.unwrap().is_none());

    let mut tx = store.begin().await.unwrap();
    tx.insert_item(&draft_item("BUG-9")).await.unwrap();
    tx.commit().await.unwrap();
    assert!(store.find_item("BUG-9").await.unwrap().is_some());
}

#[tokio::test]
async fn test_compare_and_set_rejects_stale_status() {
    let (_dir, _manager, store) = open_store().await;
    let mut tx = store.begin().await.unwrap();
    tx.insert_item(&draft_item("BUG-1")).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    assert!(tx
        .compare_and_set_status("BUG-1", "REVIEWING", "CONFIRMING", "ann")
        .await
        .unwrap());
    assert!(!tx
        .compare_and_set_status("BUG-1", "REVIEWING", "REJECTED", "ann")
        .await
        .unwrap());
    tx.commit().await.unwrap();

    let item = store.find_item("BUG-1").await.unwrap().unwrap();
    assert_eq!(item.status, "CONFIRMING");
}

#[tokio::test]
async fn test_requirement_flow_persists_ledger() {
    let (_dir, _manager, store, tracker) = seeded().await;

    let item = tracker
        .create(
            WorkItemKind::Requirement,
            ItemDraft::new("Spawn castle")
                .description("main hub")
                .priority(2)
                .requirement_type("BUILDING"),
            "ann",
        )
        .await
        .unwrap();
    assert_eq!(item.code, "REQ-1");

    tracker
        .approve("REQ-1", &["pete".to_string()], "ok", "ann")
        .await
        .unwrap();

    let stored = store.find_item("REQ-1").await.unwrap().unwrap();
    assert_eq!(stored.status, "COUNTERSIGNING");
    assert_eq!(stored.priority, Some(2));
    assert_eq!(stored.details.requirement_type().map(|t| t.as_str()), Some("BUILDING"));
    assert_eq!(stored.audit.updated_by, "ann");

    let history = store.relations_of("REQ-1").await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].relation_type, RelationType::Approved);
    assert_eq!(history[0].old_status, "REVIEWING");
    assert_eq!(history[0].new_status.as_deref(), Some("COUNTERSIGNING"));
    assert_eq!(history[1].uid, "pete");
    assert!(history[1].is_pending());

    assert_eq!(store.count_assigned("pete").await.unwrap(), 1);
    let story = tracker
        .create(
            WorkItemKind::Story,
            ItemDraft::new("Keep walls").req_code("REQ-1"),
            "dev",
        )
        .await
        .unwrap();
    assert_eq!(story.code, "BLD-1");
}

#[tokio::test]
async fn test_list_filters_orders_and_pages() {
    let (_dir, _manager, _store, tracker) = seeded().await;
    for (title, priority) in [("Lava moat", 3), ("Lava lamp", 1), ("Ice road", 2)] {
        tracker
            .create(
                WorkItemKind::Issue,
                ItemDraft::new(title).priority(priority),
                "ann",
            )
            .await
            .unwrap();
    }
    tracker.approve("BUG-2", &[], "", "ann").await.unwrap();

    let page = tracker
        .list(
            WorkItemKind::Issue,
            &ListQuery {
                title: Some("lava".to_string()),
                order_by: Some("priority".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    let codes: Vec<_> = page.items.iter().map(|i| i.code.as_str()).collect();
    assert_eq!(codes, vec!["BUG-2", "BUG-1"]);

    let page = tracker
        .list(
            WorkItemKind::Issue,
            &ListQuery {
                status: Some("confirming".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].code, "BUG-2");

    let page = tracker
        .list(
            WorkItemKind::Issue,
            &ListQuery {
                page_num: Some(2),
                page_size: Some(2),
                order_by: Some("code".to_string()),
                order_dir: Some("asc".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.total_pages(), 2);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].code, "BUG-3");

    let empty = tracker
        .list(WorkItemKind::Retrospective, &ListQuery::default())
        .await
        .unwrap();
    assert_eq!(empty.total, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_get_distinct_codes() {
    let (_dir, _manager, _store, tracker) = seeded().await;
    let tracker = Arc::new(tracker);

    let creates = (0..20).map(|i| {
        let tracker = Arc::clone(&tracker);
        tokio::spawn(async move {
            tracker
                .create(
                    WorkItemKind::Issue,
                    ItemDraft::new(format!("Bug {i}")),
                    "ann",
                )
                .await
        })
    });
    let results = join_all(creates).await;

    let codes: HashSet<String> = results
        .into_iter()
        .map(|joined| joined.unwrap().unwrap().code)
        .collect();
    assert_eq!(codes.len(), 20);
    for n in 1..=20 {
        assert!(codes.contains(&format!("BUG-{n}")));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_quorum_advances_exactly_once() {
    let (_dir, _manager, store, tracker) = seeded().await;
    let participants: Vec<String> = (0..6).map(|i| format!("crew{i}")).collect();
    for uid in &participants {
        store.grant_role(uid, Role::Building).await.unwrap();
    }
    let code = tracker
        .create(
            WorkItemKind::Retrospective,
            ItemDraft::new("Season wrap-up"),
            "ann",
        )
        .await
        .unwrap()
        .code;
    for uid in &participants {
        assert!(tracker.assign(&code, uid, "root").await.unwrap());
    }

    let tracker = Arc::new(tracker);
    let approvals = participants.iter().cloned().map(|uid| {
        let tracker = Arc::clone(&tracker);
        let code = code.clone();
        tokio::spawn(async move { tracker.approve(&code, &[], "", &uid).await })
    });
    let decisions: Vec<_> = join_all(approvals)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(decisions.iter().filter(|d| d.advanced).count(), 1);
    assert_eq!(
        store.find_item(&code).await.unwrap().unwrap().status,
        "HANDLING"
    );
    let approved = store
        .relations_of(&code)
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.relation_type == RelationType::Approved)
        .count();
    assert_eq!(approved, 6);
}

#[tokio::test]
async fn test_cancel_files_who_and_why() {
    let (_dir, _manager, store, tracker) = seeded().await;
    let code = tracker
        .create(
            WorkItemKind::Issue,
            ItemDraft::new("Duplicate spawn bug"),
            "ann",
        )
        .await
        .unwrap()
        .code;
    tracker.assign(&code, "ann", "ann").await.unwrap();

    tracker
        .cancel(&code, "duplicate of BUG-9", "ann")
        .await
        .unwrap();

    let history = tracker.history(&code).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].uid, "ann");
    assert_eq!(history[0].relation_type, RelationType::Rejected);
    assert_eq!(history[0].old_status, "REVIEWING");
    assert_eq!(history[0].new_status.as_deref(), Some("CANCELED"));
    assert_eq!(
        history[0].description.as_deref(),
        Some("duplicate of BUG-9")
    );
    assert_eq!(store.count_assigned("ann").await.unwrap(), 0);
}

#[tokio::test]
async fn test_title_keywords_fold_non_ascii_case() {
    let (_dir, _manager, _store, tracker) = seeded().await;
    tracker
        .create(
            WorkItemKind::Issue,
            ItemDraft::new("Écran noir au démarrage"),
            "ann",
        )
        .await
        .unwrap();
    tracker
        .create(
            WorkItemKind::Issue,
            ItemDraft::new("Lag in the ÖSTER biome"),
            "ann",
        )
        .await
        .unwrap();

    let search = |title: &str| ListQuery {
        title: Some(title.to_string()),
        ..Default::default()
    };
    let hits = tracker
        .list(WorkItemKind::Issue, &search("écran"))
        .await
        .unwrap();
    assert_eq!(hits.total, 1);
    assert_eq!(hits.items[0].code, "BUG-1");

    let hits = tracker
        .list(WorkItemKind::Issue, &search("öster"))
        .await
        .unwrap();
    assert_eq!(hits.total, 1);
    assert_eq!(hits.items[0].code, "BUG-2");

    tracker
        .update(
            "BUG-2",
            ItemChanges {
                title: Some("Lag in the Ärger biome".to_string()),
                ..Default::default()
            },
            "ann",
        )
        .await
        .unwrap();
    let stale = tracker.list(WorkItemKind::Issue, &search("öster")).await;
    assert_eq!(stale.unwrap().total, 0);
    let renamed = tracker.list(WorkItemKind::Issue, &search("ärger")).await;
    assert_eq!(renamed.unwrap().total, 1);
}

#[tokio::test]
async fn test_repeat_quorum_approval_is_filed_once() {
    let (_dir, _manager, store, tracker) = seeded().await;
    for uid in ["crew1", "crew2"] {
        store.grant_role(uid, Role::Building).await.unwrap();
    }
    let code = tracker
        .create(
            WorkItemKind::Retrospective,
            ItemDraft::new("Castle build review"),
            "ann",
        )
        .await
        .unwrap()
        .code;
    for uid in ["crew1", "crew2"] {
        tracker.assign(&code, uid, "root").await.unwrap();
    }

    let first = tracker.approve(&code, &[], "", "crew1").await.unwrap();
    let again = tracker.approve(&code, &[], "", "crew1").await.unwrap();
    assert!(!first.advanced);
    assert!(!again.advanced);
    assert_eq!(again.pending, 1);

    let crew1_approvals = store
        .relations_of(&code)
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.uid == "crew1" && r.relation_type == RelationType::Approved)
        .count();
    assert_eq!(crew1_approvals, 1);
}
