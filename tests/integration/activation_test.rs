//! Integration tests for the routine document lifecycle.
//!
//! Covers draft editing, activation, history, soft delete and concurrent
//! activation from two connections to one database file.

use std::sync::{Arc, Barrier};
use std::thread;

use routinely::documents::{DocumentManager, DocumentStatus};
use routinely::storage::Database;
use routinely::{RoutineError, RoutineService};
use tempfile::TempDir;

const OWNER: &str = "owner-1";

fn count_active(db: &Database, owner: &str) -> i64 {
    db.connection()
        .query_row(
            "SELECT COUNT(*) FROM routine_documents
             WHERE owner_id = ?1 AND status = 'active' AND deleted_at IS NULL",
            [owner],
            |row| row.get(0),
        )
        .unwrap()
}

#[test]
fn test_full_document_lifecycle() {
    let service = RoutineService::new(Database::open_in_memory().unwrap());

    assert!(service.get_active_document(OWNER).unwrap().is_none());
    assert!(service.get_draft_document(OWNER).unwrap().is_none());

    let draft = service.create_or_replace_draft(OWNER, "Wake at 6").unwrap();
    assert_eq!(draft.status, DocumentStatus::Draft);
    assert_eq!(draft.version, 1);

    let edited = service.create_or_replace_draft(OWNER, "Wake at 6:30").unwrap();
    assert_eq!(edited.id, draft.id);
    assert_eq!(edited.version, 1);

    let first = service.activate_draft(OWNER).unwrap();
    assert_eq!(first.status, DocumentStatus::Active);
    assert_eq!(first.content, "Wake at 6:30");
    assert_eq!(first.version, 2);

    service.create_or_replace_draft(OWNER, "Wake at 7").unwrap();
    let second = service.activate_draft(OWNER).unwrap();
    assert_eq!(second.version, 4);

    let history = service.history(OWNER, None).unwrap();
    let versions: Vec<i64> = history.iter().map(|d| d.version).collect();
    assert_eq!(versions, vec![4, 2]);
    assert_eq!(history[1].status, DocumentStatus::Past);

    assert_eq!(service.get_document(first.id).unwrap().unwrap().status, DocumentStatus::Past);
    assert_eq!(count_active(service.database(), OWNER), 1);
}

#[test]
fn test_second_activation_without_draft_is_not_found() {
    let service = RoutineService::new(Database::open_in_memory().unwrap());

    service.create_or_replace_draft(OWNER, "Routine").unwrap();
    let active = service.activate_draft(OWNER).unwrap();

    assert!(matches!(
        service.activate_draft(OWNER),
        Err(RoutineError::NotFound(_))
    ));

    let still_active = service.get_active_document(OWNER).unwrap().unwrap();
    assert_eq!(still_active.id, active.id);
    assert_eq!(still_active.version, active.version);
}

#[test]
fn test_soft_deleted_versions_are_not_reused() {
    let service = RoutineService::new(Database::open_in_memory().unwrap());

    service.create_or_replace_draft(OWNER, "v").unwrap();
    let active = service.activate_draft(OWNER).unwrap();
    service.delete_document(OWNER, active.id).unwrap();

    assert!(service.get_active_document(OWNER).unwrap().is_none());
    assert!(service.history(OWNER, None).unwrap().is_empty());

    let draft = service.create_or_replace_draft(OWNER, "again").unwrap();
    assert!(draft.version > active.version);
    let reactivated = service.activate_draft(OWNER).unwrap();
    assert!(reactivated.version > draft.version);

    assert!(matches!(
        service.delete_document(OWNER, active.id),
        Err(RoutineError::NotFound(_))
    ));
}

#[test]
fn test_concurrent_activation_after_shared_read() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("routines.db");

    {
        let db = Database::open(&path).unwrap();
        let documents = DocumentManager::new(db.connection());
        documents.create_or_replace_draft(OWNER, "first").unwrap();
        documents.activate_draft(OWNER).unwrap();
        documents.create_or_replace_draft(OWNER, "second").unwrap();
    }

    // Both writers read the same state before either commits
    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            let path = path.clone();
            thread::spawn(move || {
                let db = Database::open(&path).unwrap();
                let documents = DocumentManager::new(db.connection());
                let plan = documents.prepare_activation(OWNER).unwrap();
                barrier.wait();
                documents.commit_activation(&plan)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(RoutineError::Conflict(_))))
        .count();

    assert_eq!(winners.len(), 1);
    assert_eq!(conflicts, 1);
    assert_eq!(winners[0].version, 4);

    let db = Database::open(&path).unwrap();
    assert_eq!(count_active(&db, OWNER), 1);
    let active = DocumentManager::new(db.connection())
        .get_active(OWNER)
        .unwrap()
        .unwrap();
    assert_eq!(active.version, 4);
    assert_eq!(active.content, "second");
}

#[test]
fn test_concurrent_activation_end_to_end() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("routines.db");

    {
        let db = Database::open(&path).unwrap();
        DocumentManager::new(db.connection())
            .create_or_replace_draft(OWNER, "only draft")
            .unwrap();
    }

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            let path = path.clone();
            thread::spawn(move || {
                let service = RoutineService::new(Database::open(&path).unwrap());
                barrier.wait();
                service.activate_draft(OWNER)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);

    // The loser either saw the draft move under it or saw no draft at all
    for result in &results {
        if let Err(err) = result {
            assert!(matches!(
                err,
                RoutineError::Conflict(_) | RoutineError::NotFound(_)
            ));
        }
    }

    let db = Database::open(&path).unwrap();
    assert_eq!(count_active(&db, OWNER), 1);
    let active = DocumentManager::new(db.connection())
        .get_active(OWNER)
        .unwrap()
        .unwrap();
    assert_eq!(active.version, 2);
}
