//! Integration tests for the dependency graph: edge store, cycle
//! guard, blocker queries, and visibility rules.

use taskboard::db::{now_ms, Database};
use taskboard::error::{ApiError, ErrorCode};

/// Helper to create a fresh in-memory database for testing.
fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

fn make_user(db: &Database, name: &str) -> i64 {
    db.create_user(name, &format!("{}@example.com", name))
        .expect("Failed to create user")
        .id
}

fn make_task(db: &Database, owner: i64, title: &str) -> i64 {
    db.create_task(
        owner,
        title,
        "",
        None,
        None,
        None,
        now_ms() + 86_400_000,
        None,
        None,
    )
    .expect("Failed to create task")
    .id
}

fn error_code(err: anyhow::Error) -> ErrorCode {
    ApiError::from(err).code
}

mod edge_store_tests {
    use super::*;

    #[test]
    fn create_dependency_persists_edge() {
        let db = setup_db();
        let u1 = make_user(&db, "alice");
        let a = make_task(&db, u1, "Task A");
        let b = make_task(&db, u1, "Task B");

        let dep = db
            .create_dependency(a, b, u1, Some("A needs B".to_string()))
            .expect("Failed to create dependency");

        assert_eq!(dep.task_id, a);
        assert_eq!(dep.depends_on_id, b);
        assert_eq!(dep.created_by_id, u1);
        assert_eq!(dep.notes, "A needs B");
        assert!(dep.active);
        assert!(dep.created_at > 0);
    }

    #[test]
    fn self_dependency_rejected() {
        let db = setup_db();
        let u1 = make_user(&db, "alice");
        let a = make_task(&db, u1, "Task A");

        let err = db.create_dependency(a, a, u1, None).unwrap_err();

        assert_eq!(error_code(err), ErrorCode::SelfDependency);
        assert!(db.list_dependencies(a, u1).unwrap().is_empty());
    }

    #[test]
    fn duplicate_edge_rejected() {
        let db = setup_db();
        let u1 = make_user(&db, "alice");
        let a = make_task(&db, u1, "Task A");
        let b = make_task(&db, u1, "Task B");

        db.create_dependency(a, b, u1, None).unwrap();
        let err = db.create_dependency(a, b, u1, None).unwrap_err();

        assert_eq!(error_code(err), ErrorCode::DuplicateDependency);
        assert_eq!(db.list_dependencies(a, u1).unwrap().len(), 1);
    }

    #[test]
    fn create_against_missing_task_is_not_found() {
        let db = setup_db();
        let u1 = make_user(&db, "alice");
        let a = make_task(&db, u1, "Task A");

        let err = db.create_dependency(a, 9999, u1, None).unwrap_err();
        assert_eq!(error_code(err), ErrorCode::TaskNotFound);

        let err = db.create_dependency(9999, a, u1, None).unwrap_err();
        assert_eq!(error_code(err), ErrorCode::TaskNotFound);
    }

    #[test]
    fn list_is_reverse_chronological() {
        let db = setup_db();
        let u1 = make_user(&db, "alice");
        let a = make_task(&db, u1, "Task A");
        let b = make_task(&db, u1, "Task B");
        let c = make_task(&db, u1, "Task C");

        let first = db.create_dependency(a, b, u1, None).unwrap();
        let second = db.create_dependency(a, c, u1, None).unwrap();

        let deps = db.list_dependencies(a, u1).unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].id, second.id);
        assert_eq!(deps[1].id, first.id);
    }

    #[test]
    fn list_includes_inactive_edges() {
        let db = setup_db();
        let u1 = make_user(&db, "alice");
        let a = make_task(&db, u1, "Task A");
        let b = make_task(&db, u1, "Task B");

        let dep = db.create_dependency(a, b, u1, None).unwrap();
        db.toggle_dependency(a, dep.id, u1).unwrap();

        let deps = db.list_dependencies(a, u1).unwrap();
        assert_eq!(deps.len(), 1);
        assert!(!deps[0].active);
    }

    #[test]
    fn delete_dependency_removes_edge() {
        let db = setup_db();
        let u1 = make_user(&db, "alice");
        let a = make_task(&db, u1, "Task A");
        let b = make_task(&db, u1, "Task B");

        let dep = db.create_dependency(a, b, u1, None).unwrap();
        db.delete_dependency(a, dep.id, u1).unwrap();

        assert!(db.list_dependencies(a, u1).unwrap().is_empty());
        assert!(db.blockers_of(a, u1).unwrap().is_empty());
    }

    #[test]
    fn dependency_id_scoped_to_task() {
        let db = setup_db();
        let u1 = make_user(&db, "alice");
        let a = make_task(&db, u1, "Task A");
        let b = make_task(&db, u1, "Task B");
        let c = make_task(&db, u1, "Task C");

        let dep = db.create_dependency(a, b, u1, None).unwrap();

        // The edge belongs to task A; addressing it via C is not found.
        let err = db.toggle_dependency(c, dep.id, u1).unwrap_err();
        assert_eq!(error_code(err), ErrorCode::DependencyNotFound);

        let err = db.delete_dependency(c, dep.id, u1).unwrap_err();
        assert_eq!(error_code(err), ErrorCode::DependencyNotFound);
    }
}

mod cycle_guard_tests {
    use super::*;

    #[test]
    fn direct_cycle_rejected() {
        let db = setup_db();
        let u1 = make_user(&db, "alice");
        let a = make_task(&db, u1, "Task A");
        let b = make_task(&db, u1, "Task B");

        db.create_dependency(a, b, u1, None).unwrap();
        let err = db.create_dependency(b, a, u1, None).unwrap_err();

        assert_eq!(error_code(err), ErrorCode::DependencyCycle);
        assert!(db.list_dependencies(b, u1).unwrap().is_empty());
    }

    #[test]
    fn multi_hop_cycle_rejected_and_nothing_written() {
        let db = setup_db();
        let u1 = make_user(&db, "alice");
        let a = make_task(&db, u1, "Task A");
        let b = make_task(&db, u1, "Task B");
        let c = make_task(&db, u1, "Task C");

        db.create_dependency(a, b, u1, None).unwrap();
        db.create_dependency(b, c, u1, None).unwrap();

        let err = db.create_dependency(c, a, u1, None).unwrap_err();
        assert_eq!(error_code(err), ErrorCode::DependencyCycle);

        // No edge was persisted, and existing views are intact.
        assert!(db.list_dependencies(c, u1).unwrap().is_empty());
        let blockers: Vec<i64> = db.blockers_of(a, u1).unwrap().iter().map(|t| t.id).collect();
        assert_eq!(blockers, vec![b]);
        let blocked: Vec<i64> = db.blocked_by(b, u1).unwrap().iter().map(|t| t.id).collect();
        assert_eq!(blocked, vec![a]);
    }

    #[test]
    fn unrelated_edge_allowed_after_cycle_rejection() {
        let db = setup_db();
        let u1 = make_user(&db, "alice");
        let a = make_task(&db, u1, "Task A");
        let b = make_task(&db, u1, "Task B");
        let c = make_task(&db, u1, "Task C");
        let d = make_task(&db, u1, "Task D");

        db.create_dependency(a, b, u1, None).unwrap();
        db.create_dependency(b, c, u1, None).unwrap();
        db.create_dependency(c, a, u1, None).unwrap_err();

        db.create_dependency(c, d, u1, None)
            .expect("Edge to unrelated task should be allowed");
    }

    #[test]
    fn inactive_edges_do_not_contribute_to_cycles() {
        let db = setup_db();
        let u1 = make_user(&db, "alice");
        let a = make_task(&db, u1, "Task A");
        let b = make_task(&db, u1, "Task B");
        let c = make_task(&db, u1, "Task C");

        // C -> A exists but is inactive, so A -> B and B -> C are fine.
        let c_a = db.create_dependency(c, a, u1, None).unwrap();
        db.toggle_dependency(c, c_a.id, u1).unwrap();

        db.create_dependency(a, b, u1, None).unwrap();
        db.create_dependency(b, c, u1, None)
            .expect("Inactive C->A must not count against B->C");
    }

    #[test]
    fn reactivation_revalidates_acyclicity() {
        let db = setup_db();
        let u1 = make_user(&db, "alice");
        let a = make_task(&db, u1, "Task A");
        let b = make_task(&db, u1, "Task B");
        let c = make_task(&db, u1, "Task C");

        let c_a = db.create_dependency(c, a, u1, None).unwrap();
        db.toggle_dependency(c, c_a.id, u1).unwrap();
        db.create_dependency(a, b, u1, None).unwrap();
        let b_c = db.create_dependency(b, c, u1, None).unwrap();

        // A -> B and B -> C are active, so C -> A may not come back.
        let err = db.toggle_dependency(c, c_a.id, u1).unwrap_err();
        assert_eq!(error_code(err), ErrorCode::DependencyCycle);

        // The edge is untouched on failure.
        let deps = db.list_dependencies(c, u1).unwrap();
        assert_eq!(deps.len(), 1);
        assert!(!deps[0].active);

        // Deactivating B -> C breaks the path; now reactivation works.
        db.toggle_dependency(b, b_c.id, u1).unwrap();
        let dep = db.toggle_dependency(c, c_a.id, u1).unwrap();
        assert!(dep.active);
    }

    #[test]
    fn toggle_twice_returns_to_original_state() {
        let db = setup_db();
        let u1 = make_user(&db, "alice");
        let a = make_task(&db, u1, "Task A");
        let b = make_task(&db, u1, "Task B");

        let dep = db.create_dependency(a, b, u1, None).unwrap();

        let off = db.toggle_dependency(a, dep.id, u1).unwrap();
        assert!(!off.active);

        let on = db.toggle_dependency(a, dep.id, u1).unwrap();
        assert!(on.active);
    }

    #[test]
    fn cascade_delete_breaks_cycle_path() {
        let db = setup_db();
        let u1 = make_user(&db, "alice");
        let a = make_task(&db, u1, "Task A");
        let b = make_task(&db, u1, "Task B");
        let c = make_task(&db, u1, "Task C");

        db.create_dependency(a, b, u1, None).unwrap();
        db.create_dependency(b, c, u1, None).unwrap();
        db.create_dependency(c, a, u1, None).unwrap_err();

        // Deleting B removes A->B and B->C with it.
        db.delete_task(b, u1).unwrap();
        assert!(db.list_dependencies(a, u1).unwrap().is_empty());

        db.create_dependency(c, a, u1, None)
            .expect("Cycle was broken by the cascade");
    }
}

mod query_engine_tests {
    use super::*;

    #[test]
    fn blockers_and_blocked_are_one_hop_views() {
        let db = setup_db();
        let u1 = make_user(&db, "alice");
        let a = make_task(&db, u1, "Task A");
        let b = make_task(&db, u1, "Task B");
        let c = make_task(&db, u1, "Task C");

        db.create_dependency(a, b, u1, None).unwrap();
        db.create_dependency(b, c, u1, None).unwrap();

        // One hop only: C does not appear among A's blockers.
        let blockers: Vec<i64> = db.blockers_of(a, u1).unwrap().iter().map(|t| t.id).collect();
        assert_eq!(blockers, vec![b]);

        let blocked: Vec<i64> = db.blocked_by(c, u1).unwrap().iter().map(|t| t.id).collect();
        assert_eq!(blocked, vec![b]);
    }

    #[test]
    fn inactive_edge_excluded_from_blockers() {
        let db = setup_db();
        let u1 = make_user(&db, "alice");
        let a = make_task(&db, u1, "Task A");
        let b = make_task(&db, u1, "Task B");

        let dep = db.create_dependency(a, b, u1, None).unwrap();
        let blockers: Vec<i64> = db.blockers_of(a, u1).unwrap().iter().map(|t| t.id).collect();
        assert_eq!(blockers, vec![b]);

        db.toggle_dependency(a, dep.id, u1).unwrap();
        assert!(db.blockers_of(a, u1).unwrap().is_empty());
    }

    #[test]
    fn counts_track_active_edges() {
        let db = setup_db();
        let u1 = make_user(&db, "alice");
        let a = make_task(&db, u1, "Task A");
        let b = make_task(&db, u1, "Task B");
        let c = make_task(&db, u1, "Task C");

        db.create_dependency(a, b, u1, None).unwrap();
        let a_c = db.create_dependency(a, c, u1, None).unwrap();

        assert_eq!(db.blocked_by_count(a, u1).unwrap(), 2);
        assert_eq!(db.blocking_count(b, u1).unwrap(), 1);
        assert_eq!(db.blocking_count(c, u1).unwrap(), 1);

        db.toggle_dependency(a, a_c.id, u1).unwrap();
        assert_eq!(db.blocked_by_count(a, u1).unwrap(), 1);
        assert_eq!(db.blocking_count(c, u1).unwrap(), 0);
    }
}

mod access_filter_tests {
    use super::*;

    #[test]
    fn outsider_reads_degrade_to_empty_not_error() {
        let db = setup_db();
        let u1 = make_user(&db, "alice");
        let u2 = make_user(&db, "bob");
        let a = make_task(&db, u1, "Task A");
        let b = make_task(&db, u1, "Task B");

        db.create_dependency(a, b, u1, None).unwrap();

        assert!(db.list_dependencies(a, u2).unwrap().is_empty());
        assert!(db.blockers_of(a, u2).unwrap().is_empty());
        assert!(db.blocked_by(b, u2).unwrap().is_empty());
        assert_eq!(db.blocked_by_count(a, u2).unwrap(), 0);
        assert_eq!(db.blocking_count(b, u2).unwrap(), 0);
    }

    #[test]
    fn outsider_mutations_fail_hard() {
        let db = setup_db();
        let u1 = make_user(&db, "alice");
        let u2 = make_user(&db, "bob");
        let a = make_task(&db, u1, "Task A");
        let b = make_task(&db, u1, "Task B");

        let err = db.create_dependency(a, b, u2, None).unwrap_err();
        assert_eq!(error_code(err), ErrorCode::PermissionDenied);

        let dep = db.create_dependency(a, b, u1, None).unwrap();

        let err = db.toggle_dependency(a, dep.id, u2).unwrap_err();
        assert_eq!(error_code(err), ErrorCode::PermissionDenied);

        let err = db.delete_dependency(a, dep.id, u2).unwrap_err();
        assert_eq!(error_code(err), ErrorCode::PermissionDenied);
    }

    #[test]
    fn referencing_foreign_target_fails_hard() {
        let db = setup_db();
        let u1 = make_user(&db, "alice");
        let u2 = make_user(&db, "bob");
        let mine = make_task(&db, u1, "Mine");
        let theirs = make_task(&db, u2, "Theirs");

        let err = db.create_dependency(mine, theirs, u1, None).unwrap_err();
        assert_eq!(error_code(err), ErrorCode::PermissionDenied);
    }

    #[test]
    fn assignee_has_full_access() {
        let db = setup_db();
        let u1 = make_user(&db, "alice");
        let u2 = make_user(&db, "bob");

        let a = db
            .create_task(u1, "Task A", "", None, None, Some(u2), now_ms(), None, None)
            .unwrap()
            .id;
        let b = db
            .create_task(u1, "Task B", "", None, None, Some(u2), now_ms(), None, None)
            .unwrap()
            .id;

        let dep = db.create_dependency(a, b, u2, None).unwrap();
        assert_eq!(db.list_dependencies(a, u2).unwrap().len(), 1);
        db.toggle_dependency(a, dep.id, u2).unwrap();
        db.delete_dependency(a, dep.id, u2).unwrap();
    }
}
