//! Integration tests for the RBAC engine and lifecycle transitions,
//! running against the in-memory store.

use tallybook_shared::error::EngineError;
use tallybook_shared::lifecycle;
use tallybook_shared::models::membership::TeamRole;
use tallybook_shared::models::user::CreateUser;
use tallybook_shared::rbac::resolver::EntityRef;
use tallybook_shared::rbac::{gate, guard, resolver};
use tallybook_shared::store::memory::MemoryStore;
use tallybook_shared::store::{LedgerStore, MemberWrite};

async fn user(store: &MemoryStore, email: &str) -> i64 {
    store
        .create_user(CreateUser {
            email: email.to_string(),
            password_hash: "$argon2id$test".to_string(),
            name: None,
        })
        .await
        .unwrap()
        .id
}

/// Team with admin, collaborator, and viewer members, one book, one
/// account. Returns (team_id, book_id, account_id, admin, collab, viewer).
async fn seeded_team(store: &MemoryStore) -> (i64, i64, i64, i64, i64, i64) {
    let admin = user(store, "admin@example.com").await;
    let collab = user(store, "collab@example.com").await;
    let viewer = user(store, "viewer@example.com").await;

    let team = lifecycle::create_team(store, "household", admin).await.unwrap();
    lifecycle::add_member(store, team.id, collab, TeamRole::Collaborator, admin)
        .await
        .unwrap();
    lifecycle::add_member(store, team.id, viewer, TeamRole::Viewer, admin)
        .await
        .unwrap();

    let book = lifecycle::create_book(store, team.id, "budget", admin).await.unwrap();
    let account = store.create_account(book.id, "checking").await.unwrap();

    (team.id, book.id, account.id, admin, collab, viewer)
}

// ---- role lattice and gate monotonicity ----

#[tokio::test]
async fn gate_agrees_with_resolved_role_for_all_pairs() {
    let store = MemoryStore::new();
    let (team_id, book_id, account_id, admin, collab, viewer) = seeded_team(&store).await;
    let outsider = user(&store, "outsider@example.com").await;

    let entities = [
        EntityRef::Team(team_id),
        EntityRef::Book(book_id),
        EntityRef::Account(account_id),
    ];

    for entity in entities {
        for user_id in [admin, collab, viewer, outsider] {
            let role = resolver::role_of(&store, entity, user_id).await.unwrap();
            let read = gate::can_read(&store, entity, user_id).await.unwrap();
            let write = gate::can_write(&store, entity, user_id).await.unwrap();
            let adm = gate::can_admin(&store, entity, user_id).await.unwrap();

            assert_eq!(read.allowed, role.is_some());
            assert_eq!(write.allowed, role.map(|r| r.can_write()).unwrap_or(false));
            assert_eq!(adm.allowed, role.map(|r| r.can_admin()).unwrap_or(false));
        }
    }
}

#[tokio::test]
async fn collaborator_can_write_but_not_admin_a_book() {
    let store = MemoryStore::new();
    let (_, book_id, _, _, collab, _) = seeded_team(&store).await;

    let write = gate::can_write(&store, EntityRef::Book(book_id), collab)
        .await
        .unwrap();
    assert!(write.allowed);

    let adm = gate::can_admin(&store, EntityRef::Book(book_id), collab)
        .await
        .unwrap();
    assert!(!adm.allowed);
    assert_eq!(adm.reason(), "insufficient privilege");
}

#[tokio::test]
async fn viewer_write_refused_with_write_access_required() {
    let store = MemoryStore::new();
    let (_, _, account_id, _, _, viewer) = seeded_team(&store).await;

    let write = gate::can_write(&store, EntityRef::Account(account_id), viewer)
        .await
        .unwrap();
    assert!(!write.allowed);
    assert_eq!(write.reason(), "write access required");
}

#[tokio::test]
async fn outsider_is_access_denied_not_insufficient() {
    let store = MemoryStore::new();
    let (team_id, book_id, _, _, _, _) = seeded_team(&store).await;
    let outsider = user(&store, "stranger@example.com").await;

    for entity in [EntityRef::Team(team_id), EntityRef::Book(book_id)] {
        let adm = gate::can_admin(&store, entity, outsider).await.unwrap();
        assert!(!adm.allowed);
        assert_eq!(adm.reason(), "access denied");
    }
}

#[tokio::test]
async fn nonexistent_and_nonpositive_ids_resolve_to_no_access() {
    let store = MemoryStore::new();
    let (_, _, _, admin, _, _) = seeded_team(&store).await;

    for entity in [
        EntityRef::Team(9999),
        EntityRef::Book(9999),
        EntityRef::Account(9999),
        EntityRef::Team(0),
        EntityRef::Book(-1),
    ] {
        assert!(resolver::role_of(&store, entity, admin).await.unwrap().is_none());
        let read = gate::can_read(&store, entity, admin).await.unwrap();
        assert!(!read.allowed);
        assert_eq!(read.reason(), "access denied");
    }
}

// ---- soft-delete visibility ----

#[tokio::test]
async fn soft_deleting_team_revokes_derived_access_everywhere() {
    let store = MemoryStore::new();
    let (team_id, book_id, account_id, admin, collab, viewer) = seeded_team(&store).await;

    lifecycle::soft_delete_team(&store, team_id, admin).await.unwrap();

    for user_id in [admin, collab, viewer] {
        for entity in [
            EntityRef::Team(team_id),
            EntityRef::Book(book_id),
            EntityRef::Account(account_id),
        ] {
            assert!(resolver::role_of(&store, entity, user_id).await.unwrap().is_none());
        }
        let read = gate::can_read(&store, EntityRef::Book(book_id), user_id)
            .await
            .unwrap();
        assert!(!read.allowed);
        assert_eq!(read.reason(), "access denied");
    }

    // Membership rows are untouched underneath
    assert_eq!(store.memberships_of_team(team_id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn restoring_team_reinstates_prior_roles_exactly() {
    let store = MemoryStore::new();
    let (team_id, book_id, _, admin, collab, viewer) = seeded_team(&store).await;

    lifecycle::soft_delete_team(&store, team_id, admin).await.unwrap();
    lifecycle::restore_team(&store, team_id, admin).await.unwrap();

    let entity = EntityRef::Book(book_id);
    assert_eq!(
        resolver::role_of(&store, entity, admin).await.unwrap(),
        Some(TeamRole::Admin)
    );
    assert_eq!(
        resolver::role_of(&store, entity, collab).await.unwrap(),
        Some(TeamRole::Collaborator)
    );
    assert_eq!(
        resolver::role_of(&store, entity, viewer).await.unwrap(),
        Some(TeamRole::Viewer)
    );
}

#[tokio::test]
async fn soft_deleted_book_hides_its_accounts_but_not_the_team() {
    let store = MemoryStore::new();
    let (team_id, book_id, account_id, admin, _, _) = seeded_team(&store).await;

    lifecycle::soft_delete_book(&store, book_id, admin).await.unwrap();

    assert!(resolver::role_of(&store, EntityRef::Book(book_id), admin)
        .await
        .unwrap()
        .is_none());
    assert!(resolver::role_of(&store, EntityRef::Account(account_id), admin)
        .await
        .unwrap()
        .is_none());
    assert_eq!(
        resolver::role_of(&store, EntityRef::Team(team_id), admin)
            .await
            .unwrap(),
        Some(TeamRole::Admin)
    );
}

#[tokio::test]
async fn only_admin_may_soft_delete_or_restore() {
    let store = MemoryStore::new();
    let (team_id, book_id, _, admin, collab, viewer) = seeded_team(&store).await;

    assert!(matches!(
        lifecycle::soft_delete_book(&store, book_id, collab).await,
        Err(EngineError::InsufficientRole("insufficient privilege"))
    ));
    assert!(matches!(
        lifecycle::soft_delete_team(&store, team_id, viewer).await,
        Err(EngineError::InsufficientRole("insufficient privilege"))
    ));

    lifecycle::soft_delete_team(&store, team_id, admin).await.unwrap();

    // Non-admins cannot restore either, and an outsider gets access denied
    assert!(matches!(
        lifecycle::restore_team(&store, team_id, collab).await,
        Err(EngineError::InsufficientRole("insufficient privilege"))
    ));
    let outsider = user(&store, "outsider@example.com").await;
    assert!(matches!(
        lifecycle::restore_team(&store, team_id, outsider).await,
        Err(EngineError::AccessDenied)
    ));

    lifecycle::restore_team(&store, team_id, admin).await.unwrap();
}

// ---- purge and restore edge cases ----

#[tokio::test]
async fn purge_requires_soft_deleted_state() {
    let store = MemoryStore::new();
    let (team_id, book_id, _, admin, _, _) = seeded_team(&store).await;

    assert!(matches!(
        lifecycle::purge_team(&store, team_id, admin).await,
        Err(EngineError::InvariantViolation("not deleted"))
    ));
    assert!(matches!(
        lifecycle::purge_book(&store, book_id, admin).await,
        Err(EngineError::InvariantViolation("not deleted"))
    ));

    lifecycle::soft_delete_book(&store, book_id, admin).await.unwrap();
    lifecycle::purge_book(&store, book_id, admin).await.unwrap();
    assert!(store.book_row(book_id).await.unwrap().is_none());
}

#[tokio::test]
async fn restoring_book_under_purged_team_is_not_found() {
    let store = MemoryStore::new();
    let (team_id, book_id, _, admin, _, _) = seeded_team(&store).await;

    lifecycle::soft_delete_book(&store, book_id, admin).await.unwrap();
    lifecycle::soft_delete_team(&store, team_id, admin).await.unwrap();
    lifecycle::purge_team(&store, team_id, admin).await.unwrap();

    assert!(matches!(
        lifecycle::restore_book(&store, book_id, admin).await,
        Err(EngineError::NotFound)
    ));
}

#[tokio::test]
async fn restoring_book_under_soft_deleted_team_is_not_found() {
    let store = MemoryStore::new();
    let (team_id, book_id, _, admin, _, _) = seeded_team(&store).await;

    lifecycle::soft_delete_book(&store, book_id, admin).await.unwrap();
    lifecycle::soft_delete_team(&store, team_id, admin).await.unwrap();

    assert!(matches!(
        lifecycle::restore_book(&store, book_id, admin).await,
        Err(EngineError::NotFound)
    ));

    // Once the team is back, the book can be restored
    lifecycle::restore_team(&store, team_id, admin).await.unwrap();
    let book = lifecycle::restore_book(&store, book_id, admin).await.unwrap();
    assert!(!book.is_deleted());
}

// ---- membership invariants ----

#[tokio::test]
async fn last_admin_cannot_be_demoted() {
    let store = MemoryStore::new();
    let (team_id, _, _, admin, _, _) = seeded_team(&store).await;

    let decision = guard::can_change_role(&store, team_id, admin, TeamRole::Viewer)
        .await
        .unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.reason(), "last admin");

    assert!(matches!(
        lifecycle::change_role(&store, team_id, admin, TeamRole::Viewer, admin).await,
        Err(EngineError::InvariantViolation("last admin"))
    ));
}

#[tokio::test]
async fn last_admin_cannot_be_removed() {
    let store = MemoryStore::new();
    let (team_id, _, _, admin, _, _) = seeded_team(&store).await;

    let decision = guard::can_remove_member(&store, team_id, admin).await.unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.reason(), "last admin");

    assert!(matches!(
        lifecycle::remove_member(&store, team_id, admin, admin).await,
        Err(EngineError::InvariantViolation("last admin"))
    ));
}

#[tokio::test]
async fn sole_member_cannot_be_removed() {
    let store = MemoryStore::new();
    let admin = user(&store, "solo@example.com").await;
    let team = lifecycle::create_team(&store, "solo", admin).await.unwrap();

    assert!(matches!(
        lifecycle::remove_member(&store, team.id, admin, admin).await,
        Err(EngineError::InvariantViolation("last member"))
    ));
}

#[tokio::test]
async fn demotion_allowed_once_second_admin_exists() {
    let store = MemoryStore::new();
    let (team_id, _, _, admin, collab, _) = seeded_team(&store).await;

    lifecycle::change_role(&store, team_id, collab, TeamRole::Admin, admin)
        .await
        .unwrap();
    let updated = lifecycle::change_role(&store, team_id, admin, TeamRole::Viewer, admin)
        .await
        .unwrap();
    assert_eq!(updated.role, TeamRole::Viewer);

    // The former admin is now a viewer and loses the admin surface
    assert!(matches!(
        lifecycle::remove_member(&store, team_id, collab, admin).await,
        Err(EngineError::InsufficientRole("insufficient privilege"))
    ));
}

#[tokio::test]
async fn team_always_retains_a_member_and_an_admin() {
    let store = MemoryStore::new();
    let (team_id, _, _, admin, collab, viewer) = seeded_team(&store).await;

    // Strip the team down as far as the guard permits
    lifecycle::remove_member(&store, team_id, viewer, admin).await.unwrap();
    lifecycle::remove_member(&store, team_id, collab, admin).await.unwrap();
    assert!(matches!(
        lifecycle::remove_member(&store, team_id, admin, admin).await,
        Err(EngineError::InvariantViolation(_))
    ));

    let snapshot = store.memberships_of_team(team_id).await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot.iter().any(|m| m.role == TeamRole::Admin));
}

#[tokio::test]
async fn concurrent_demotions_cannot_strand_a_team_without_an_admin() {
    let store = MemoryStore::new();
    let (team_id, _, _, admin, collab, _) = seeded_team(&store).await;

    lifecycle::change_role(&store, team_id, collab, TeamRole::Admin, admin)
        .await
        .unwrap();

    // Two demotions of the two admins race; the invariant re-check runs
    // under the store's lock, so at most one can commit.
    let (first, second) = tokio::join!(
        store.set_member_role_checked(team_id, admin, TeamRole::Viewer),
        store.set_member_role_checked(team_id, collab, TeamRole::Viewer),
    );
    let outcomes = [first.unwrap(), second.unwrap()];

    assert_eq!(
        outcomes.iter().filter(|o| **o == MemberWrite::Applied).count(),
        1
    );
    assert!(outcomes
        .iter()
        .any(|o| *o == MemberWrite::Refused(guard::GuardRefusal::LastAdmin)));

    let snapshot = store.memberships_of_team(team_id).await.unwrap();
    assert_eq!(
        snapshot.iter().filter(|m| m.role == TeamRole::Admin).count(),
        1
    );
}

#[tokio::test]
async fn concurrent_removals_leave_at_least_one_member() {
    let store = MemoryStore::new();
    let admin = user(&store, "one@example.com").await;
    let second = user(&store, "two@example.com").await;
    let team = lifecycle::create_team(&store, "pair", admin).await.unwrap();
    lifecycle::add_member(&store, team.id, second, TeamRole::Admin, admin)
        .await
        .unwrap();

    let (first, last) = tokio::join!(
        store.remove_member_checked(team.id, admin),
        store.remove_member_checked(team.id, second),
    );
    let outcomes = [first.unwrap(), last.unwrap()];

    assert_eq!(
        outcomes.iter().filter(|o| **o == MemberWrite::Applied).count(),
        1
    );
    assert!(outcomes
        .iter()
        .any(|o| matches!(o, MemberWrite::Refused(_))));
    assert_eq!(store.memberships_of_team(team.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn only_admin_may_mutate_membership() {
    let store = MemoryStore::new();
    let (team_id, _, _, _, collab, viewer) = seeded_team(&store).await;
    let newcomer = user(&store, "newcomer@example.com").await;

    assert!(matches!(
        lifecycle::add_member(&store, team_id, newcomer, TeamRole::Viewer, collab).await,
        Err(EngineError::InsufficientRole("insufficient privilege"))
    ));
    assert!(matches!(
        lifecycle::remove_member(&store, team_id, viewer, collab).await,
        Err(EngineError::InsufficientRole("insufficient privilege"))
    ));
}

#[tokio::test]
async fn membership_mutations_on_missing_rows_are_not_found() {
    let store = MemoryStore::new();
    let (team_id, _, _, admin, _, _) = seeded_team(&store).await;
    let outsider = user(&store, "never-joined@example.com").await;

    assert!(matches!(
        lifecycle::remove_member(&store, team_id, outsider, admin).await,
        Err(EngineError::NotFound)
    ));
    assert!(matches!(
        lifecycle::change_role(&store, team_id, outsider, TeamRole::Admin, admin).await,
        Err(EngineError::NotFound)
    ));
    assert!(matches!(
        lifecycle::add_member(&store, team_id, 424242, TeamRole::Viewer, admin).await,
        Err(EngineError::NotFound)
    ));
}

// ---- book creation gating ----

#[tokio::test]
async fn book_creation_requires_write_access() {
    let store = MemoryStore::new();
    let (team_id, _, _, _, collab, viewer) = seeded_team(&store).await;

    let book = lifecycle::create_book(&store, team_id, "shared", collab)
        .await
        .unwrap();
    assert_eq!(book.team_id, team_id);

    assert!(matches!(
        lifecycle::create_book(&store, team_id, "secret", viewer).await,
        Err(EngineError::InsufficientRole("write access required"))
    ));

    let outsider = user(&store, "outsider@example.com").await;
    assert!(matches!(
        lifecycle::create_book(&store, team_id, "theirs", outsider).await,
        Err(EngineError::AccessDenied)
    ));
}

#[tokio::test]
async fn book_creation_under_deleted_team_is_access_denied() {
    let store = MemoryStore::new();
    let (team_id, _, _, admin, _, _) = seeded_team(&store).await;

    lifecycle::soft_delete_team(&store, team_id, admin).await.unwrap();
    assert!(matches!(
        lifecycle::create_book(&store, team_id, "late", admin).await,
        Err(EngineError::AccessDenied)
    ));
}
