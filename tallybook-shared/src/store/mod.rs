/// Storage abstraction for Tallybook
///
/// The RBAC engine never touches a concrete database handle: every
/// component receives a `&dyn LedgerStore`, so tests can substitute the
/// in-memory implementation and production injects the Postgres one.
///
/// # Contract
///
/// All implementations must:
/// 1. Return raw rows without visibility filtering; soft-delete rules
///    live in `rbac::lookup`/`rbac::cascade`, nowhere else.
/// 2. Execute the `*_checked` membership mutations atomically: snapshot,
///    invariant re-check, and write happen in one transaction (or under
///    one lock), so concurrent mutations cannot strand a team with zero
///    admins or zero members.
/// 3. Make `create_team_with_admin` and the purge operations single
///    atomic units; a failure mid-way must leave no partial state.
/// 4. Surface backend failures as `StoreError`, the only fatal path in
///    the error taxonomy.
///
/// # Implementations
///
/// - [`postgres::PgStore`]: sqlx/PostgreSQL, the production store
/// - [`memory::MemoryStore`]: HashMap-backed fake for tests

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    account::Account,
    book::Book,
    category::{Category, CreateCategory},
    membership::{Membership, TeamRole},
    team::Team,
    transaction::{CreateTransaction, Transaction},
    user::{CreateUser, User},
};
use crate::rbac::guard::GuardRefusal;

/// Error type for storage operations
///
/// This is the only error kind in the system that propagates as a fatal
/// failure; everything else (denied access, missing rows, invariant
/// refusals) is a structured value the caller branches on.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing database failed
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A non-database backend failed (in-memory poisoning, etc.)
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Outcome of a guarded membership mutation
///
/// The snapshot re-check runs inside the store's transaction immediately
/// before the write, so a `Refused` here is authoritative, not advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberWrite {
    /// The mutation was committed
    Applied,

    /// The invariant check refused the mutation; nothing was written
    Refused(GuardRefusal),

    /// The target membership row does not exist
    Missing,
}

/// Row-level storage interface consumed by the RBAC engine and routes
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Verifies the backend is reachable, for health checks
    async fn ping(&self) -> Result<(), StoreError>;

    // ---- users ----

    /// Inserts a user row
    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError>;

    /// Fetches a user by id
    async fn user_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;

    /// Fetches a user by email
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Stamps `last_login_at` with the current time
    async fn touch_last_login(&self, id: i64) -> Result<(), StoreError>;

    // ---- raw entity rows (no visibility filtering) ----

    /// Fetches a team row, deleted or not
    async fn team_row(&self, id: i64) -> Result<Option<Team>, StoreError>;

    /// Fetches a book row, deleted or not
    async fn book_row(&self, id: i64) -> Result<Option<Book>, StoreError>;

    /// Fetches an account row
    async fn account_row(&self, id: i64) -> Result<Option<Account>, StoreError>;

    // ---- memberships ----

    /// Fetches the membership for a (team, user) pair
    async fn membership(&self, team_id: i64, user_id: i64)
        -> Result<Option<Membership>, StoreError>;

    /// Lists all memberships of a team
    async fn memberships_of_team(&self, team_id: i64) -> Result<Vec<Membership>, StoreError>;

    /// Lists all memberships of a user across teams
    async fn memberships_of_user(&self, user_id: i64) -> Result<Vec<Membership>, StoreError>;

    /// Inserts a membership row
    ///
    /// Fails with a database error on a duplicate (team, user) pair; the
    /// composite primary key is the uniqueness guarantee.
    async fn add_member(
        &self,
        team_id: i64,
        user_id: i64,
        role: TeamRole,
    ) -> Result<Membership, StoreError>;

    /// Removes a membership after re-checking the team invariants
    /// atomically with the delete
    async fn remove_member_checked(
        &self,
        team_id: i64,
        user_id: i64,
    ) -> Result<MemberWrite, StoreError>;

    /// Changes a membership role after re-checking the team invariants
    /// atomically with the update
    async fn set_member_role_checked(
        &self,
        team_id: i64,
        user_id: i64,
        role: TeamRole,
    ) -> Result<MemberWrite, StoreError>;

    // ---- teams ----

    /// Creates a team and enrolls the creator as admin in one atomic unit
    async fn create_team_with_admin(
        &self,
        name: &str,
        creator_id: i64,
    ) -> Result<Team, StoreError>;

    /// Sets or clears a team's `deleted_at`, returning the updated row
    async fn set_team_deleted(
        &self,
        id: i64,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Team>, StoreError>;

    /// Permanently deletes a team and every dependent row (memberships,
    /// books, accounts, categories, transactions) in one atomic unit
    async fn purge_team(&self, id: i64) -> Result<bool, StoreError>;

    // ---- books ----

    /// Inserts a book row under a team
    async fn create_book(&self, team_id: i64, name: &str) -> Result<Book, StoreError>;

    /// Lists the books of a team, deleted rows included
    async fn books_of_team(&self, team_id: i64) -> Result<Vec<Book>, StoreError>;

    /// Sets or clears a book's `deleted_at`, returning the updated row
    async fn set_book_deleted(
        &self,
        id: i64,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Book>, StoreError>;

    /// Permanently deletes a book and its accounts, categories, and
    /// transactions in one atomic unit
    async fn purge_book(&self, id: i64) -> Result<bool, StoreError>;

    // ---- ledger content ----

    /// Inserts an account row
    async fn create_account(&self, book_id: i64, name: &str) -> Result<Account, StoreError>;

    /// Lists the accounts of a book
    async fn accounts_of_book(&self, book_id: i64) -> Result<Vec<Account>, StoreError>;

    /// Inserts a category row (parent validation happens in the caller
    /// against a fresh snapshot)
    async fn create_category(&self, data: CreateCategory) -> Result<Category, StoreError>;

    /// Lists the categories of a book
    async fn categories_of_book(&self, book_id: i64) -> Result<Vec<Category>, StoreError>;

    /// Fetches a category by id
    async fn category_row(&self, id: i64) -> Result<Option<Category>, StoreError>;

    /// Re-parents a category, returning the updated row
    async fn set_category_parent(
        &self,
        id: i64,
        parent: Option<i64>,
    ) -> Result<Option<Category>, StoreError>;

    /// Inserts a transaction row
    async fn create_transaction(
        &self,
        data: CreateTransaction,
    ) -> Result<Transaction, StoreError>;

    /// Lists the transactions of an account, newest first
    async fn transactions_of_account(
        &self,
        account_id: i64,
    ) -> Result<Vec<Transaction>, StoreError>;
}
