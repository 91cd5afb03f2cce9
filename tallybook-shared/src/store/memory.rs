/// In-memory store for tests
///
/// HashMap-backed implementation of [`LedgerStore`]. The whole state sits
/// behind one mutex, so every operation is atomic by construction and the
/// transactional contract of the `*_checked` mutations holds trivially.
///
/// Not intended for production use.

use std::collections::HashMap;
use std::sync::Mutex;

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
use crate::rbac::guard;

use super::{LedgerStore, MemberWrite, StoreError};

#[derive(Debug, Default)]
struct State {
    users: HashMap<i64, User>,
    teams: HashMap<i64, Team>,
    memberships: HashMap<(i64, i64), Membership>,
    books: HashMap<i64, Book>,
    accounts: HashMap<i64, Account>,
    categories: HashMap<i64, Category>,
    transactions: HashMap<i64, Transaction>,
    next_id: i64,
}

impl State {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn team_snapshot(&self, team_id: i64) -> Vec<Membership> {
        let mut rows: Vec<Membership> = self
            .memberships
            .values()
            .filter(|m| m.team_id == team_id)
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.user_id);
        rows
    }

    fn purge_book_rows(&mut self, book_id: i64) {
        let account_ids: Vec<i64> = self
            .accounts
            .values()
            .filter(|a| a.book_id == book_id)
            .map(|a| a.id)
            .collect();
        self.transactions
            .retain(|_, t| !account_ids.contains(&t.account_id));
        self.accounts.retain(|_, a| a.book_id != book_id);
        self.categories.retain(|_, c| c.book_id != book_id);
        self.books.remove(&book_id);
    }
}

/// HashMap-backed [`LedgerStore`] for tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Backend("memory store mutex poisoned".to_string()))
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }

    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError> {
        let mut state = self.lock()?;
        if state.users.values().any(|u| u.email == data.email) {
            return Err(StoreError::Backend(format!(
                "duplicate email: {}",
                data.email
            )));
        }
        let now = Utc::now();
        let id = state.allocate_id();
        let user = User {
            id,
            email: data.email,
            password_hash: data.password_hash,
            name: data.name,
            superadmin: false,
            active: true,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };
        state.users.insert(id, user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn touch_last_login(&self, id: i64) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if let Some(user) = state.users.get_mut(&id) {
            user.last_login_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn team_row(&self, id: i64) -> Result<Option<Team>, StoreError> {
        Ok(self.lock()?.teams.get(&id).cloned())
    }

    async fn book_row(&self, id: i64) -> Result<Option<Book>, StoreError> {
        Ok(self.lock()?.books.get(&id).cloned())
    }

    async fn account_row(&self, id: i64) -> Result<Option<Account>, StoreError> {
        Ok(self.lock()?.accounts.get(&id).cloned())
    }

    async fn membership(
        &self,
        team_id: i64,
        user_id: i64,
    ) -> Result<Option<Membership>, StoreError> {
        Ok(self.lock()?.memberships.get(&(team_id, user_id)).cloned())
    }

    async fn memberships_of_team(&self, team_id: i64) -> Result<Vec<Membership>, StoreError> {
        Ok(self.lock()?.team_snapshot(team_id))
    }

    async fn memberships_of_user(&self, user_id: i64) -> Result<Vec<Membership>, StoreError> {
        let state = self.lock()?;
        let mut rows: Vec<Membership> = state
            .memberships
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.team_id);
        Ok(rows)
    }

    async fn add_member(
        &self,
        team_id: i64,
        user_id: i64,
        role: TeamRole,
    ) -> Result<Membership, StoreError> {
        let mut state = self.lock()?;
        if state.memberships.contains_key(&(team_id, user_id)) {
            return Err(StoreError::Backend(format!(
                "duplicate membership: team {} user {}",
                team_id, user_id
            )));
        }
        let row = Membership::new(team_id, user_id, role);
        state.memberships.insert((team_id, user_id), row.clone());
        Ok(row)
    }

    async fn remove_member_checked(
        &self,
        team_id: i64,
        user_id: i64,
    ) -> Result<MemberWrite, StoreError> {
        let mut state = self.lock()?;
        if !state.memberships.contains_key(&(team_id, user_id)) {
            return Ok(MemberWrite::Missing);
        }
        let snapshot = state.team_snapshot(team_id);
        if let Err(refusal) = guard::check_remove(&snapshot, user_id) {
            return Ok(MemberWrite::Refused(refusal));
        }
        state.memberships.remove(&(team_id, user_id));
        Ok(MemberWrite::Applied)
    }

    async fn set_member_role_checked(
        &self,
        team_id: i64,
        user_id: i64,
        role: TeamRole,
    ) -> Result<MemberWrite, StoreError> {
        let mut state = self.lock()?;
        if !state.memberships.contains_key(&(team_id, user_id)) {
            return Ok(MemberWrite::Missing);
        }
        let snapshot = state.team_snapshot(team_id);
        if let Err(refusal) = guard::check_role_change(&snapshot, user_id, role) {
            return Ok(MemberWrite::Refused(refusal));
        }
        if let Some(row) = state.memberships.get_mut(&(team_id, user_id)) {
            row.role = role;
        }
        Ok(MemberWrite::Applied)
    }

    async fn create_team_with_admin(
        &self,
        name: &str,
        creator_id: i64,
    ) -> Result<Team, StoreError> {
        let mut state = self.lock()?;
        let now = Utc::now();
        let id = state.allocate_id();
        let team = Team {
            id,
            name: name.to_string(),
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        state.teams.insert(id, team.clone());
        state
            .memberships
            .insert((id, creator_id), Membership::new(id, creator_id, TeamRole::Admin));
        Ok(team)
    }

    async fn set_team_deleted(
        &self,
        id: i64,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Team>, StoreError> {
        let mut state = self.lock()?;
        if let Some(team) = state.teams.get_mut(&id) {
            team.deleted_at = deleted_at;
            team.updated_at = Utc::now();
            return Ok(Some(team.clone()));
        }
        Ok(None)
    }

    async fn purge_team(&self, id: i64) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        if state.teams.remove(&id).is_none() {
            return Ok(false);
        }
        state.memberships.retain(|(team_id, _), _| *team_id != id);
        let book_ids: Vec<i64> = state
            .books
            .values()
            .filter(|b| b.team_id == id)
            .map(|b| b.id)
            .collect();
        for book_id in book_ids {
            state.purge_book_rows(book_id);
        }
        Ok(true)
    }

    async fn create_book(&self, team_id: i64, name: &str) -> Result<Book, StoreError> {
        let mut state = self.lock()?;
        let now = Utc::now();
        let id = state.allocate_id();
        let book = Book {
            id,
            team_id,
            name: name.to_string(),
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        state.books.insert(id, book.clone());
        Ok(book)
    }

    async fn books_of_team(&self, team_id: i64) -> Result<Vec<Book>, StoreError> {
        let state = self.lock()?;
        let mut rows: Vec<Book> = state
            .books
            .values()
            .filter(|b| b.team_id == team_id)
            .cloned()
            .collect();
        rows.sort_by_key(|b| b.id);
        Ok(rows)
    }

    async fn set_book_deleted(
        &self,
        id: i64,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Book>, StoreError> {
        let mut state = self.lock()?;
        if let Some(book) = state.books.get_mut(&id) {
            book.deleted_at = deleted_at;
            book.updated_at = Utc::now();
            return Ok(Some(book.clone()));
        }
        Ok(None)
    }

    async fn purge_book(&self, id: i64) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        if !state.books.contains_key(&id) {
            return Ok(false);
        }
        state.purge_book_rows(id);
        Ok(true)
    }

    async fn create_account(&self, book_id: i64, name: &str) -> Result<Account, StoreError> {
        let mut state = self.lock()?;
        let id = state.allocate_id();
        let account = Account {
            id,
            book_id,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        state.accounts.insert(id, account.clone());
        Ok(account)
    }

    async fn accounts_of_book(&self, book_id: i64) -> Result<Vec<Account>, StoreError> {
        let state = self.lock()?;
        let mut rows: Vec<Account> = state
            .accounts
            .values()
            .filter(|a| a.book_id == book_id)
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.id);
        Ok(rows)
    }

    async fn create_category(&self, data: CreateCategory) -> Result<Category, StoreError> {
        let mut state = self.lock()?;
        let id = state.allocate_id();
        let category = Category {
            id,
            book_id: data.book_id,
            name: data.name,
            parent_category_id: data.parent_category_id,
            created_at: Utc::now(),
        };
        state.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn categories_of_book(&self, book_id: i64) -> Result<Vec<Category>, StoreError> {
        let state = self.lock()?;
        let mut rows: Vec<Category> = state
            .categories
            .values()
            .filter(|c| c.book_id == book_id)
            .cloned()
            .collect();
        rows.sort_by_key(|c| c.id);
        Ok(rows)
    }

    async fn category_row(&self, id: i64) -> Result<Option<Category>, StoreError> {
        Ok(self.lock()?.categories.get(&id).cloned())
    }

    async fn set_category_parent(
        &self,
        id: i64,
        parent: Option<i64>,
    ) -> Result<Option<Category>, StoreError> {
        let mut state = self.lock()?;
        if let Some(category) = state.categories.get_mut(&id) {
            category.parent_category_id = parent;
            return Ok(Some(category.clone()));
        }
        Ok(None)
    }

    async fn create_transaction(
        &self,
        data: CreateTransaction,
    ) -> Result<Transaction, StoreError> {
        let mut state = self.lock()?;
        let id = state.allocate_id();
        let row = Transaction {
            id,
            account_id: data.account_id,
            category_id: data.category_id,
            amount_cents: data.amount_cents,
            memo: data.memo,
            occurred_at: data.occurred_at,
            created_at: Utc::now(),
        };
        state.transactions.insert(id, row.clone());
        Ok(row)
    }

    async fn transactions_of_account(
        &self,
        account_id: i64,
    ) -> Result<Vec<Transaction>, StoreError> {
        let state = self.lock()?;
        let mut rows: Vec<Transaction> = state
            .transactions
            .values()
            .filter(|t| t.account_id == account_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_team_enrolls_admin() {
        let store = MemoryStore::new();
        let team = store.create_team_with_admin("household", 7).await.unwrap();
        let member = store.membership(team.id, 7).await.unwrap().unwrap();
        assert_eq!(member.role, TeamRole::Admin);
    }

    #[tokio::test]
    async fn test_remove_last_member_refused() {
        let store = MemoryStore::new();
        let team = store.create_team_with_admin("solo", 1).await.unwrap();
        let outcome = store.remove_member_checked(team.id, 1).await.unwrap();
        assert_eq!(
            outcome,
            MemberWrite::Refused(crate::rbac::guard::GuardRefusal::LastMember)
        );
        assert!(store.membership(team.id, 1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_team_removes_dependents() {
        let store = MemoryStore::new();
        let team = store.create_team_with_admin("t", 1).await.unwrap();
        let book = store.create_book(team.id, "b").await.unwrap();
        let account = store.create_account(book.id, "cash").await.unwrap();
        store
            .create_transaction(CreateTransaction {
                account_id: account.id,
                category_id: None,
                amount_cents: -500,
                memo: None,
                occurred_at: Utc::now(),
            })
            .await
            .unwrap();

        assert!(store.purge_team(team.id).await.unwrap());
        assert!(store.team_row(team.id).await.unwrap().is_none());
        assert!(store.book_row(book.id).await.unwrap().is_none());
        assert!(store.account_row(account.id).await.unwrap().is_none());
        assert!(store
            .transactions_of_account(account.id)
            .await
            .unwrap()
            .is_empty());
    }
}
