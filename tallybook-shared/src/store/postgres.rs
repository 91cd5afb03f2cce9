/// PostgreSQL store
///
/// Production implementation of [`LedgerStore`] over a sqlx `PgPool`.
/// Explicit column lists everywhere; `SELECT ... FOR UPDATE` inside the
/// `*_checked` membership mutations so the invariant snapshot cannot go
/// stale between the check and the write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

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

/// sqlx-backed [`LedgerStore`]
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wraps an existing connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool, for health checks
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Locks and returns a team's membership snapshot inside `tx`
    async fn locked_snapshot(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        team_id: i64,
    ) -> Result<Vec<Membership>, sqlx::Error> {
        sqlx::query_as::<_, Membership>(
            r#"
            SELECT team_id, user_id, role, created_at
            FROM team_user
            WHERE team_id = $1
            ORDER BY user_id
            FOR UPDATE
            "#,
        )
        .bind(team_id)
        .fetch_all(&mut **tx)
        .await
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        crate::db::pool::health_check(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, name)
            VALUES ($1, $2, $3)
            RETURNING id, email, password_hash, name, superadmin, active,
                      created_at, updated_at, last_login_at
            "#,
        )
        .bind(&data.email)
        .bind(&data.password_hash)
        .bind(&data.name)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, name, superadmin, active,
                   created_at, updated_at, last_login_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, name, superadmin, active,
                   created_at, updated_at, last_login_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn touch_last_login(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET last_login_at = NOW(), updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn team_row(&self, id: i64) -> Result<Option<Team>, StoreError> {
        let team = sqlx::query_as::<_, Team>(
            r#"
            SELECT id, name, deleted_at, created_at, updated_at
            FROM team
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(team)
    }

    async fn book_row(&self, id: i64) -> Result<Option<Book>, StoreError> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            SELECT id, team_id, name, deleted_at, created_at, updated_at
            FROM book
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    async fn account_row(&self, id: i64) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, book_id, name, created_at
            FROM account
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn membership(
        &self,
        team_id: i64,
        user_id: i64,
    ) -> Result<Option<Membership>, StoreError> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            SELECT team_id, user_id, role, created_at
            FROM team_user
            WHERE team_id = $1 AND user_id = $2
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(membership)
    }

    async fn memberships_of_team(&self, team_id: i64) -> Result<Vec<Membership>, StoreError> {
        let memberships = sqlx::query_as::<_, Membership>(
            r#"
            SELECT team_id, user_id, role, created_at
            FROM team_user
            WHERE team_id = $1
            ORDER BY user_id
            "#,
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(memberships)
    }

    async fn memberships_of_user(&self, user_id: i64) -> Result<Vec<Membership>, StoreError> {
        let memberships = sqlx::query_as::<_, Membership>(
            r#"
            SELECT team_id, user_id, role, created_at
            FROM team_user
            WHERE user_id = $1
            ORDER BY team_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(memberships)
    }

    async fn add_member(
        &self,
        team_id: i64,
        user_id: i64,
        role: TeamRole,
    ) -> Result<Membership, StoreError> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO team_user (team_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING team_id, user_id, role, created_at
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;

        Ok(membership)
    }

    async fn remove_member_checked(
        &self,
        team_id: i64,
        user_id: i64,
    ) -> Result<MemberWrite, StoreError> {
        let mut tx = self.pool.begin().await?;

        let snapshot = Self::locked_snapshot(&mut tx, team_id).await?;
        if !snapshot.iter().any(|m| m.user_id == user_id) {
            return Ok(MemberWrite::Missing);
        }
        if let Err(refusal) = guard::check_remove(&snapshot, user_id) {
            return Ok(MemberWrite::Refused(refusal));
        }

        sqlx::query("DELETE FROM team_user WHERE team_id = $1 AND user_id = $2")
            .bind(team_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(MemberWrite::Applied)
    }

    async fn set_member_role_checked(
        &self,
        team_id: i64,
        user_id: i64,
        role: TeamRole,
    ) -> Result<MemberWrite, StoreError> {
        let mut tx = self.pool.begin().await?;

        let snapshot = Self::locked_snapshot(&mut tx, team_id).await?;
        if !snapshot.iter().any(|m| m.user_id == user_id) {
            return Ok(MemberWrite::Missing);
        }
        if let Err(refusal) = guard::check_role_change(&snapshot, user_id, role) {
            return Ok(MemberWrite::Refused(refusal));
        }

        sqlx::query("UPDATE team_user SET role = $3 WHERE team_id = $1 AND user_id = $2")
            .bind(team_id)
            .bind(user_id)
            .bind(role)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(MemberWrite::Applied)
    }

    async fn create_team_with_admin(
        &self,
        name: &str,
        creator_id: i64,
    ) -> Result<Team, StoreError> {
        let mut tx = self.pool.begin().await?;

        let team = sqlx::query_as::<_, Team>(
            r#"
            INSERT INTO team (name)
            VALUES ($1)
            RETURNING id, name, deleted_at, created_at, updated_at
            "#,
        )
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO team_user (team_id, user_id, role) VALUES ($1, $2, 'admin')")
            .bind(team.id)
            .bind(creator_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(team)
    }

    async fn set_team_deleted(
        &self,
        id: i64,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Team>, StoreError> {
        let team = sqlx::query_as::<_, Team>(
            r#"
            UPDATE team
            SET deleted_at = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, deleted_at, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(deleted_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(team)
    }

    async fn purge_team(&self, id: i64) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM transaction
            WHERE account_id IN (
                SELECT a.id FROM account a
                JOIN book b ON b.id = a.book_id
                WHERE b.team_id = $1
            )
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "DELETE FROM account WHERE book_id IN (SELECT id FROM book WHERE team_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "DELETE FROM category WHERE book_id IN (SELECT id FROM book WHERE team_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM book WHERE team_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM team_user WHERE team_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM team WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_book(&self, team_id: i64, name: &str) -> Result<Book, StoreError> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO book (team_id, name)
            VALUES ($1, $2)
            RETURNING id, team_id, name, deleted_at, created_at, updated_at
            "#,
        )
        .bind(team_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(book)
    }

    async fn books_of_team(&self, team_id: i64) -> Result<Vec<Book>, StoreError> {
        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT id, team_id, name, deleted_at, created_at, updated_at
            FROM book
            WHERE team_id = $1
            ORDER BY id
            "#,
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    async fn set_book_deleted(
        &self,
        id: i64,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Book>, StoreError> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE book
            SET deleted_at = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, team_id, name, deleted_at, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(deleted_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    async fn purge_book(&self, id: i64) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM transaction WHERE account_id IN (SELECT id FROM account WHERE book_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM account WHERE book_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM category WHERE book_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM book WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_account(&self, book_id: i64, name: &str) -> Result<Account, StoreError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO account (book_id, name)
            VALUES ($1, $2)
            RETURNING id, book_id, name, created_at
            "#,
        )
        .bind(book_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(account)
    }

    async fn accounts_of_book(&self, book_id: i64) -> Result<Vec<Account>, StoreError> {
        let accounts = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, book_id, name, created_at
            FROM account
            WHERE book_id = $1
            ORDER BY id
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }

    async fn create_category(&self, data: CreateCategory) -> Result<Category, StoreError> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO category (book_id, name, parent_category_id)
            VALUES ($1, $2, $3)
            RETURNING id, book_id, name, parent_category_id, created_at
            "#,
        )
        .bind(data.book_id)
        .bind(&data.name)
        .bind(data.parent_category_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(category)
    }

    async fn categories_of_book(&self, book_id: i64) -> Result<Vec<Category>, StoreError> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, book_id, name, parent_category_id, created_at
            FROM category
            WHERE book_id = $1
            ORDER BY id
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    async fn category_row(&self, id: i64) -> Result<Option<Category>, StoreError> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, book_id, name, parent_category_id, created_at
            FROM category
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    async fn set_category_parent(
        &self,
        id: i64,
        parent: Option<i64>,
    ) -> Result<Option<Category>, StoreError> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            UPDATE category
            SET parent_category_id = $2
            WHERE id = $1
            RETURNING id, book_id, name, parent_category_id, created_at
            "#,
        )
        .bind(id)
        .bind(parent)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    async fn create_transaction(
        &self,
        data: CreateTransaction,
    ) -> Result<Transaction, StoreError> {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transaction (account_id, category_id, amount_cents, memo, occurred_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, account_id, category_id, amount_cents, memo, occurred_at, created_at
            "#,
        )
        .bind(data.account_id)
        .bind(data.category_id)
        .bind(data.amount_cents)
        .bind(&data.memo)
        .bind(data.occurred_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(transaction)
    }

    async fn transactions_of_account(
        &self,
        account_id: i64,
    ) -> Result<Vec<Transaction>, StoreError> {
        let transactions = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, account_id, category_id, amount_cents, memo, occurred_at, created_at
            FROM transaction
            WHERE account_id = $1
            ORDER BY occurred_at DESC, id DESC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }
}
