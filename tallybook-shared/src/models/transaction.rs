/// Transaction model
///
/// A transaction belongs to one account and optionally one category.
/// Amounts are stored as integer cents; sign conventions (debit vs.
/// credit) are not interpreted by this subsystem.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE transaction (
///     id BIGSERIAL PRIMARY KEY,
///     account_id BIGINT NOT NULL REFERENCES account(id),
///     category_id BIGINT REFERENCES category(id),
///     amount_cents BIGINT NOT NULL,
///     memo TEXT,
///     occurred_at TIMESTAMPTZ NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A ledger entry against an account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Transaction {
    /// Unique transaction id
    pub id: i64,

    /// Owning account
    pub account_id: i64,

    /// Optional category within the account's book
    pub category_id: Option<i64>,

    /// Amount in integer cents
    pub amount_cents: i64,

    /// Free-form note
    pub memo: Option<String>,

    /// When the transaction occurred
    pub occurred_at: DateTime<Utc>,

    /// When the row was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating a transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransaction {
    /// Owning account
    pub account_id: i64,

    /// Optional category
    pub category_id: Option<i64>,

    /// Amount in integer cents
    pub amount_cents: i64,

    /// Free-form note
    pub memo: Option<String>,

    /// When the transaction occurred
    pub occurred_at: DateTime<Utc>,
}
