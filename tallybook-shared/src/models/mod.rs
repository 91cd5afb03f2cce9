/// Typed rows for the Tallybook data model
///
/// Every boundary function in this crate returns one of these types (or
/// `None`), never a loosely-shaped row. All ids are `i64` (BIGSERIAL).
///
/// # Models
///
/// - `user`: accounts that authenticate against the API
/// - `team`: tenancy boundary owning books; soft-deletable
/// - `membership`: the (team, user, role) grant, the sole source of permission
/// - `book`: ledger/workspace owned by one team; soft-deletable
/// - `account`: a ledger account within a book
/// - `category`: book-scoped category tree (validated, not schema-enforced)
/// - `transaction`: a ledger entry against an account

pub mod account;
pub mod book;
pub mod category;
pub mod membership;
pub mod team;
pub mod transaction;
pub mod user;
