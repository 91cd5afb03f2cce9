/// API route handlers
///
/// Organized by resource:
///
/// - `health`: health check endpoint
/// - `auth`: authentication endpoints (register, login, refresh)
/// - `teams`: team lifecycle and membership management
/// - `books`: book lifecycle
/// - `ledger`: accounts, categories, and transactions

pub mod auth;
pub mod books;
pub mod health;
pub mod ledger;
pub mod teams;
