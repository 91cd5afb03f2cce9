//! # Tallybook Shared Library
//!
//! Core types and business logic shared between the Tallybook API server
//! and supporting tooling. The heart of the crate is the hierarchical
//! RBAC engine in [`rbac`]: a user's effective permission on any ledger
//! entity is their membership role in the team that (transitively) owns
//! it, with soft-deletion silently revoking derived access.
//!
//! ## Module Organization
//!
//! - `models`: database models (users, teams, memberships, ledger rows)
//! - `store`: the [`store::LedgerStore`] abstraction with Postgres and
//!   in-memory implementations
//! - `rbac`: lookup, cascade, role resolution, permission gate, and the
//!   membership invariant guard
//! - `lifecycle`: soft-delete / restore / purge transitions
//! - `auth`: JWT authentication and Argon2id password storage
//! - `db`: connection pool and migrations
//! - `error`: the engine error taxonomy

pub mod auth;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod rbac;
pub mod store;

/// Current version of the Tallybook shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
