/// Authentication for Tallybook
///
/// JWT-based request authentication and Argon2id password storage.
///
/// # Modules
///
/// - `jwt`: token creation and validation (HS256, access + refresh)
/// - `password`: Argon2id hashing and verification
/// - `middleware`: Axum middleware that turns a Bearer token into an
///   [`middleware::AuthContext`] request extension
///
/// Authorization (who may touch which book) is a separate concern and
/// lives in [`crate::rbac`]; this module only establishes *who* is
/// calling.

pub mod jwt;
pub mod middleware;
pub mod password;
