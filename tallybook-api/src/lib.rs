//! # Tallybook API Server Library
//!
//! HTTP surface for Tallybook. Handlers are deliberately thin: each one
//! authenticates the caller, asks the RBAC engine for a decision or a
//! lifecycle transition, and performs at most one store operation.
//!
//! ## Modules
//!
//! - `app`: application state and router builder
//! - `config`: configuration management
//! - `error`: error handling and HTTP response mapping
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
