/// Hierarchical role-based access control
///
/// Tallybook's RBAC engine resolves a user's effective permission across
/// the multi-hop ownership chain (transaction → account → book → team →
/// membership) and treats soft-deletion as a first-class state that
/// silently revokes access without destroying history.
///
/// # Components, leaf-first
///
/// - [`lookup`]: entity resolution with centralized soft-delete
///   visibility, the only place `deleted_at` is interpreted
/// - [`cascade`]: walks Account → Book → Team to find the governing team
/// - [`resolver`]: the single source of truth for effective roles
/// - [`gate`]: the three decision procedures routes call
/// - [`guard`]: structural invariants for membership mutations
/// - [`decision`]: decision values and the closed reason taxonomy
///
/// # Example
///
/// ```no_run
/// use tallybook_shared::rbac::{gate, resolver::EntityRef};
/// use tallybook_shared::store::LedgerStore;
///
/// # async fn example(store: &dyn LedgerStore) -> Result<(), Box<dyn std::error::Error>> {
/// let decision = gate::can_write(store, EntityRef::Account(10), 42).await?;
/// if !decision.allowed {
///     println!("denied: {}", decision.reason());
/// }
/// # Ok(())
/// # }
/// ```

pub mod cascade;
pub mod decision;
pub mod gate;
pub mod guard;
pub mod lookup;
pub mod resolver;
