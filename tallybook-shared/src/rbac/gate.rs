/// Permission gate: the three decision procedures
///
/// Every route guards itself by calling exactly one of `can_read`,
/// `can_write`, or `can_admin`. Each answers with a [`Decision`] carrying
/// a reason from the closed taxonomy; denial is a routine value, never an
/// error.
///
/// The mapping from operation to minimum role:
///
/// | procedure   | minimum role  | denial below tier        |
/// |-------------|---------------|--------------------------|
/// | `can_read`  | viewer        | "access denied"          |
/// | `can_write` | collaborator  | "write access required"  |
/// | `can_admin` | admin         | "insufficient privilege" |
///
/// A reference whose ownership chain does not resolve (missing or
/// soft-deleted) denies with "access denied" for all three; lookups
/// under a dead chain return no access, not lower access, and the gate
/// does not reveal whether the entity ever existed.

use crate::rbac::decision::{reason, Decision, DenialKind};
use crate::rbac::resolver::{self, EntityRef};
use crate::store::{LedgerStore, StoreError};

/// May the user read the referenced entity?
///
/// Allowed iff the user holds any role in the governing team.
pub async fn can_read(
    store: &dyn LedgerStore,
    entity: EntityRef,
    user_id: i64,
) -> Result<Decision, StoreError> {
    let role = resolver::role_of(store, entity, user_id).await?;

    Ok(match role {
        Some(_) => Decision::allow(),
        None => Decision::deny(DenialKind::AccessDenied, reason::ACCESS_DENIED),
    })
}

/// May the user write ledger content under the referenced entity?
///
/// Allowed iff role ∈ {admin, collaborator}. A viewer is denied with
/// "write access required"; no role denies with "access denied".
pub async fn can_write(
    store: &dyn LedgerStore,
    entity: EntityRef,
    user_id: i64,
) -> Result<Decision, StoreError> {
    let role = resolver::role_of(store, entity, user_id).await?;

    Ok(match role {
        Some(role) if role.can_write() => Decision::allow(),
        Some(_) => Decision::deny(DenialKind::InsufficientRole, reason::WRITE_ACCESS_REQUIRED),
        None => Decision::deny(DenialKind::AccessDenied, reason::ACCESS_DENIED),
    })
}

/// May the user administer the referenced entity?
///
/// Allowed iff role = admin. Lower tiers are denied with "insufficient
/// privilege", distinguishing them from outsiders ("access denied").
pub async fn can_admin(
    store: &dyn LedgerStore,
    entity: EntityRef,
    user_id: i64,
) -> Result<Decision, StoreError> {
    let role = resolver::role_of(store, entity, user_id).await?;

    Ok(match role {
        Some(role) if role.can_admin() => Decision::allow(),
        Some(_) => Decision::deny(DenialKind::InsufficientRole, reason::INSUFFICIENT_PRIVILEGE),
        None => Decision::deny(DenialKind::AccessDenied, reason::ACCESS_DENIED),
    })
}
