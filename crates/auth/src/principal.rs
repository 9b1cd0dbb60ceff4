//! Who is calling, and what they hold in their tenant.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ledgerdesk_core::TenantId;

use crate::{Permission, Role, permissions_from_roles};

/// Token subject. Opaque to the books; only logged and echoed by `whoami`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(Uuid);

impl PrincipalId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for PrincipalId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for PrincipalId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl core::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::str::FromStr for PrincipalId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Roles held in one tenant, with the permissions they expand to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantMembership {
    pub tenant_id: TenantId,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
}

impl TenantMembership {
    pub fn from_roles(tenant_id: TenantId, roles: Vec<Role>) -> Self {
        Self {
            tenant_id,
            permissions: permissions_from_roles(&roles),
            roles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_roles_grant_nothing() {
        let m = TenantMembership::from_roles(TenantId::new(), vec![Role::new("auditor-in-training")]);
        assert!(m.permissions.is_empty());
    }

    #[test]
    fn principal_id_parses_its_display() {
        let id = PrincipalId::new();
        assert_eq!(id.to_string().parse::<PrincipalId>().unwrap(), id);
    }
}
