use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Permission;

/// Role identifier carried in the token.
///
/// Unknown roles are not an error; they simply grant nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: &'static str = "admin";
    pub const ACCOUNTANT: &'static str = "accountant";
    pub const VIEWER: &'static str = "viewer";

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static role table.
pub fn permissions_for_role(role: &Role) -> Vec<Permission> {
    match role.as_str() {
        Role::ADMIN => vec![Permission::new(Permission::WILDCARD)],
        Role::ACCOUNTANT => Permission::WRITES.into_iter().map(Permission::new).collect(),
        Role::VIEWER => vec![Permission::new(Permission::TALLY_EXPORT)],
        _ => Vec::new(),
    }
}

/// Union of the permissions of every role, without duplicates.
pub fn permissions_from_roles(roles: &[Role]) -> Vec<Permission> {
    let mut out: Vec<Permission> = Vec::new();
    for perm in roles.iter().flat_map(permissions_for_role) {
        if !out.contains(&perm) {
            out.push(perm);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_is_wildcard() {
        let perms = permissions_for_role(&Role::new("admin"));
        assert_eq!(perms.len(), 1);
        assert!(perms[0].is_wildcard());
    }

    #[test]
    fn viewer_can_only_export() {
        let perms = permissions_for_role(&Role::new("viewer"));
        assert_eq!(perms, vec![Permission::new("tally.export")]);
    }

    #[test]
    fn roles_are_merged_without_duplicates() {
        let perms = permissions_from_roles(&[Role::new("accountant"), Role::new("viewer"), Role::new("intern")]);
        assert_eq!(perms.len(), Permission::WRITES.len());
        assert!(perms.contains(&Permission::new("vouchers.post")));
    }
}
