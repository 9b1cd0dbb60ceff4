use ledgerdesk_auth::{PrincipalId, Role};
use ledgerdesk_core::TenantId;

/// Who is calling and for which tenant, taken from the verified token.
///
/// Inserted by the auth middleware; every protected handler reads the tenant
/// from here and never from the request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    tenant_id: TenantId,
    principal_id: PrincipalId,
    roles: Vec<Role>,
}

impl RequestContext {
    pub fn new(tenant_id: TenantId, principal_id: PrincipalId, roles: Vec<Role>) -> Self {
        Self {
            tenant_id,
            principal_id,
            roles,
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn principal_id(&self) -> PrincipalId {
        self.principal_id
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }
}
