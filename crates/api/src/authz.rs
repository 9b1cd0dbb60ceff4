//! Permission guard applied by handlers before they call the books service.

use ledgerdesk_auth::{AuthzError, CommandAuthorization, Principal, TenantMembership, authorize};

use crate::context::RequestContext;

/// Check every permission `command` requires in the current request context.
pub fn authorize_command<C: CommandAuthorization>(ctx: &RequestContext, command: &C) -> Result<(), AuthzError> {
    let principal = Principal {
        principal_id: ctx.principal_id(),
        active_tenant_id: ctx.tenant_id(),
        membership: TenantMembership::from_roles(ctx.tenant_id(), ctx.roles().to_vec()),
    };

    for perm in command.required_permissions() {
        authorize(&principal, perm)?;
    }

    Ok(())
}
