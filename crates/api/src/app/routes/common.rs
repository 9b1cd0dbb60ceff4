use ledgerdesk_auth::{CommandAuthorization, Permission};

use crate::app::errors;
use crate::context::RequestContext;

/// Associates the permissions an operation needs with its input.
pub struct CmdAuth<C = ()> {
    pub inner: C,
    pub required: Vec<Permission>,
}

impl CmdAuth<()> {
    pub fn new(permission: &'static str) -> Self {
        Self::wrap((), permission)
    }
}

impl<C> CmdAuth<C> {
    pub fn wrap(inner: C, permission: &'static str) -> Self {
        Self {
            inner,
            required: vec![Permission::new(permission)],
        }
    }

    /// Authorize against the caller, yielding the input on success.
    pub fn check(self, ctx: &RequestContext) -> Result<C, axum::response::Response> {
        crate::authz::authorize_command(ctx, &self).map_err(errors::authz_error_to_response)?;
        Ok(self.inner)
    }
}

impl<C> CommandAuthorization for CmdAuth<C> {
    fn required_permissions(&self) -> &[Permission] {
        &self.required
    }
}
