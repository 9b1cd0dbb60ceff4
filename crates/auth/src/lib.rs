//! `ledgerdesk-auth`: token validation and role-based permissions.
//!
//! This crate is decoupled from HTTP and storage: it turns a bearer token
//! into claims and answers "may this principal do that in this tenant".

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, CommandAuthorization, Principal, authorize};
pub use claims::{JwtClaims, TokenValidationError};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use permissions::Permission;
pub use principal::{PrincipalId, TenantMembership};
pub use roles::{Role, permissions_for_role, permissions_from_roles};
