//! Access-token claims and their time window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ledgerdesk_core::TenantId;

use crate::{PrincipalId, Role};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: PrincipalId,
    /// Every read and write made with this token is scoped to this tenant.
    pub tenant_id: TenantId,
    pub roles: Vec<Role>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("malformed or badly signed token: {0}")]
    Malformed(String),

    #[error("token has expired")]
    Expired,

    #[error("token is not valid yet")]
    NotYetValid,

    #[error("token expires before it was issued")]
    InvalidTimeWindow,
}

impl JwtClaims {
    /// Usable in `[issued_at, expires_at)`.
    pub fn check_window(&self, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
        match (self.issued_at, self.expires_at) {
            (iat, exp) if exp <= iat => Err(TokenValidationError::InvalidTimeWindow),
            (iat, _) if now < iat => Err(TokenValidationError::NotYetValid),
            (_, exp) if now >= exp => Err(TokenValidationError::Expired),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claims(issued_at: DateTime<Utc>, ttl_minutes: i64) -> JwtClaims {
        JwtClaims {
            sub: PrincipalId::new(),
            tenant_id: TenantId::new(),
            roles: vec![Role::new(Role::ACCOUNTANT)],
            issued_at,
            expires_at: issued_at + Duration::minutes(ttl_minutes),
        }
    }

    #[test]
    fn window_is_half_open() {
        let now = Utc::now();
        let c = claims(now, 10);
        assert_eq!(c.check_window(now), Ok(()));
        assert_eq!(c.check_window(c.expires_at), Err(TokenValidationError::Expired));
        assert_eq!(
            c.check_window(now - Duration::seconds(1)),
            Err(TokenValidationError::NotYetValid)
        );
    }

    #[test]
    fn inverted_window_is_rejected() {
        let now = Utc::now();
        assert_eq!(claims(now, -1).check_window(now), Err(TokenValidationError::InvalidTimeWindow));
    }

    #[test]
    fn tenant_id_is_a_plain_uuid_on_the_wire() {
        let c = claims(Utc::now(), 5);
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["tenant_id"], c.tenant_id.to_string());
        assert_eq!(json["roles"][0], "accountant");
    }
}
