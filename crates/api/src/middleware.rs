//! Bearer authentication for every route except `/health`.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use ledgerdesk_auth::JwtValidator;

use crate::app::errors::json_error;
use crate::context::RequestContext;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

/// Rejects the request with a JSON 401, or attaches the caller's
/// `RequestContext` for the handlers below.
pub async fn auth_middleware(State(state): State<AuthState>, mut req: Request<Body>, next: Next) -> Response {
    let token = match bearer_token(req.headers()) {
        Ok(token) => token,
        Err(reason) => return json_error(StatusCode::UNAUTHORIZED, "unauthorized", reason),
    };

    match state.jwt.validate(token, Utc::now()) {
        Ok(claims) => {
            let ctx = RequestContext::new(claims.tenant_id, claims.sub, claims.roles);
            req.extensions_mut().insert(ctx);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "rejected bearer token");
            json_error(StatusCode::UNAUTHORIZED, "unauthorized", e.to_string())
        }
    }
}

/// The token from `Authorization: Bearer <token>`, or why there is none.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, &'static str> {
    let value = headers.get(AUTHORIZATION).ok_or("missing bearer token")?;
    let value = value.to_str().map_err(|_| "authorization header is not ASCII")?;
    match value.strip_prefix("Bearer ").map(str::trim) {
        Some(token) if !token.is_empty() => Ok(token),
        Some(_) => Err("empty bearer token"),
        None => Err("authorization scheme must be Bearer"),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn token_follows_the_bearer_scheme() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Ok("abc.def"));
        assert_eq!(bearer_token(&headers("Bearer  abc.def ")), Ok("abc.def"));
    }

    #[test]
    fn each_rejection_says_why() {
        assert_eq!(bearer_token(&HeaderMap::new()), Err("missing bearer token"));
        assert_eq!(bearer_token(&headers("Basic dXNlcg==")), Err("authorization scheme must be Bearer"));
        assert_eq!(bearer_token(&headers("Bearer   ")), Err("empty bearer token"));
    }
}
