use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::credentials::{TokenError, TokenService};
use crate::error::ApiError;

/// Level given at signup.
pub const STUDENT: i32 = 1;
/// Creates and manages events. Admins (3) pass every organizer check.
pub const ORGANIZER: i32 = 2;

/// Identity of the caller, inserted by [`require_access`].
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub student_id: String,
    pub access: i32,
}

impl AuthContext {
    pub fn is_organizer(&self) -> bool {
        self.access >= ORGANIZER
    }
}

/// State for one [`require_access`] layer: the verifier and the minimum
/// level the wrapped routes need.
#[derive(Clone)]
pub struct AccessGate {
    pub tokens: TokenService,
    pub min_access: i32,
}

impl AccessGate {
    pub fn new(tokens: TokenService, min_access: i32) -> Self {
        Self { tokens, min_access }
    }
}

/// Pull the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::MissingToken)
}

/// Validate the bearer token and check the caller's access level. No
/// database I/O: a token stays usable until it expires.
pub async fn require_access(
    State(gate): State<AccessGate>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = gate.tokens.validate(bearer_token(req.headers())?)?;

    // A refresh token (or anything else without identity) is not an access token.
    let (Some(student_id), Some(access)) = (claims.student_id, claims.access) else {
        return Err(TokenError::Malformed.into());
    };

    if access < gate.min_access {
        debug!(%student_id, access, required = gate.min_access, "Access denied");
        return Err(ApiError::Forbidden("Insufficient access level".into()));
    }

    req.extensions_mut().insert(AuthContext { student_id, access });
    Ok(next.run(req).await)
}
