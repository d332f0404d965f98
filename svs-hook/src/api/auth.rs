//! Bearer token middleware for admin routes
//!
//! An empty `admin_token` disables the check.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::ApiError;
use crate::AppState;

pub async fn admin_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if state.admin_token.is_empty() {
        return Ok(next.run(request).await);
    }

    let provided = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    match provided {
        Some(token) if token_matches(token.as_bytes(), state.admin_token.as_bytes()) => {
            Ok(next.run(request).await)
        }
        Some(_) => {
            warn!(path = %request.uri().path(), "Admin request with wrong token");
            Err(ApiError::Unauthorized("invalid admin token".to_string()))
        }
        None => Err(ApiError::Unauthorized("missing bearer token".to_string())),
    }
}

/// Constant-time token check
///
/// The candidate is copied into a buffer of the expected length so the work
/// done never depends on the length of the provided token.
fn token_matches(provided: &[u8], expected: &[u8]) -> bool {
    let mut candidate = vec![0u8; expected.len()];
    let n = provided.len().min(expected.len());
    candidate[..n].copy_from_slice(&provided[..n]);

    let same_len = (provided.len() as u64).ct_eq(&(expected.len() as u64));
    (candidate.as_slice().ct_eq(expected) & same_len).into()
}
