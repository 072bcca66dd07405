use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

pub use vidhub_types::api::Claims;

use crate::auth::{ACCESS_COOKIE, decode_token};
use crate::error::ApiError;
use crate::state::AppState;

/// Extract and validate the access JWT, from the `accessToken` cookie or
/// else the Authorization header. The verified claims are the only identity
/// handlers trust.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = access_token(req.headers())
        .ok_or_else(|| ApiError::Unauthorized("Unauthorized request".into()))?;

    let claims = decode_token(&state.settings.access_token_secret, &token)
        .map_err(|_| ApiError::Unauthorized("Invalid access token".into()))?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

fn access_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = CookieJar::from_headers(headers)
        .get(ACCESS_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty());

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(str::to_string)
    })
}
