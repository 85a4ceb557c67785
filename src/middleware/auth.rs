// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication middleware.

use crate::error::AppError;
use crate::services::token::AccessClaims;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Name of the access-token cookie set at login.
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
/// Name of the refresh-token cookie set at login.
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Authenticated identity extracted from access-token claims. Carries
/// everything `/current-user` needs, so no handler has to re-read the
/// user record just to know who is calling.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
}

impl From<AccessClaims> for AuthUser {
    fn from(claims: AccessClaims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username,
            email: claims.email,
            full_name: claims.full_name,
        }
    }
}

/// Identity for routes where authentication is optional.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

/// Pull the token from the cookie first, then the Authorization header.
fn extract_token(jar: &CookieJar, request: &Request) -> Option<String> {
    if let Some(cookie) = jar.get(ACCESS_TOKEN_COOKIE) {
        return Some(cookie.value().to_string());
    }

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;

    auth_header
        .strip_prefix("Bearer ")
        .map(|token| token.to_string())
}

/// Middleware that requires valid JWT authentication.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(&jar, &request)
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    let claims = state.tokens.verify_access_token(&token)?;
    request.extensions_mut().insert(AuthUser::from(claims));

    Ok(next.run(request).await)
}

/// Middleware that attaches an identity when a valid token is present but
/// never rejects the request. Used by the channel-profile route, where
/// the viewer's identity only affects the `isSubscribed` flag.
pub async fn optional_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let user = extract_token(&jar, &request)
        .and_then(|token| state.tokens.verify_access_token(&token).ok())
        .map(AuthUser::from);

    request.extensions_mut().insert(MaybeAuthUser(user));

    next.run(request).await
}
