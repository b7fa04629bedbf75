use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::auth::{validate_jwt, AuthError, Claims};
use crate::error::ApiError;
use crate::services::AccountService;
use crate::types::AccountRole;

/// Authenticated account context extracted from the JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub account_id: Uuid,
    pub session_id: Uuid,
    pub role: AccountRole,
    pub email: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            account_id: claims.sub,
            session_id: claims.sid,
            role: claims.role,
            email: claims.email,
        }
    }
}

/// Validates the bearer token and its session, then injects [`AuthUser`]
pub async fn jwt_auth_middleware(headers: HeaderMap, mut request: Request, next: Next) -> Response {
    match authenticate(&headers).await {
        Ok(auth_user) => {
            request.extensions_mut().insert(auth_user);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

async fn authenticate(headers: &HeaderMap) -> Result<AuthUser, ApiError> {
    let token = extract_jwt_from_headers(headers).map_err(ApiError::unauthorized)?;
    let claims = validate_jwt(&token)?;

    let accounts = AccountService::new().await?;
    if !accounts.session_is_active(claims.sid, claims.sub).await? {
        return Err(AuthError::SessionRevoked.into());
    }

    Ok(AuthUser::from(claims))
}

/// Extract JWT token from Authorization header
pub fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

async fn require_role(role: AccountRole, request: Request, next: Next) -> Response {
    match request.extensions().get::<AuthUser>() {
        Some(user) if user.role == role => next.run(request).await,
        Some(user) => {
            tracing::debug!("Account {} ({}) denied {} route", user.account_id, user.role, role);
            ApiError::forbidden(format!("This endpoint requires a {} account", role)).into_response()
        }
        None => ApiError::unauthorized("Authentication required").into_response(),
    }
}

pub async fn require_vendor(request: Request, next: Next) -> Response {
    require_role(AccountRole::Vendor, request, next).await
}

pub async fn require_partner(request: Request, next: Next) -> Response {
    require_role(AccountRole::Partner, request, next).await
}

pub async fn require_admin(request: Request, next: Next) -> Response {
    require_role(AccountRole::Admin, request, next).await
}
