use axum::http::HeaderMap;
use serde::Deserialize;

use crate::error::ApiError;
use crate::handlers::extract::ApiJson;
use crate::middleware::auth::extract_jwt_from_headers;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::account_service::{LoginRequest, SignupRequest, TokenResponse};
use crate::services::AccountService;

/// POST /auth/signup - create a vendor or partner account and start a session
///
/// ```json
/// { "email": "jo@acme.io", "password": "********", "full_name": "Jo", "role": "vendor" }
/// ```
pub async fn signup(ApiJson(request): ApiJson<SignupRequest>) -> ApiResult<TokenResponse> {
    let response = AccountService::new().await?.signup(request).await?;
    Ok(ApiResponse::created(response))
}

/// POST /auth/login - exchange credentials for a JWT
pub async fn login(ApiJson(request): ApiJson<LoginRequest>) -> ApiResult<TokenResponse> {
    let response = AccountService::new().await?.login(request).await?;
    Ok(ApiResponse::success(response))
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    pub token: Option<String>,
}

/// POST /auth/refresh - reissue a token for the same session
///
/// The token comes from the body or the Authorization header. It may already
/// be expired, as long as it is inside the refresh window.
pub async fn refresh(headers: HeaderMap, body: Option<ApiJson<RefreshRequest>>) -> ApiResult<TokenResponse> {
    let token = body
        .and_then(|ApiJson(b)| b.token)
        .filter(|t| !t.trim().is_empty())
        .map(Ok)
        .unwrap_or_else(|| extract_jwt_from_headers(&headers))
        .map_err(ApiError::unauthorized)?;

    let response = AccountService::new().await?.refresh(&token).await?;
    Ok(ApiResponse::success(response))
}
