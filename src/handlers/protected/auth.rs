use axum::Extension;

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::account_service::WhoAmI;
use crate::services::AccountService;

/// GET /api/auth/whoami - current account, session and marketplace profile
pub async fn whoami(Extension(user): Extension<AuthUser>) -> ApiResult<WhoAmI> {
    let me = AccountService::new()
        .await?
        .whoami(user.account_id, user.session_id)
        .await?;
    Ok(ApiResponse::success(me))
}

/// POST /api/auth/logout - revoke the current session
pub async fn logout(Extension(user): Extension<AuthUser>) -> ApiResult<()> {
    AccountService::new().await?.logout(user.session_id).await?;
    Ok(ApiResponse::no_content())
}
