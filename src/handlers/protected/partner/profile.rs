use axum::Extension;

use crate::database::models::Partner;
use crate::handlers::extract::ApiJson;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::partner_service::{CreatePartnerRequest, UpdatePartnerRequest};
use crate::services::PartnerService;

/// POST /api/partner/profile
pub async fn profile_create(
    Extension(user): Extension<AuthUser>,
    ApiJson(request): ApiJson<CreatePartnerRequest>,
) -> ApiResult<Partner> {
    let partner = PartnerService::new().await?.create(user.account_id, request).await?;
    Ok(ApiResponse::created(partner))
}

/// GET /api/partner/profile
pub async fn profile_get(Extension(user): Extension<AuthUser>) -> ApiResult<Partner> {
    Ok(ApiResponse::success(PartnerService::new().await?.get(user.account_id).await?))
}

/// PATCH /api/partner/profile - partial update; resubmits a rejected profile
pub async fn profile_update(
    Extension(user): Extension<AuthUser>,
    ApiJson(request): ApiJson<UpdatePartnerRequest>,
) -> ApiResult<Partner> {
    let partner = PartnerService::new().await?.update(user.account_id, request).await?;
    Ok(ApiResponse::success(partner))
}
