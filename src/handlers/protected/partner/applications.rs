use axum::Extension;
use uuid::Uuid;

use crate::database::models::{ApplicationView, PartnershipApplication};
use crate::handlers::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::application_service::ApplyRequest;
use crate::services::ApplicationService;

use super::super::StatusQuery;

/// POST /api/partner/applications { product_id, message? }
pub async fn application_create(
    Extension(user): Extension<AuthUser>,
    ApiJson(request): ApiJson<ApplyRequest>,
) -> ApiResult<PartnershipApplication> {
    let application = ApplicationService::new().await?.apply(user.account_id, request).await?;
    Ok(ApiResponse::created(application))
}

/// GET /api/partner/applications?status
pub async fn application_list(
    Extension(user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<StatusQuery>,
) -> ApiResult<Vec<ApplicationView>> {
    let status = query.parsed()?;
    let rows = ApplicationService::new()
        .await?
        .list_for_partner(user.account_id, status)
        .await?;
    Ok(ApiResponse::success(rows))
}

/// DELETE /api/partner/applications/:id - withdraw while still pending
pub async fn application_withdraw(Extension(user): Extension<AuthUser>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<()> {
    ApplicationService::new().await?.withdraw(user.account_id, id).await?;
    Ok(ApiResponse::no_content())
}
