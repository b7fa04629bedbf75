use axum::Extension;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::filter::FilterData;
use crate::handlers::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::review_service::{AdminListQuery, AdminPage, ReviewNote, SetStatusRequest};
use crate::services::ReviewService;
use crate::types::{ApprovalStatus, Collection};

/// Unknown collections are a missing route, not a bad request.
fn collection(name: &str) -> Result<Collection, ApiError> {
    name.parse()
        .map_err(|_| ApiError::not_found(format!("Unknown collection '{}'", name)))
}

/// GET /api/admin/stats - status counts per collection
pub async fn stats() -> ApiResult<Map<String, Value>> {
    Ok(ApiResponse::success(ReviewService::new().await?.stats().await?))
}

/// GET /api/admin/:collection?status&search&order&limit&offset
pub async fn collection_list(
    ApiPath(name): ApiPath<String>,
    ApiQuery(query): ApiQuery<AdminListQuery>,
) -> ApiResult<AdminPage> {
    let collection = collection(&name)?;
    Ok(ApiResponse::success(ReviewService::new().await?.list(collection, query).await?))
}

/// POST /api/admin/:collection/find - filter language body
pub async fn collection_find(
    ApiPath(name): ApiPath<String>,
    ApiJson(filter): ApiJson<FilterData>,
) -> ApiResult<AdminPage> {
    let collection = collection(&name)?;
    Ok(ApiResponse::success(ReviewService::new().await?.find(collection, filter).await?))
}

/// GET /api/admin/:collection/:id
pub async fn record_get(ApiPath((name, id)): ApiPath<(String, Uuid)>) -> ApiResult<Value> {
    let collection = collection(&name)?;
    Ok(ApiResponse::success(ReviewService::new().await?.get(collection, id).await?))
}

/// PUT /api/admin/:collection/:id/status { status, note? }
pub async fn status_put(
    Extension(admin): Extension<AuthUser>,
    ApiPath((name, id)): ApiPath<(String, Uuid)>,
    ApiJson(request): ApiJson<SetStatusRequest>,
) -> ApiResult<Value> {
    let collection = collection(&name)?;
    let status: ApprovalStatus = request.status.parse()?;
    review(admin, collection, id, status, request.note).await
}

/// POST /api/admin/:collection/:id/approve { note? }
pub async fn approve(
    Extension(admin): Extension<AuthUser>,
    ApiPath((name, id)): ApiPath<(String, Uuid)>,
    body: Option<ApiJson<ReviewNote>>,
) -> ApiResult<Value> {
    let collection = collection(&name)?;
    let note = body.and_then(|ApiJson(b)| b.note);
    review(admin, collection, id, ApprovalStatus::Approved, note).await
}

/// POST /api/admin/:collection/:id/reject { note? }
pub async fn reject(
    Extension(admin): Extension<AuthUser>,
    ApiPath((name, id)): ApiPath<(String, Uuid)>,
    body: Option<ApiJson<ReviewNote>>,
) -> ApiResult<Value> {
    let collection = collection(&name)?;
    let note = body.and_then(|ApiJson(b)| b.note);
    review(admin, collection, id, ApprovalStatus::Rejected, note).await
}

async fn review(
    admin: AuthUser,
    collection: Collection,
    id: Uuid,
    status: ApprovalStatus,
    note: Option<String>,
) -> ApiResult<Value> {
    let record = ReviewService::new()
        .await?
        .set_status(admin.account_id, collection, id, status, note)
        .await?;
    Ok(ApiResponse::success(record))
}
