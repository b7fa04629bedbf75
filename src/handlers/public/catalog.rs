use uuid::Uuid;

use crate::database::models::{ProductDetail, Tag};
use crate::handlers::extract::{ApiPath, ApiQuery};
use crate::middleware::{ApiResult, IntoApiResponse};
use crate::services::catalog_service::{CatalogPage, CatalogQuery, ProductCalculation, ProductCalculatorQuery};
use crate::services::CatalogService;

/// GET /catalog/products?search&category&tag&limit&offset
pub async fn product_list(ApiQuery(query): ApiQuery<CatalogQuery>) -> ApiResult<CatalogPage> {
    Ok(CatalogService::new().await?.list(query).await?.into_api_response())
}

/// GET /catalog/products/:id
pub async fn product_show(ApiPath(id): ApiPath<Uuid>) -> ApiResult<ProductDetail> {
    Ok(CatalogService::new().await?.get(id).await?.into_api_response())
}

/// GET /catalog/products/:id/calculator?deals_per_month&average_deal_value
pub async fn product_calculator(
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ProductCalculatorQuery>,
) -> ApiResult<ProductCalculation> {
    Ok(CatalogService::new().await?.calculate(id, query).await?.into_api_response())
}

/// GET /catalog/tags
pub async fn tag_list() -> ApiResult<Vec<Tag>> {
    Ok(CatalogService::new().await?.tags().await?.into_api_response())
}
