//! Public marketplace reads. Only approved products of approved vendors are
//! visible here.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config;
use crate::database::models::{Product, ProductDetail, Tag};
use crate::database::{DatabaseError, DatabaseManager};
use crate::error::ApiError;
use crate::services::calculator::{compare_tiers, TierComparison, TierTerms};
use crate::services::product_service::{load_detail, load_details};
use crate::services::validation;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogPage {
    pub items: Vec<ProductDetail>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductCalculatorQuery {
    pub deals_per_month: Decimal,
    pub average_deal_value: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductCalculation {
    pub product_id: Uuid,
    pub product_name: String,
    #[serde(flatten)]
    pub comparison: TierComparison,
}

/// Resolve limit and offset against the configured defaults.
pub fn page_bounds(limit: Option<i64>, offset: Option<i64>) -> Result<(i64, i64), ApiError> {
    let listing = &config::config().listing;
    let limit = limit.unwrap_or(listing.default_limit as i64);
    let offset = offset.unwrap_or(0);
    if limit < 0 {
        return Err(ApiError::invalid_field("limit", "Limit must be non-negative"));
    }
    if offset < 0 {
        return Err(ApiError::invalid_field("offset", "Offset must be non-negative"));
    }
    Ok((limit.min(listing.max_limit as i64), offset))
}

/// `%term%` with LIKE wildcards in the term matched literally.
pub fn contains_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

const LISTED_WHERE: &str = "p.status = 'approved' AND v.status = 'approved'
    AND ($1::text IS NULL OR p.name ILIKE $1 OR p.description ILIKE $1)
    AND ($2::text IS NULL OR lower(p.category) = lower($2))
    AND ($3::text IS NULL OR EXISTS (
        SELECT 1 FROM product_tags pt JOIN tags t ON t.id = pt.tag_id
        WHERE pt.product_id = p.id AND t.name = lower($3)))";

pub struct CatalogService {
    pool: PgPool,
}

impl CatalogService {
    pub async fn new() -> Result<Self, DatabaseError> {
        Ok(Self {
            pool: DatabaseManager::pool().await?,
        })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, query: CatalogQuery) -> Result<CatalogPage, ApiError> {
        let (limit, offset) = page_bounds(query.limit, query.offset)?;
        let search = validation::optional(query.search).map(|s| contains_pattern(&s));
        let category = validation::optional(query.category);
        let tag = validation::optional(query.tag);

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM products p JOIN vendors v ON v.id = p.vendor_id WHERE {}",
            LISTED_WHERE
        ))
        .bind(&search)
        .bind(&category)
        .bind(&tag)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT p.* FROM products p JOIN vendors v ON v.id = p.vendor_id
             WHERE {}
             ORDER BY p.created_at DESC, p.id
             LIMIT $4 OFFSET $5",
            LISTED_WHERE
        ))
        .bind(&search)
        .bind(&category)
        .bind(&tag)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        let items = load_details(&self.pool, products).await?;

        Ok(CatalogPage {
            items,
            total,
            limit,
            offset,
        })
    }

    pub async fn get(&self, product_id: Uuid) -> Result<ProductDetail, ApiError> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT p.* FROM products p JOIN vendors v ON v.id = p.vendor_id
             WHERE p.id = $1 AND p.status = 'approved' AND v.status = 'approved'",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;

        Ok(load_detail(&self.pool, product).await?)
    }

    pub async fn tags(&self) -> Result<Vec<Tag>, ApiError> {
        let tags = sqlx::query_as::<_, Tag>("SELECT id, name FROM tags ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        Ok(tags)
    }

    /// Estimate every tier of a listed product and pick the most profitable.
    pub async fn calculate(&self, product_id: Uuid, query: ProductCalculatorQuery) -> Result<ProductCalculation, ApiError> {
        let detail = self.get(product_id).await?;
        let terms: Vec<TierTerms> = detail.pricing_tiers.iter().map(|t| t.terms()).collect();
        let comparison = compare_tiers(query.deals_per_month, query.average_deal_value, &terms)?;

        Ok(ProductCalculation {
            product_id: detail.product.id,
            product_name: detail.product.name,
            comparison,
        })
    }
}
