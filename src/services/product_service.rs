use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::database::models::{PricingTier, Product, ProductDetail, Tag};
use crate::database::{DatabaseError, DatabaseManager};
use crate::error::ApiError;
use crate::services::validation;
use crate::types::ApprovalStatus;

const PRODUCT_NOT_FOUND: &str = "Product not found";
const FEE_LIMIT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub website_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub website_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TierRequest {
    pub name: String,
    pub monthly_fee: Decimal,
    pub commission_rate: Decimal,
    pub description: Option<String>,
    pub position: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTierRequest {
    pub name: Option<String>,
    pub monthly_fee: Option<Decimal>,
    pub commission_rate: Option<Decimal>,
    pub description: Option<String>,
    pub position: Option<i32>,
}

/// Validated tier fields: name required, fee non-negative, rate within 0..=100.
pub fn validate_tier(name: &str, monthly_fee: Decimal, commission_rate: Decimal) -> Result<(String, Decimal, Decimal), ApiError> {
    let name = validation::required("name", name)?;
    if monthly_fee < Decimal::ZERO {
        return Err(ApiError::invalid_field("monthly_fee", "Monthly fee cannot be negative"));
    }
    if monthly_fee >= FEE_LIMIT {
        return Err(ApiError::invalid_field("monthly_fee", "Monthly fee is too large"));
    }
    if commission_rate < Decimal::ZERO || commission_rate > Decimal::ONE_HUNDRED {
        return Err(ApiError::invalid_field("commission_rate", "Commission rate must be between 0 and 100"));
    }
    Ok((name, monthly_fee.round_dp(2), commission_rate.round_dp(2)))
}

/// Trimmed, lowercased, de-duplicated tag names in first-seen order.
pub fn normalize_tags(names: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.trim().to_lowercase();
        if !name.is_empty() && !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

/// Attach vendor name, tiers and tags to a product row.
pub async fn load_detail(pool: &PgPool, product: Product) -> Result<ProductDetail, DatabaseError> {
    load_details(pool, vec![product])
        .await?
        .pop()
        .ok_or_else(|| DatabaseError::NotFound(PRODUCT_NOT_FOUND.to_string()))
}

/// Same as [`load_detail`] for a page of products, with one query per
/// relation instead of one per product. Input order is kept.
pub async fn load_details(pool: &PgPool, products: Vec<Product>) -> Result<Vec<ProductDetail>, DatabaseError> {
    if products.is_empty() {
        return Ok(Vec::new());
    }
    let product_ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
    let vendor_ids: Vec<Uuid> = products.iter().map(|p| p.vendor_id).collect();

    let vendor_names: HashMap<Uuid, String> =
        sqlx::query_as::<_, (Uuid, String)>("SELECT id, company_name FROM vendors WHERE id = ANY($1)")
            .bind(&vendor_ids)
            .fetch_all(pool)
            .await?
            .into_iter()
            .collect();

    let mut tiers: HashMap<Uuid, Vec<PricingTier>> = HashMap::new();
    for tier in sqlx::query_as::<_, PricingTier>(
        "SELECT * FROM pricing_tiers WHERE product_id = ANY($1) ORDER BY position, created_at",
    )
    .bind(&product_ids)
    .fetch_all(pool)
    .await?
    {
        tiers.entry(tier.product_id).or_default().push(tier);
    }

    let mut tags: HashMap<Uuid, Vec<String>> = HashMap::new();
    for (product_id, name) in sqlx::query_as::<_, (Uuid, String)>(
        "SELECT pt.product_id, t.name FROM tags t
         JOIN product_tags pt ON pt.tag_id = t.id
         WHERE pt.product_id = ANY($1)
         ORDER BY t.name",
    )
    .bind(&product_ids)
    .fetch_all(pool)
    .await?
    {
        tags.entry(product_id).or_default().push(name);
    }

    products
        .into_iter()
        .map(|product| {
            let vendor_name = vendor_names
                .get(&product.vendor_id)
                .cloned()
                .ok_or_else(|| DatabaseError::NotFound("Vendor not found".to_string()))?;
            Ok(ProductDetail {
                pricing_tiers: tiers.remove(&product.id).unwrap_or_default(),
                tags: tags.remove(&product.id).unwrap_or_default(),
                vendor_name,
                product,
            })
        })
        .collect()
}

pub struct ProductService {
    pool: PgPool,
}

impl ProductService {
    pub async fn new() -> Result<Self, DatabaseError> {
        Ok(Self {
            pool: DatabaseManager::pool().await?,
        })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, account_id: Uuid, request: CreateProductRequest) -> Result<ProductDetail, ApiError> {
        let vendor_id: Uuid = sqlx::query_scalar("SELECT id FROM vendors WHERE account_id = $1")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?
            .ok_or_else(|| ApiError::forbidden("Create a vendor profile before listing products"))?;

        let name = validation::required("name", &request.name)?;
        let website_url = validation::optional_url("website_url", request.website_url)?;
        let tags = normalize_tags(&request.tags);

        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        let product = sqlx::query_as::<_, Product>(
            "INSERT INTO products (id, vendor_id, name, description, category, website_url)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(vendor_id)
        .bind(&name)
        .bind(validation::optional(request.description))
        .bind(validation::optional(request.category))
        .bind(website_url)
        .fetch_one(&mut *tx)
        .await
        .map_err(DatabaseError::from)?;
        replace_tags(&mut tx, product.id, &tags).await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        info!("Product {} created by vendor {}", product.id, vendor_id);
        Ok(load_detail(&self.pool, product).await?)
    }

    pub async fn list_own(&self, account_id: Uuid, status: Option<ApprovalStatus>) -> Result<Vec<Product>, ApiError> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT p.* FROM products p
             JOIN vendors v ON v.id = p.vendor_id
             WHERE v.account_id = $1 AND ($2::text IS NULL OR p.status = $2)
             ORDER BY p.created_at DESC",
        )
        .bind(account_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(products)
    }

    pub async fn get_own(&self, account_id: Uuid, product_id: Uuid) -> Result<ProductDetail, ApiError> {
        let product = self.owned(account_id, product_id).await?;
        Ok(load_detail(&self.pool, product).await?)
    }

    /// Apply edits; a rejected product goes back to pending review.
    pub async fn update_own(
        &self,
        account_id: Uuid,
        product_id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<ProductDetail, ApiError> {
        let current = self.owned(account_id, product_id).await?;

        let name = match request.name {
            Some(name) => validation::required("name", &name)?,
            None => current.name,
        };
        let description = match request.description {
            Some(d) => validation::optional(Some(d)),
            None => current.description,
        };
        let category = match request.category {
            Some(c) => validation::optional(Some(c)),
            None => current.category,
        };
        let website_url = match request.website_url {
            Some(url) => validation::optional_url("website_url", Some(url))?,
            None => current.website_url,
        };

        let product = sqlx::query_as::<_, Product>(
            "UPDATE products
             SET name = $2, description = $3, category = $4, website_url = $5,
                 status = CASE WHEN status = 'rejected' THEN 'pending' ELSE status END,
                 updated_at = now()
             WHERE id = $1
             RETURNING *",
        )
        .bind(current.id)
        .bind(name)
        .bind(description)
        .bind(category)
        .bind(website_url)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        if product.status != current.status {
            info!("Product {} resubmitted for review", product.id);
        }
        Ok(load_detail(&self.pool, product).await?)
    }

    pub async fn delete_own(&self, account_id: Uuid, product_id: Uuid) -> Result<(), ApiError> {
        let product = self.owned(account_id, product_id).await?;
        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product.id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        info!("Product {} deleted", product.id);
        Ok(())
    }

    pub async fn set_image(&self, account_id: Uuid, product_id: Uuid, image_url: &str) -> Result<Product, ApiError> {
        let product = self.owned(account_id, product_id).await?;
        let product = sqlx::query_as::<_, Product>(
            "UPDATE products SET image_url = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(product.id)
        .bind(image_url)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(product)
    }

    pub async fn list_tiers(&self, account_id: Uuid, product_id: Uuid) -> Result<Vec<PricingTier>, ApiError> {
        let product = self.owned(account_id, product_id).await?;
        let tiers = sqlx::query_as::<_, PricingTier>(
            "SELECT * FROM pricing_tiers WHERE product_id = $1 ORDER BY position, created_at",
        )
        .bind(product.id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(tiers)
    }

    pub async fn add_tier(&self, account_id: Uuid, product_id: Uuid, request: TierRequest) -> Result<PricingTier, ApiError> {
        let product = self.owned(account_id, product_id).await?;
        let (name, monthly_fee, commission_rate) =
            validate_tier(&request.name, request.monthly_fee, request.commission_rate)?;

        // New tiers go last unless a position is given
        let tier = sqlx::query_as::<_, PricingTier>(
            "INSERT INTO pricing_tiers (id, product_id, name, monthly_fee, commission_rate, description, position)
             VALUES ($1, $2, $3, $4, $5, $6,
                     COALESCE($7, (SELECT COALESCE(MAX(position) + 1, 0) FROM pricing_tiers WHERE product_id = $2)))
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(product.id)
        .bind(name)
        .bind(monthly_fee)
        .bind(commission_rate)
        .bind(validation::optional(request.description))
        .bind(request.position)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(tier)
    }

    pub async fn update_tier(
        &self,
        account_id: Uuid,
        product_id: Uuid,
        tier_id: Uuid,
        request: UpdateTierRequest,
    ) -> Result<PricingTier, ApiError> {
        let current = self.owned_tier(account_id, product_id, tier_id).await?;
        let (name, monthly_fee, commission_rate) = validate_tier(
            request.name.as_deref().unwrap_or(&current.name),
            request.monthly_fee.unwrap_or(current.monthly_fee),
            request.commission_rate.unwrap_or(current.commission_rate),
        )?;
        let description = match request.description {
            Some(d) => validation::optional(Some(d)),
            None => current.description,
        };

        let tier = sqlx::query_as::<_, PricingTier>(
            "UPDATE pricing_tiers
             SET name = $2, monthly_fee = $3, commission_rate = $4, description = $5, position = $6
             WHERE id = $1
             RETURNING *",
        )
        .bind(current.id)
        .bind(name)
        .bind(monthly_fee)
        .bind(commission_rate)
        .bind(description)
        .bind(request.position.unwrap_or(current.position))
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(tier)
    }

    pub async fn delete_tier(&self, account_id: Uuid, product_id: Uuid, tier_id: Uuid) -> Result<(), ApiError> {
        let tier = self.owned_tier(account_id, product_id, tier_id).await?;
        sqlx::query("DELETE FROM pricing_tiers WHERE id = $1")
            .bind(tier.id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        Ok(())
    }

    /// Replace the product's tags; an empty list clears them.
    pub async fn set_tags(&self, account_id: Uuid, product_id: Uuid, names: &[String]) -> Result<Vec<String>, ApiError> {
        let product = self.owned(account_id, product_id).await?;
        let names = normalize_tags(names);

        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        replace_tags(&mut tx, product.id, &names).await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        let mut sorted = names;
        sorted.sort();
        Ok(sorted)
    }

    async fn owned(&self, account_id: Uuid, product_id: Uuid) -> Result<Product, ApiError> {
        sqlx::query_as::<_, Product>(
            "SELECT p.* FROM products p
             JOIN vendors v ON v.id = p.vendor_id
             WHERE p.id = $1 AND v.account_id = $2",
        )
        .bind(product_id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?
        .ok_or_else(|| ApiError::not_found(PRODUCT_NOT_FOUND))
    }

    async fn owned_tier(&self, account_id: Uuid, product_id: Uuid, tier_id: Uuid) -> Result<PricingTier, ApiError> {
        let product = self.owned(account_id, product_id).await?;
        sqlx::query_as::<_, PricingTier>("SELECT * FROM pricing_tiers WHERE id = $1 AND product_id = $2")
            .bind(tier_id)
            .bind(product.id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?
            .ok_or_else(|| ApiError::not_found("Pricing tier not found"))
    }
}

async fn replace_tags(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    product_id: Uuid,
    names: &[String],
) -> Result<(), DatabaseError> {
    sqlx::query("DELETE FROM product_tags WHERE product_id = $1")
        .bind(product_id)
        .execute(&mut **tx)
        .await?;

    for name in names {
        let tag = sqlx::query_as::<_, Tag>(
            "INSERT INTO tags (id, name) VALUES ($1, $2)
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
             RETURNING id, name",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .fetch_one(&mut **tx)
        .await?;

        sqlx::query("INSERT INTO product_tags (product_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(product_id)
            .bind(tag.id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use crate::types::Collection;
    use axum::http::StatusCode;

    #[test]
    fn tag_names_are_normalized() {
        let tags = normalize_tags(&[" CRM ".into(), "saas".into(), "crm".into(), "  ".into()]);
        assert_eq!(tags, vec!["crm".to_string(), "saas".to_string()]);
        assert!(normalize_tags(&[]).is_empty());
    }

    #[test]
    fn tier_validation() {
        let (name, fee, rate) = validate_tier(" Pro ", Decimal::new(9900, 2), Decimal::from(25)).unwrap();
        assert_eq!(name, "Pro");
        assert_eq!(fee, Decimal::new(9900, 2));
        assert_eq!(rate, Decimal::from(25));

        assert!(validate_tier("", Decimal::ZERO, Decimal::ZERO).is_err());
        assert!(validate_tier("Pro", Decimal::from(-1), Decimal::from(10)).is_err());
        assert!(validate_tier("Pro", Decimal::ZERO, Decimal::from(101)).is_err());
        assert!(validate_tier("Pro", Decimal::ZERO, Decimal::from(-5)).is_err());
        assert!(validate_tier("Free", Decimal::ZERO, Decimal::ONE_HUNDRED).is_ok());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn products_need_a_vendor_profile(pool: PgPool) {
        let account = testing::signup(&pool, "acme@example.com", "vendor").await.account;

        let err = ProductService::with_pool(pool)
            .create(
                account.id,
                CreateProductRequest {
                    name: "Widget".into(),
                    description: None,
                    category: None,
                    website_url: None,
                    tags: vec![],
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn editing_a_rejected_product_resubmits_it(pool: PgPool) {
        let (account_id, _) = testing::vendor(&pool, "acme@example.com").await;
        let product = testing::product(&pool, account_id, "Widget", &[]).await;
        testing::review(&pool, Collection::Products, product.id, ApprovalStatus::Rejected).await;

        let updated = ProductService::with_pool(pool)
            .update_own(
                account_id,
                product.id,
                UpdateProductRequest {
                    name: Some("Widget Pro".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.product.status, ApprovalStatus::Pending);
        assert_eq!(updated.product.name, "Widget Pro");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn other_vendors_products_are_not_found(pool: PgPool) {
        let (owner, _) = testing::vendor(&pool, "acme@example.com").await;
        let (other, _) = testing::vendor(&pool, "globex@example.com").await;
        let product = testing::product(&pool, owner, "Widget", &[]).await;
        let service = ProductService::with_pool(pool);

        let err = service.get_own(other, product.id).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        let err = service.set_tags(other, product.id, &["crm".into()]).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(service.get_own(owner, product.id).await.is_ok());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn set_tags_replaces_the_whole_set(pool: PgPool) {
        let (account_id, _) = testing::vendor(&pool, "acme@example.com").await;
        let product = testing::product(&pool, account_id, "Widget", &["crm", "sales"]).await;
        let service = ProductService::with_pool(pool.clone());

        let tags = service
            .set_tags(account_id, product.id, &["Sales".into(), "analytics".into(), "sales".into()])
            .await
            .unwrap();
        assert_eq!(tags, vec!["analytics".to_string(), "sales".to_string()]);
        let detail = service.get_own(account_id, product.id).await.unwrap();
        assert_eq!(detail.tags, tags);

        let cleared = service.set_tags(account_id, product.id, &[]).await.unwrap();
        assert!(cleared.is_empty());
        assert!(service.get_own(account_id, product.id).await.unwrap().tags.is_empty());

        // Tag rows outlive their last product
        let known: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags").fetch_one(&pool).await.unwrap();
        assert_eq!(known, 3);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn batched_details_keep_each_products_own_tiers_and_tags(pool: PgPool) {
        let (account_id, vendor) = testing::vendor(&pool, "acme@example.com").await;
        let first = testing::product(&pool, account_id, "First", &["crm"]).await;
        let second = testing::product(&pool, account_id, "Second", &["email", "ads"]).await;
        testing::tier(&pool, account_id, first.id, "Pro", 2).await;
        testing::tier(&pool, account_id, first.id, "Starter", 1).await;
        testing::tier(&pool, account_id, second.id, "Flat", 1).await;

        let details = load_details(&pool, vec![second.clone(), first.clone()]).await.unwrap();

        assert_eq!(details.len(), 2);
        assert_eq!(details[0].product.id, second.id);
        assert_eq!(details[0].tags, vec!["ads".to_string(), "email".to_string()]);
        assert_eq!(details[0].pricing_tiers.len(), 1);
        assert_eq!(details[1].product.id, first.id);
        assert_eq!(details[1].tags, vec!["crm".to_string()]);
        let names: Vec<&str> = details[1].pricing_tiers.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Starter", "Pro"]);
        assert!(details.iter().all(|d| d.vendor_name == vendor.company_name));

        assert!(load_details(&pool, vec![]).await.unwrap().is_empty());
    }
}
