//! Fixtures for service tests that run against a migrated database.
//!
//! Each `#[sqlx::test]` gets its own fresh database, so helpers here create
//! whatever accounts and profiles a test needs through the services
//! themselves rather than inserting raw rows.

use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{Partner, Product, Vendor};
use crate::services::account_service::{SignupRequest, TokenResponse};
use crate::services::partner_service::CreatePartnerRequest;
use crate::services::product_service::{CreateProductRequest, TierRequest};
use crate::services::vendor_service::CreateVendorRequest;
use crate::services::{AccountService, PartnerService, ProductService, ReviewService, VendorService};
use crate::types::{ApprovalStatus, Collection};

pub const PASSWORD: &str = "correct horse battery";
pub const ADMIN_EMAIL: &str = "admin@rezollo.test";

pub async fn signup(pool: &PgPool, email: &str, role: &str) -> TokenResponse {
    AccountService::with_pool(pool.clone())
        .signup(SignupRequest {
            email: email.to_string(),
            password: PASSWORD.to_string(),
            full_name: "Test Account".to_string(),
            role: role.to_string(),
        })
        .await
        .expect("signup")
}

/// A vendor account with a pending company profile.
pub async fn vendor(pool: &PgPool, email: &str) -> (Uuid, Vendor) {
    let account = signup(pool, email, "vendor").await.account;
    let vendor = VendorService::with_pool(pool.clone())
        .create(
            account.id,
            CreateVendorRequest {
                company_name: format!("Company of {}", email),
                website: None,
                description: None,
                contact_email: None,
            },
        )
        .await
        .expect("vendor profile");
    (account.id, vendor)
}

/// A partner account with a pending profile.
pub async fn partner(pool: &PgPool, email: &str) -> (Uuid, Partner) {
    let account = signup(pool, email, "partner").await.account;
    let partner = PartnerService::with_pool(pool.clone())
        .create(
            account.id,
            CreatePartnerRequest {
                display_name: format!("Partner {}", email),
                website: None,
                bio: None,
                audience_size: Some(1000),
                channels: vec!["newsletter".to_string()],
            },
        )
        .await
        .expect("partner profile");
    (account.id, partner)
}

pub async fn product(pool: &PgPool, account_id: Uuid, name: &str, tags: &[&str]) -> Product {
    ProductService::with_pool(pool.clone())
        .create(
            account_id,
            CreateProductRequest {
                name: name.to_string(),
                description: None,
                category: Some("crm".to_string()),
                website_url: None,
                tags: tags.iter().map(|t| t.to_string()).collect(),
            },
        )
        .await
        .expect("product")
        .product
}

pub async fn tier(pool: &PgPool, account_id: Uuid, product_id: Uuid, name: &str, position: i32) {
    ProductService::with_pool(pool.clone())
        .add_tier(
            account_id,
            product_id,
            TierRequest {
                name: name.to_string(),
                monthly_fee: rust_decimal::Decimal::from(49),
                commission_rate: rust_decimal::Decimal::from(20),
                description: None,
                position: Some(position),
            },
        )
        .await
        .expect("pricing tier");
}

/// The bootstrap admin's account id, created on first use.
pub async fn admin(pool: &PgPool) -> Uuid {
    AccountService::with_pool(pool.clone())
        .ensure_admin(ADMIN_EMAIL, PASSWORD)
        .await
        .expect("bootstrap admin");
    sqlx::query_scalar("SELECT id FROM accounts WHERE email = $1")
        .bind(ADMIN_EMAIL)
        .fetch_one(pool)
        .await
        .expect("admin id")
}

pub async fn review(pool: &PgPool, collection: Collection, id: Uuid, status: ApprovalStatus) {
    let admin_id = admin(pool).await;
    ReviewService::with_pool(pool.clone())
        .set_status(admin_id, collection, id, status, None)
        .await
        .expect("review decision");
}

/// An approved vendor with one approved product, visible in the catalog.
pub async fn listed_product(pool: &PgPool, email: &str, name: &str) -> (Uuid, Product) {
    let (account_id, vendor) = vendor(pool, email).await;
    review(pool, Collection::Vendors, vendor.id, ApprovalStatus::Approved).await;
    let product = product(pool, account_id, name, &[]).await;
    review(pool, Collection::Products, product.id, ApprovalStatus::Approved).await;
    (account_id, product)
}
