use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::database::models::Vendor;
use crate::database::{DatabaseError, DatabaseManager};
use crate::error::ApiError;
use crate::services::validation;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateVendorRequest {
    pub company_name: String,
    pub website: Option<String>,
    pub description: Option<String>,
    pub contact_email: Option<String>,
}

/// Absent fields stay as they are; blank optional fields are cleared.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateVendorRequest {
    pub company_name: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub contact_email: Option<String>,
}

pub struct VendorService {
    pool: PgPool,
}

impl VendorService {
    pub async fn new() -> Result<Self, DatabaseError> {
        Ok(Self {
            pool: DatabaseManager::pool().await?,
        })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, account_id: Uuid, request: CreateVendorRequest) -> Result<Vendor, ApiError> {
        let company_name = validation::required("company_name", &request.company_name)?;
        let website = validation::optional_url("website", request.website)?;
        let contact_email = validation::optional_email("contact_email", request.contact_email)?;

        let vendor = sqlx::query_as::<_, Vendor>(
            "INSERT INTO vendors (id, account_id, company_name, website, description, contact_email)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(&company_name)
        .bind(website)
        .bind(validation::optional(request.description))
        .bind(contact_email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, "Vendor profile already exists"))?;

        info!("Vendor profile {} created for account {}", vendor.id, account_id);
        Ok(vendor)
    }

    pub async fn get(&self, account_id: Uuid) -> Result<Vendor, ApiError> {
        self.find(account_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Vendor profile not found"))
    }

    pub async fn find(&self, account_id: Uuid) -> Result<Option<Vendor>, DatabaseError> {
        let vendor = sqlx::query_as::<_, Vendor>("SELECT * FROM vendors WHERE account_id = $1")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(vendor)
    }

    /// Apply edits; a rejected profile goes back to pending review.
    pub async fn update(&self, account_id: Uuid, request: UpdateVendorRequest) -> Result<Vendor, ApiError> {
        let current = self.get(account_id).await?;

        let company_name = match request.company_name {
            Some(name) => validation::required("company_name", &name)?,
            None => current.company_name,
        };
        let website = match request.website {
            Some(website) => validation::optional_url("website", Some(website))?,
            None => current.website,
        };
        let description = match request.description {
            Some(description) => validation::optional(Some(description)),
            None => current.description,
        };
        let contact_email = match request.contact_email {
            Some(email) => validation::optional_email("contact_email", Some(email))?,
            None => current.contact_email,
        };

        let vendor = sqlx::query_as::<_, Vendor>(
            "UPDATE vendors
             SET company_name = $2, website = $3, description = $4, contact_email = $5,
                 status = CASE WHEN status = 'rejected' THEN 'pending' ELSE status END,
                 updated_at = now()
             WHERE id = $1
             RETURNING *",
        )
        .bind(current.id)
        .bind(company_name)
        .bind(website)
        .bind(description)
        .bind(contact_email)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        if current.status != vendor.status {
            info!("Vendor {} resubmitted for review", vendor.id);
        }
        Ok(vendor)
    }

    pub async fn set_logo(&self, account_id: Uuid, logo_url: &str) -> Result<Vendor, ApiError> {
        sqlx::query_as::<_, Vendor>(
            "UPDATE vendors SET logo_url = $2, updated_at = now() WHERE account_id = $1 RETURNING *",
        )
        .bind(account_id)
        .bind(logo_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?
        .ok_or_else(|| ApiError::not_found("Vendor profile not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use crate::types::{ApprovalStatus, Collection};
    use axum::http::StatusCode;

    #[sqlx::test(migrations = "./migrations")]
    async fn one_profile_per_account(pool: PgPool) {
        let (account_id, _) = testing::vendor(&pool, "acme@example.com").await;

        let err = VendorService::with_pool(pool)
            .create(
                account_id,
                CreateVendorRequest {
                    company_name: "Acme Again".into(),
                    website: None,
                    description: None,
                    contact_email: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn editing_a_rejected_profile_resubmits_it(pool: PgPool) {
        let (account_id, vendor) = testing::vendor(&pool, "acme@example.com").await;
        testing::review(&pool, Collection::Vendors, vendor.id, ApprovalStatus::Rejected).await;
        let service = VendorService::with_pool(pool);

        let updated = service
            .update(
                account_id,
                UpdateVendorRequest {
                    description: Some("Now with a description".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, ApprovalStatus::Pending);
        assert_eq!(updated.description.as_deref(), Some("Now with a description"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn editing_an_approved_profile_keeps_approval(pool: PgPool) {
        let (account_id, vendor) = testing::vendor(&pool, "acme@example.com").await;
        testing::review(&pool, Collection::Vendors, vendor.id, ApprovalStatus::Approved).await;

        let updated = VendorService::with_pool(pool)
            .update(
                account_id,
                UpdateVendorRequest {
                    company_name: Some("Acme Renamed".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, ApprovalStatus::Approved);
        assert_eq!(updated.company_name, "Acme Renamed");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn missing_profile_is_not_found(pool: PgPool) {
        let account = testing::signup(&pool, "acme@example.com", "vendor").await.account;
        let err = VendorService::with_pool(pool).get(account.id).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
