use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::database::models::{ApplicationView, Partner, PartnershipApplication};
use crate::database::{DatabaseError, DatabaseManager};
use crate::error::ApiError;
use crate::services::validation;
use crate::types::ApprovalStatus;

#[derive(Debug, Clone, Deserialize)]
pub struct ApplyRequest {
    pub product_id: Uuid,
    pub message: Option<String>,
}

const VIEW_SELECT: &str = "SELECT a.id, a.partner_id, pa.display_name AS partner_name,
        a.product_id, p.name AS product_name, a.message, a.status,
        a.review_note, a.reviewed_at, a.created_at, a.updated_at
    FROM partnership_applications a
    JOIN partners pa ON pa.id = a.partner_id
    JOIN products p ON p.id = a.product_id";

pub struct ApplicationService {
    pool: PgPool,
}

impl ApplicationService {
    pub async fn new() -> Result<Self, DatabaseError> {
        Ok(Self {
            pool: DatabaseManager::pool().await?,
        })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Submit a partnership application. The partner must be approved and the
    /// product must be publicly listed.
    pub async fn apply(&self, account_id: Uuid, request: ApplyRequest) -> Result<PartnershipApplication, ApiError> {
        let partner = self.partner_for(account_id).await?;
        if partner.status != ApprovalStatus::Approved {
            return Err(ApiError::forbidden("Your partner profile must be approved before applying"));
        }

        let listed: Option<Uuid> = sqlx::query_scalar(
            "SELECT p.id FROM products p
             JOIN vendors v ON v.id = p.vendor_id
             WHERE p.id = $1 AND p.status = 'approved' AND v.status = 'approved'",
        )
        .bind(request.product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        let Some(product_id) = listed else {
            return Err(ApiError::not_found("Product not found"));
        };

        let application = sqlx::query_as::<_, PartnershipApplication>(
            "INSERT INTO partnership_applications (id, partner_id, product_id, message)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(partner.id)
        .bind(product_id)
        .bind(validation::optional(request.message))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, "You have already applied for this product"))?;

        info!("Partner {} applied for product {}", partner.id, product_id);
        Ok(application)
    }

    pub async fn list_for_partner(
        &self,
        account_id: Uuid,
        status: Option<ApprovalStatus>,
    ) -> Result<Vec<ApplicationView>, ApiError> {
        let rows = sqlx::query_as::<_, ApplicationView>(&format!(
            "{} WHERE pa.account_id = $1 AND ($2::text IS NULL OR a.status = $2) ORDER BY a.created_at DESC",
            VIEW_SELECT
        ))
        .bind(account_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(rows)
    }

    /// Applications targeting any of the vendor's products.
    pub async fn list_for_vendor(
        &self,
        account_id: Uuid,
        status: Option<ApprovalStatus>,
    ) -> Result<Vec<ApplicationView>, ApiError> {
        let rows = sqlx::query_as::<_, ApplicationView>(&format!(
            "{} JOIN vendors v ON v.id = p.vendor_id
             WHERE v.account_id = $1 AND ($2::text IS NULL OR a.status = $2)
             ORDER BY a.created_at DESC",
            VIEW_SELECT
        ))
        .bind(account_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(rows)
    }

    /// Delete a pending application. Reviewed ones stay as a record.
    pub async fn withdraw(&self, account_id: Uuid, application_id: Uuid) -> Result<(), ApiError> {
        let partner = self.partner_for(account_id).await?;
        let application = sqlx::query_as::<_, PartnershipApplication>(
            "SELECT * FROM partnership_applications WHERE id = $1 AND partner_id = $2",
        )
        .bind(application_id)
        .bind(partner.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?
        .ok_or_else(|| ApiError::not_found("Application not found"))?;

        if application.status.is_reviewed() {
            return Err(ApiError::conflict(format!(
                "Application was already {} and can no longer be withdrawn",
                application.status
            )));
        }

        let deleted = sqlx::query("DELETE FROM partnership_applications WHERE id = $1 AND status = 'pending'")
            .bind(application.id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        if deleted.rows_affected() == 0 {
            // Reviewed between the read and the delete
            return Err(ApiError::conflict("Application was reviewed and can no longer be withdrawn"));
        }

        info!("Partner {} withdrew application {}", partner.id, application.id);
        Ok(())
    }

    async fn partner_for(&self, account_id: Uuid) -> Result<Partner, ApiError> {
        sqlx::query_as::<_, Partner>("SELECT * FROM partners WHERE account_id = $1")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?
            .ok_or_else(|| ApiError::forbidden("Create a partner profile first"))
    }
}
