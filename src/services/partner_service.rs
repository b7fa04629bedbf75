use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::database::models::Partner;
use crate::database::{DatabaseError, DatabaseManager};
use crate::error::ApiError;
use crate::services::validation;

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePartnerRequest {
    pub display_name: String,
    pub website: Option<String>,
    pub bio: Option<String>,
    pub audience_size: Option<i32>,
    #[serde(default)]
    pub channels: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePartnerRequest {
    pub display_name: Option<String>,
    pub website: Option<String>,
    pub bio: Option<String>,
    pub audience_size: Option<i32>,
    pub channels: Option<Vec<String>>,
}

/// Trimmed, lowercased, de-duplicated channel names in first-seen order.
pub fn normalize_channels(channels: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(channels.len());
    for channel in channels {
        let channel = channel.trim().to_lowercase();
        if !channel.is_empty() && !out.contains(&channel) {
            out.push(channel);
        }
    }
    out
}

fn audience(value: Option<i32>) -> Result<Option<i32>, ApiError> {
    match value {
        Some(n) if n < 0 => Err(ApiError::invalid_field("audience_size", "Audience size cannot be negative")),
        other => Ok(other),
    }
}

pub struct PartnerService {
    pool: PgPool,
}

impl PartnerService {
    pub async fn new() -> Result<Self, DatabaseError> {
        Ok(Self {
            pool: DatabaseManager::pool().await?,
        })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, account_id: Uuid, request: CreatePartnerRequest) -> Result<Partner, ApiError> {
        let display_name = validation::required("display_name", &request.display_name)?;
        let website = validation::optional_url("website", request.website)?;
        let audience_size = audience(request.audience_size)?;

        let partner = sqlx::query_as::<_, Partner>(
            "INSERT INTO partners (id, account_id, display_name, website, bio, audience_size, channels)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(&display_name)
        .bind(website)
        .bind(validation::optional(request.bio))
        .bind(audience_size)
        .bind(normalize_channels(request.channels))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, "Partner profile already exists"))?;

        info!("Partner profile {} created for account {}", partner.id, account_id);
        Ok(partner)
    }

    pub async fn get(&self, account_id: Uuid) -> Result<Partner, ApiError> {
        self.find(account_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Partner profile not found"))
    }

    pub async fn find(&self, account_id: Uuid) -> Result<Option<Partner>, DatabaseError> {
        let partner = sqlx::query_as::<_, Partner>("SELECT * FROM partners WHERE account_id = $1")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(partner)
    }

    pub async fn update(&self, account_id: Uuid, request: UpdatePartnerRequest) -> Result<Partner, ApiError> {
        let current = self.get(account_id).await?;

        let display_name = match request.display_name {
            Some(name) => validation::required("display_name", &name)?,
            None => current.display_name,
        };
        let website = match request.website {
            Some(website) => validation::optional_url("website", Some(website))?,
            None => current.website,
        };
        let bio = match request.bio {
            Some(bio) => validation::optional(Some(bio)),
            None => current.bio,
        };
        let audience_size = match request.audience_size {
            Some(size) => audience(Some(size))?,
            None => current.audience_size,
        };
        let channels = request.channels.map(normalize_channels).unwrap_or(current.channels);

        let partner = sqlx::query_as::<_, Partner>(
            "UPDATE partners
             SET display_name = $2, website = $3, bio = $4, audience_size = $5, channels = $6,
                 status = CASE WHEN status = 'rejected' THEN 'pending' ELSE status END,
                 updated_at = now()
             WHERE id = $1
             RETURNING *",
        )
        .bind(current.id)
        .bind(display_name)
        .bind(website)
        .bind(bio)
        .bind(audience_size)
        .bind(channels)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        if current.status != partner.status {
            info!("Partner {} resubmitted for review", partner.id);
        }
        Ok(partner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use crate::types::{ApprovalStatus, Collection};
    use axum::http::StatusCode;

    #[test]
    fn channels_are_normalized() {
        let channels = normalize_channels(vec![
            " YouTube ".into(),
            "newsletter".into(),
            "youtube".into(),
            "".into(),
        ]);
        assert_eq!(channels, vec!["youtube".to_string(), "newsletter".to_string()]);
    }

    #[test]
    fn negative_audience_is_rejected() {
        assert!(audience(Some(-1)).is_err());
        assert_eq!(audience(Some(0)).unwrap(), Some(0));
        assert_eq!(audience(None).unwrap(), None);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn editing_a_rejected_profile_resubmits_it(pool: PgPool) {
        let (account_id, partner) = testing::partner(&pool, "pat@example.com").await;
        testing::review(&pool, Collection::Partners, partner.id, ApprovalStatus::Rejected).await;

        let updated = PartnerService::with_pool(pool)
            .update(
                account_id,
                UpdatePartnerRequest {
                    channels: Some(vec!["Podcast".into(), "podcast".into()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, ApprovalStatus::Pending);
        assert_eq!(updated.channels, vec!["podcast".to_string()]);
        assert_eq!(updated.display_name, partner.display_name);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn one_profile_per_account(pool: PgPool) {
        let (account_id, _) = testing::partner(&pool, "pat@example.com").await;

        let err = PartnerService::with_pool(pool)
            .create(
                account_id,
                CreatePartnerRequest {
                    display_name: "Pat Again".into(),
                    website: None,
                    bio: None,
                    audience_size: None,
                    channels: vec![],
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }
}
