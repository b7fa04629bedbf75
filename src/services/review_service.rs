//! Back office: approval status across the four reviewable collections.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sqlx::{postgres::PgRow, FromRow, PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::database::models::{collection_columns, Partner, PartnershipApplication, Product, Vendor};
use crate::database::{DatabaseError, DatabaseManager, Repository};
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::services::catalog_service::contains_pattern;
use crate::services::validation;
use crate::types::{ApprovalStatus, Collection};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminListQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    pub order: Option<String>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewNote {
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub total: i64,
}

impl StatusCounts {
    fn add(&mut self, status: ApprovalStatus, count: i64) {
        match status {
            ApprovalStatus::Pending => self.pending += count,
            ApprovalStatus::Approved => self.approved += count,
            ApprovalStatus::Rejected => self.rejected += count,
        }
        self.total += count;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminPage {
    pub collection: Collection,
    pub items: Vec<Value>,
    pub total: i64,
}

/// Translate the list query parameters into the filter language.
pub fn list_filter(collection: Collection, query: AdminListQuery) -> Result<FilterData, ApiError> {
    let mut conditions = Map::new();
    if let Some(status) = validation::optional(query.status) {
        let status: ApprovalStatus = status.parse()?;
        conditions.insert("status".to_string(), json!(status.as_str()));
    }
    if let Some(search) = validation::optional(query.search) {
        conditions.insert(
            collection.search_column().to_string(),
            json!({ "$ilike": contains_pattern(&search) }),
        );
    }

    Ok(FilterData {
        where_clause: Some(Value::Object(conditions)),
        order: validation::optional(query.order).map(Value::String),
        limit: query.limit,
        offset: query.offset,
    })
}

pub struct ReviewService {
    pool: PgPool,
}

impl ReviewService {
    pub async fn new() -> Result<Self, DatabaseError> {
        Ok(Self {
            pool: DatabaseManager::pool().await?,
        })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Status counts per collection.
    pub async fn stats(&self) -> Result<Map<String, Value>, ApiError> {
        let mut out = Map::new();
        for collection in Collection::ALL {
            let rows = sqlx::query(&format!(
                "SELECT status, COUNT(*) AS count FROM \"{}\" GROUP BY status",
                collection.table_name()
            ))
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

            let mut counts = StatusCounts::default();
            for row in rows {
                let status: ApprovalStatus = row.try_get("status").map_err(DatabaseError::from)?;
                let count: i64 = row.try_get("count").map_err(DatabaseError::from)?;
                counts.add(status, count);
            }
            out.insert(collection.as_str().to_string(), json!(counts));
        }
        Ok(out)
    }

    pub async fn list(&self, collection: Collection, query: AdminListQuery) -> Result<AdminPage, ApiError> {
        let filter = list_filter(collection, query)?;
        self.find(collection, filter).await
    }

    pub async fn find(&self, collection: Collection, filter: FilterData) -> Result<AdminPage, ApiError> {
        let count_filter = FilterData {
            order: None,
            limit: None,
            offset: None,
            ..filter.clone()
        };
        let (items, total) = match collection {
            Collection::Vendors => self.select::<Vendor>(collection, filter, count_filter).await?,
            Collection::Partners => self.select::<Partner>(collection, filter, count_filter).await?,
            Collection::Products => self.select::<Product>(collection, filter, count_filter).await?,
            Collection::Applications => {
                self.select::<PartnershipApplication>(collection, filter, count_filter)
                    .await?
            }
        };
        Ok(AdminPage {
            collection,
            items,
            total,
        })
    }

    pub async fn get(&self, collection: Collection, id: Uuid) -> Result<Value, ApiError> {
        match collection {
            Collection::Vendors => self.select_by_id::<Vendor>(collection, id).await,
            Collection::Partners => self.select_by_id::<Partner>(collection, id).await,
            Collection::Products => self.select_by_id::<Product>(collection, id).await,
            Collection::Applications => self.select_by_id::<PartnershipApplication>(collection, id).await,
        }
    }

    /// Record a review decision: status, note, when and by whom.
    pub async fn set_status(
        &self,
        admin_id: Uuid,
        collection: Collection,
        id: Uuid,
        status: ApprovalStatus,
        note: Option<String>,
    ) -> Result<Value, ApiError> {
        let note = validation::optional(note);
        let updated = sqlx::query(&format!(
            "UPDATE \"{}\"
             SET status = $2, review_note = $3, reviewed_at = now(), reviewed_by = $4, updated_at = now()
             WHERE id = $1",
            collection.table_name()
        ))
        .bind(id)
        .bind(status)
        .bind(&note)
        .bind(admin_id)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        if updated.rows_affected() == 0 {
            return Err(ApiError::not_found(format!("No record {} in {}", id, collection)));
        }

        info!(
            admin_id = %admin_id,
            collection = %collection,
            record_id = %id,
            status = %status,
            "Review decision recorded"
        );
        self.get(collection, id).await
    }

    async fn select<T>(
        &self,
        collection: Collection,
        filter: FilterData,
        count_filter: FilterData,
    ) -> Result<(Vec<Value>, i64), ApiError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin + Serialize,
    {
        let repo = self.repository::<T>(collection);
        let rows = repo.select_any(filter).await?;
        let total = repo.count(count_filter).await?;
        let items = rows.iter().map(to_value).collect::<Result<Vec<_>, _>>()?;
        Ok((items, total))
    }

    async fn select_by_id<T>(&self, collection: Collection, id: Uuid) -> Result<Value, ApiError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin + Serialize,
    {
        match self.repository::<T>(collection).select_by_id(id).await {
            Ok(row) => to_value(&row),
            Err(DatabaseError::NotFound(_)) => Err(ApiError::not_found(format!("No record {} in {}", id, collection))),
            Err(e) => Err(e.into()),
        }
    }

    fn repository<T>(&self, collection: Collection) -> Repository<T>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        Repository::new(collection.table_name(), collection_columns(collection), self.pool.clone())
    }
}

fn to_value<T: Serialize>(row: &T) -> Result<Value, ApiError> {
    serde_json::to_value(row).map_err(|e| {
        tracing::error!("Failed to serialize record: {}", e);
        ApiError::internal_server_error("Failed to serialize record")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn list_query_becomes_filter() {
        let filter = list_filter(
            Collection::Vendors,
            AdminListQuery {
                status: Some("Pending".into()),
                search: Some("acme".into()),
                order: Some("created_at desc".into()),
                limit: Some(10),
                offset: None,
            },
        )
        .unwrap();

        assert_eq!(
            filter.where_clause,
            Some(json!({ "status": "pending", "company_name": { "$ilike": "%acme%" } }))
        );
        assert_eq!(filter.order, Some(json!("created_at desc")));
        assert_eq!(filter.limit, Some(10));
    }

    #[test]
    fn unknown_status_is_a_validation_error() {
        let err = list_filter(
            Collection::Products,
            AdminListQuery {
                status: Some("archived".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[test]
    fn search_targets_collection_column() {
        let filter = list_filter(
            Collection::Applications,
            AdminListQuery {
                search: Some("resell".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(filter.where_clause.unwrap().get("message").is_some());
    }

    #[test]
    fn counts_accumulate_per_status() {
        let mut counts = StatusCounts::default();
        counts.add(ApprovalStatus::Pending, 3);
        counts.add(ApprovalStatus::Approved, 2);
        assert_eq!(
            counts,
            StatusCounts {
                pending: 3,
                approved: 2,
                rejected: 0,
                total: 5
            }
        );
    }

    #[test]
    fn unserializable_rows_are_internal_errors() {
        let mut row = std::collections::HashMap::new();
        row.insert((1, 2), "tuple keys are not valid JSON object keys");

        let err = to_value(&row).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message().contains("key"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn decisions_record_reviewer_and_note(pool: PgPool) {
        let (_, vendor) = testing::vendor(&pool, "acme@example.com").await;
        let admin_id = testing::admin(&pool).await;
        let service = ReviewService::with_pool(pool);

        let record = service
            .set_status(
                admin_id,
                Collection::Vendors,
                vendor.id,
                ApprovalStatus::Rejected,
                Some("  Missing website  ".into()),
            )
            .await
            .unwrap();

        assert_eq!(record["status"], json!("rejected"));
        assert_eq!(record["review_note"], json!("Missing website"));
        assert_eq!(record["reviewed_by"], json!(admin_id));
        assert!(!record["reviewed_at"].is_null());
        assert_eq!(service.get(Collection::Vendors, vendor.id).await.unwrap(), record);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn unknown_records_are_not_found(pool: PgPool) {
        let admin_id = testing::admin(&pool).await;
        let service = ReviewService::with_pool(pool);
        let missing = Uuid::new_v4();

        for collection in Collection::ALL {
            let err = service
                .set_status(admin_id, collection, missing, ApprovalStatus::Approved, None)
                .await
                .unwrap_err();
            assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
            let err = service.get(collection, missing).await.unwrap_err();
            assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn stats_and_listing_follow_decisions(pool: PgPool) {
        let (_, approved) = testing::vendor(&pool, "acme@example.com").await;
        testing::vendor(&pool, "globex@example.com").await;
        testing::review(&pool, Collection::Vendors, approved.id, ApprovalStatus::Approved).await;
        let service = ReviewService::with_pool(pool);

        let stats = service.stats().await.unwrap();
        assert_eq!(
            stats["vendors"],
            json!({ "pending": 1, "approved": 1, "rejected": 0, "total": 2 })
        );
        assert_eq!(stats["applications"]["total"], json!(0));

        let page = service
            .list(
                Collection::Vendors,
                AdminListQuery {
                    status: Some("approved".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0]["id"], json!(approved.id));
    }
}
