use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::filter::types::{col, ColumnDef, ColumnKind};

use crate::types::ApprovalStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PartnershipApplication {
    pub id: Uuid,
    pub partner_id: Uuid,
    pub product_id: Uuid,
    pub message: Option<String>,
    pub status: ApprovalStatus,
    pub review_note: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Application joined with the names shown in application tables.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationView {
    pub id: Uuid,
    pub partner_id: Uuid,
    pub partner_name: String,
    pub product_id: Uuid,
    pub product_name: String,
    pub message: Option<String>,
    pub status: ApprovalStatus,
    pub review_note: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Columns the filter language may reference
pub static APPLICATION_COLUMNS: &[ColumnDef] = &[
    col("id", ColumnKind::Uuid),
    col("partner_id", ColumnKind::Uuid),
    col("product_id", ColumnKind::Uuid),
    col("message", ColumnKind::Text),
    col("status", ColumnKind::Text),
    col("reviewed_at", ColumnKind::Timestamp),
    col("reviewed_by", ColumnKind::Uuid),
    col("created_at", ColumnKind::Timestamp),
    col("updated_at", ColumnKind::Timestamp),
];
