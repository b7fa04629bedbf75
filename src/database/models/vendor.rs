use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::filter::types::{col, ColumnDef, ColumnKind};

use crate::types::ApprovalStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vendor {
    pub id: Uuid,
    pub account_id: Uuid,
    pub company_name: String,
    pub website: Option<String>,
    pub description: Option<String>,
    pub contact_email: Option<String>,
    pub logo_url: Option<String>,
    pub status: ApprovalStatus,
    pub review_note: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Columns the filter language may reference
pub static VENDOR_COLUMNS: &[ColumnDef] = &[
    col("id", ColumnKind::Uuid),
    col("account_id", ColumnKind::Uuid),
    col("company_name", ColumnKind::Text),
    col("website", ColumnKind::Text),
    col("description", ColumnKind::Text),
    col("contact_email", ColumnKind::Text),
    col("status", ColumnKind::Text),
    col("reviewed_at", ColumnKind::Timestamp),
    col("reviewed_by", ColumnKind::Uuid),
    col("created_at", ColumnKind::Timestamp),
    col("updated_at", ColumnKind::Timestamp),
];
