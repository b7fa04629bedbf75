use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::filter::types::{col, ColumnDef, ColumnKind};

use crate::types::ApprovalStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Partner {
    pub id: Uuid,
    pub account_id: Uuid,
    pub display_name: String,
    pub website: Option<String>,
    pub bio: Option<String>,
    pub audience_size: Option<i32>,
    pub channels: Vec<String>,
    pub status: ApprovalStatus,
    pub review_note: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Columns the filter language may reference
pub static PARTNER_COLUMNS: &[ColumnDef] = &[
    col("id", ColumnKind::Uuid),
    col("account_id", ColumnKind::Uuid),
    col("display_name", ColumnKind::Text),
    col("website", ColumnKind::Text),
    col("bio", ColumnKind::Text),
    col("audience_size", ColumnKind::Integer),
    col("channels", ColumnKind::TextArray),
    col("status", ColumnKind::Text),
    col("reviewed_at", ColumnKind::Timestamp),
    col("reviewed_by", ColumnKind::Uuid),
    col("created_at", ColumnKind::Timestamp),
    col("updated_at", ColumnKind::Timestamp),
];
