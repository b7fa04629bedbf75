use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::filter::types::{col, ColumnDef, ColumnKind};

use crate::services::calculator::TierTerms;
use crate::types::ApprovalStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub website_url: Option<String>,
    pub image_url: Option<String>,
    pub status: ApprovalStatus,
    pub review_note: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PricingTier {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub monthly_fee: Decimal,
    pub commission_rate: Decimal,
    pub description: Option<String>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

impl PricingTier {
    pub fn terms(&self) -> TierTerms {
        TierTerms {
            tier_id: self.id,
            name: self.name.clone(),
            monthly_fee: self.monthly_fee,
            commission_rate: self.commission_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}

/// A product with everything a listing page shows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub vendor_name: String,
    pub pricing_tiers: Vec<PricingTier>,
    pub tags: Vec<String>,
}

/// Columns the filter language may reference
pub static PRODUCT_COLUMNS: &[ColumnDef] = &[
    col("id", ColumnKind::Uuid),
    col("vendor_id", ColumnKind::Uuid),
    col("name", ColumnKind::Text),
    col("description", ColumnKind::Text),
    col("category", ColumnKind::Text),
    col("website_url", ColumnKind::Text),
    col("status", ColumnKind::Text),
    col("reviewed_at", ColumnKind::Timestamp),
    col("reviewed_by", ColumnKind::Uuid),
    col("created_at", ColumnKind::Timestamp),
    col("updated_at", ColumnKind::Timestamp),
];
