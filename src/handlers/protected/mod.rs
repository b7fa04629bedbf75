// handlers/protected/mod.rs - JWT authentication required (/api/*)
//
// Every route here runs behind jwt_auth_middleware, which injects AuthUser.
// The vendor and partner areas add a role guard on top.
pub mod auth;
pub mod partner;
pub mod vendor;

use axum::body::Bytes;
use axum::extract::Multipart;
use serde::Deserialize;

use crate::error::ApiError;
use crate::types::ApprovalStatus;

/// Optional `?status=` filter on list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

impl StatusQuery {
    pub fn parsed(self) -> Result<Option<ApprovalStatus>, ApiError> {
        match self.status.filter(|s| !s.trim().is_empty()) {
            Some(s) => Ok(Some(s.parse()?)),
            None => Ok(None),
        }
    }
}

/// First `file` field of a multipart upload, with its declared content type.
pub async fn read_upload(mut multipart: Multipart) -> Result<(String, Bytes), ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            let content_type = field.content_type().unwrap_or_default().to_string();
            let bytes = field.bytes().await?;
            return Ok((content_type, bytes));
        }
    }
    Err(ApiError::invalid_field("file", "Missing file field"))
}
