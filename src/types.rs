/// Shared domain enums used across handlers, models and the CLI
use serde::{Deserialize, Serialize};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef};
use sqlx::{Decode, Encode, Postgres, Type};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid {kind} '{value}', expected one of: {allowed}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
    pub allowed: &'static str,
}

/// Review state shared by vendors, partners, products and applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }

    pub fn is_reviewed(&self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }
}

impl FromStr for ApprovalStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ApprovalStatus::Pending),
            "approved" => Ok(ApprovalStatus::Approved),
            "rejected" => Ok(ApprovalStatus::Rejected),
            _ => Err(ParseEnumError {
                kind: "status",
                value: s.to_string(),
                allowed: "pending, approved, rejected",
            }),
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account kind; decides which route tier an account may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    Vendor,
    Partner,
    Admin,
}

impl AccountRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountRole::Vendor => "vendor",
            AccountRole::Partner => "partner",
            AccountRole::Admin => "admin",
        }
    }

    /// Roles an anonymous visitor may pick at sign-up.
    pub fn is_self_service(&self) -> bool {
        matches!(self, AccountRole::Vendor | AccountRole::Partner)
    }
}

impl FromStr for AccountRole {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vendor" => Ok(AccountRole::Vendor),
            "partner" => Ok(AccountRole::Partner),
            "admin" => Ok(AccountRole::Admin),
            _ => Err(ParseEnumError {
                kind: "role",
                value: s.to_string(),
                allowed: "vendor, partner, admin",
            }),
        }
    }
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collections the back office reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Vendors,
    Partners,
    Products,
    Applications,
}

impl Collection {
    pub const ALL: [Collection; 4] = [Self::Vendors, Self::Partners, Self::Products, Self::Applications];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Vendors => "vendors",
            Collection::Partners => "partners",
            Collection::Products => "products",
            Collection::Applications => "applications",
        }
    }

    pub fn table_name(&self) -> &'static str {
        match self {
            Collection::Vendors => "vendors",
            Collection::Partners => "partners",
            Collection::Products => "products",
            Collection::Applications => "partnership_applications",
        }
    }

    /// Column searched by the admin `search` parameter.
    pub fn search_column(&self) -> &'static str {
        match self {
            Collection::Vendors => "company_name",
            Collection::Partners => "display_name",
            Collection::Products => "name",
            Collection::Applications => "message",
        }
    }
}

impl FromStr for Collection {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vendors" => Ok(Collection::Vendors),
            "partners" => Ok(Collection::Partners),
            "products" => Ok(Collection::Products),
            "applications" => Ok(Collection::Applications),
            _ => Err(ParseEnumError {
                kind: "collection",
                value: s.to_string(),
                allowed: "vendors, partners, products, applications",
            }),
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Both enums live in TEXT columns guarded by CHECK constraints, so they
// encode and decode through the string representation.
macro_rules! text_backed_sqlx_type {
    ($ty:ty) => {
        impl Type<Postgres> for $ty {
            fn type_info() -> PgTypeInfo {
                <&str as Type<Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <&str as Type<Postgres>>::compatible(ty)
            }
        }

        impl<'r> Decode<'r, Postgres> for $ty {
            fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
                let s = <&str as Decode<Postgres>>::decode(value)?;
                Ok(s.parse::<$ty>()?)
            }
        }

        impl Encode<'_, Postgres> for $ty {
            fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> IsNull {
                <&str as Encode<Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

text_backed_sqlx_type!(ApprovalStatus);
text_backed_sqlx_type!(AccountRole);
