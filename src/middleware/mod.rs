pub mod auth;
pub mod response;

pub use auth::{jwt_auth_middleware, require_admin, require_partner, require_vendor, AuthUser};
pub use response::{ApiResponse, ApiResult, IntoApiResponse};
