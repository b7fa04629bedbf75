// handlers/public/mod.rs - no authentication required
//
// Token acquisition, the catalog and the calculator. Every input here is
// untrusted and validated in the service layer.
pub mod auth;
pub mod calculator;
pub mod catalog;
