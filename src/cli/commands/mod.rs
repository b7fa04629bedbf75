pub mod admin;
pub mod auth;
pub mod calc;
pub mod fixture;
pub mod server;
