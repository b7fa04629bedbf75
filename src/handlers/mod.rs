// handlers/mod.rs - 3-tier handler layout
//
// Public (no auth) -> Protected (JWT + session) -> Elevated (admin role)
pub mod elevated;
pub mod extract;
pub mod protected;
pub mod public;
