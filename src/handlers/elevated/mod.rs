// handlers/elevated/mod.rs - admin role required (/api/admin/*)
//
// Back office review of vendors, partners, products and applications.
pub mod admin;
