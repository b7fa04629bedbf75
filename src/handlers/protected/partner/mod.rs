// handlers/protected/partner - /api/partner/* (partner role)
pub mod applications;
pub mod profile;
