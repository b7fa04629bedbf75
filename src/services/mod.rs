pub mod account_service;
pub mod application_service;
pub mod calculator;
pub mod catalog_service;
pub mod partner_service;
pub mod product_service;
pub mod review_service;
pub mod storage;
pub mod validation;
pub mod vendor_service;

pub use account_service::AccountService;
pub use application_service::ApplicationService;
pub use catalog_service::CatalogService;
pub use partner_service::PartnerService;
pub use product_service::ProductService;
pub use review_service::ReviewService;
pub use storage::StorageService;
pub use vendor_service::VendorService;
