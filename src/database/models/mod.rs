pub mod account;
pub mod application;
pub mod partner;
pub mod product;
pub mod session;
pub mod vendor;

pub use account::Account;
pub use application::{ApplicationView, PartnershipApplication};
pub use partner::Partner;
pub use product::{PricingTier, Product, ProductDetail, Tag};
pub use session::Session;
pub use vendor::Vendor;

use crate::filter::types::ColumnDef;
use crate::types::Collection;

pub fn collection_columns(collection: Collection) -> &'static [ColumnDef] {
    match collection {
        Collection::Vendors => vendor::VENDOR_COLUMNS,
        Collection::Partners => partner::PARTNER_COLUMNS,
        Collection::Products => product::PRODUCT_COLUMNS,
        Collection::Applications => application::APPLICATION_COLUMNS,
    }
}
