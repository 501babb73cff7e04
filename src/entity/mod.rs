pub mod audit_logs;
pub mod contents;
pub mod images;
pub mod listing_images;
pub mod listings;
pub mod order_items;
pub mod orders;
pub mod settings;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use contents::Entity as Contents;
pub use images::Entity as Images;
pub use listing_images::Entity as ListingImages;
pub use listings::Entity as Listings;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use settings::Entity as Settings;
pub use users::Entity as Users;
