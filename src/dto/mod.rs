pub mod admin;
pub mod auth;
pub mod listings;
pub mod orders;
pub mod profile;
