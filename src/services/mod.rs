use std::str::FromStr;

use crate::{
    error::{AppError, AppResult},
    models::ParseEnumError,
};

pub mod admin_service;
pub mod auth_service;
pub mod image_service;
pub mod listing_service;
pub mod order_service;
pub mod profile_service;
pub mod rental_service;

/// Parse an enum column read back from the database. A value that does not
/// parse is a corrupt row, not a client error.
pub(crate) fn stored<T>(raw: &str) -> AppResult<T>
where
    T: FromStr<Err = ParseEnumError>,
{
    raw.parse::<T>()
        .map_err(|err| AppError::Internal(anyhow::Error::new(err)))
}
