//! Typed client for the marketplace API plus the client-local stores (cart,
//! wishlist) that live outside the server until checkout.

use std::{fs, io, path::Path};

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

pub mod api;
pub mod browse;
pub mod cart;
pub mod wishlist;

pub use api::MarketplaceClient;
pub use cart::{CartItem, CartStore};
pub use wishlist::{Wishlist, WishlistItem};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server responded {status}: {message}")]
    Api { status: u16, message: String },

    #[error("not logged in")]
    NotAuthenticated,

    #[error("cart is empty")]
    EmptyCart,

    #[error("local store I/O: {0}")]
    Io(#[from] io::Error),

    #[error("local store is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read a JSON store; a missing file is an empty store.
pub(crate) fn load_json<T>(path: &Path) -> Result<T, ClientError>
where
    T: DeserializeOwned + Default,
{
    match fs::read(path) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(T::default()),
        Err(err) => Err(err.into()),
    }
}

/// Write through a sibling temp file so a crash never leaves half a store.
pub(crate) fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ClientError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
