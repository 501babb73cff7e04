use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    client::{ClientError, load_json, save_json},
    models::{Listing, ListingType},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistItem {
    pub id: Uuid,
    pub title: String,
    pub price: Option<i64>,
    pub image: String,
    pub description: String,
}

impl From<&Listing> for WishlistItem {
    fn from(listing: &Listing) -> Self {
        let price = match listing.listing_type {
            ListingType::Sale => listing.price.amount,
            ListingType::Rental => listing.price.per_day,
        };
        Self {
            id: listing.id,
            title: listing.title.clone(),
            price,
            image: listing
                .images
                .first()
                .map(|img| format!("/api/images/{}", img.id))
                .unwrap_or_default(),
            description: listing.description.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Wishlist {
    path: Option<PathBuf>,
    items: Vec<WishlistItem>,
}

impl Wishlist {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref().to_path_buf();
        let items = load_json(&path)?;
        Ok(Self {
            path: Some(path),
            items,
        })
    }

    pub fn items(&self) -> &[WishlistItem] {
        &self.items
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.items.iter().any(|i| i.id == id)
    }

    /// No-op when the item is already saved.
    pub fn add(&mut self, item: WishlistItem) -> Result<(), ClientError> {
        if self.contains(item.id) {
            return Ok(());
        }
        self.items.push(item);
        self.persist()
    }

    pub fn remove(&mut self, id: Uuid) -> Result<(), ClientError> {
        self.items.retain(|i| i.id != id);
        self.persist()
    }

    /// Returns whether the item is saved after the toggle.
    pub fn toggle(&mut self, item: WishlistItem) -> Result<bool, ClientError> {
        if self.contains(item.id) {
            self.remove(item.id)?;
            Ok(false)
        } else {
            self.add(item)?;
            Ok(true)
        }
    }

    fn persist(&self) -> Result<(), ClientError> {
        match &self.path {
            Some(path) => save_json(path, &self.items),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str) -> WishlistItem {
        WishlistItem {
            id: Uuid::new_v4(),
            title: title.into(),
            price: Some(10),
            image: String::new(),
            description: String::new(),
        }
    }

    #[test]
    fn toggle_adds_then_removes() {
        let mut wishlist = Wishlist::in_memory();
        let lamp = entry("lamp");
        assert!(wishlist.toggle(lamp.clone()).unwrap());
        assert!(wishlist.contains(lamp.id));
        assert!(!wishlist.toggle(lamp.clone()).unwrap());
        assert!(!wishlist.contains(lamp.id));
    }

    #[test]
    fn add_ignores_duplicates() {
        let mut wishlist = Wishlist::in_memory();
        let chair = entry("chair");
        wishlist.add(chair.clone()).unwrap();
        wishlist.add(chair).unwrap();
        assert_eq!(wishlist.items().len(), 1);
    }

    #[test]
    fn wishlist_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wishlist.json");
        let desk = entry("desk");

        Wishlist::open(&path).unwrap().add(desk.clone()).unwrap();
        let reopened = Wishlist::open(&path).unwrap();
        assert!(reopened.contains(desk.id));
        assert_eq!(reopened.items()[0].title, "desk");
    }
}
