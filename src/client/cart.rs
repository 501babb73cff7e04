use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    client::{ClientError, load_json, save_json},
    dto::orders::CreateOrderRequest,
    models::{Listing, ListingType, OrderItem, OrderItemType},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Listing id as sent in the order's `productId`.
    pub id: String,
    pub name: String,
    pub price: i64,
    pub quantity: i32,
    #[serde(rename = "type")]
    pub item_type: OrderItemType,
    pub image: String,
}

impl CartItem {
    /// One unit of a listing. Sale listings are bought at their amount,
    /// rentals are added at the daily rate; `None` when the listing does not
    /// carry the needed price or the kind does not match.
    pub fn from_listing(listing: &Listing, item_type: OrderItemType) -> Option<Self> {
        let price = match (item_type, listing.listing_type) {
            (OrderItemType::Buy, ListingType::Sale) => listing.price.amount?,
            (OrderItemType::Rent, ListingType::Rental) => listing.price.per_day?,
            _ => return None,
        };
        let image = listing
            .images
            .first()
            .map(|img| format!("/api/images/{}", img.id))
            .unwrap_or_default();
        Some(Self {
            id: listing.id.to_string(),
            name: listing.title.clone(),
            price,
            quantity: 1,
            item_type,
            image,
        })
    }
}

/// Shopping cart kept on the client, optionally persisted to a JSON file.
/// Nothing reaches the server until [`CartStore::checkout_request`].
#[derive(Debug, Default)]
pub struct CartStore {
    path: Option<PathBuf>,
    items: Vec<CartItem>,
}

impl CartStore {
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

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item_count(&self) -> i32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn subtotal(&self) -> i64 {
        self.items
            .iter()
            .map(|i| i.price * i64::from(i.quantity))
            .sum()
    }

    /// Adding a line already in the cart (same id and kind) bumps its quantity.
    pub fn add(&mut self, item: CartItem) -> Result<(), ClientError> {
        match self
            .items
            .iter_mut()
            .find(|i| i.id == item.id && i.item_type == item.item_type)
        {
            Some(existing) => existing.quantity += item.quantity.max(1),
            None => self.items.push(CartItem {
                quantity: item.quantity.max(1),
                ..item
            }),
        }
        self.persist()
    }

    pub fn remove(&mut self, id: &str) -> Result<(), ClientError> {
        self.items.retain(|i| i.id != id);
        self.persist()
    }

    /// A quantity below one removes the line.
    pub fn update_quantity(&mut self, id: &str, quantity: i32) -> Result<(), ClientError> {
        if quantity < 1 {
            return self.remove(id);
        }
        for item in self.items.iter_mut().filter(|i| i.id == id) {
            item.quantity = quantity;
        }
        self.persist()
    }

    pub fn clear(&mut self) -> Result<(), ClientError> {
        self.items.clear();
        self.persist()
    }

    /// Snapshot the cart into an order request. The cart itself is left
    /// untouched; clear it once the server accepts the order.
    pub fn checkout_request(
        &self,
        delivery_address: impl Into<String>,
    ) -> Result<CreateOrderRequest, ClientError> {
        if self.items.is_empty() {
            return Err(ClientError::EmptyCart);
        }
        let items = self
            .items
            .iter()
            .map(|i| OrderItem {
                product_id: i.id.clone(),
                name: i.name.clone(),
                price: i.price,
                quantity: i.quantity,
                item_type: i.item_type,
                image: i.image.clone(),
            })
            .collect();
        Ok(CreateOrderRequest {
            items,
            total_amount: Some(self.subtotal()),
            delivery_address: Some(delivery_address.into()),
        })
    }

    fn persist(&self) -> Result<(), ClientError> {
        match &self.path {
            Some(path) => save_json(path, &self.items),
            None => Ok(()),
        }
    }
}
