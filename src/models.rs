use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Error)]
#[error("Invalid {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(ParseEnumError::new("role", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    Sale,
    Rental,
}

impl ListingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingType::Sale => "sale",
            ListingType::Rental => "rental",
        }
    }
}

impl FromStr for ListingType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sale" => Ok(ListingType::Sale),
            "rental" => Ok(ListingType::Rental),
            other => Err(ParseEnumError::new("listing type", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ListingCondition {
    New,
    LikeNew,
    Good,
    Fair,
    Poor,
}

impl ListingCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingCondition::New => "new",
            ListingCondition::LikeNew => "like-new",
            ListingCondition::Good => "good",
            ListingCondition::Fair => "fair",
            ListingCondition::Poor => "poor",
        }
    }
}

impl FromStr for ListingCondition {
    type Err = ParseEnumError;

    /// Accepts both the wire form (`like-new`) and the display form (`Like New`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(' ', "-").as_str() {
            "new" => Ok(ListingCondition::New),
            "like-new" => Ok(ListingCondition::LikeNew),
            "good" => Ok(ListingCondition::Good),
            "fair" => Ok(ListingCondition::Fair),
            "poor" => Ok(ListingCondition::Poor),
            _ => Err(ParseEnumError::new("condition", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Available,
    Rented,
    Sold,
    Returned,
    Inactive,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Available => "available",
            ListingStatus::Rented => "rented",
            ListingStatus::Sold => "sold",
            ListingStatus::Returned => "returned",
            ListingStatus::Inactive => "inactive",
        }
    }

    /// Statuses a seller may set directly; `rented` and `returned` only come
    /// from the rent and return operations.
    pub fn is_owner_settable(&self) -> bool {
        matches!(
            self,
            ListingStatus::Available | ListingStatus::Sold | ListingStatus::Inactive
        )
    }
}

impl FromStr for ListingStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(ListingStatus::Available),
            "rented" => Ok(ListingStatus::Rented),
            "sold" => Ok(ListingStatus::Sold),
            "returned" => Ok(ListingStatus::Returned),
            "inactive" => Ok(ListingStatus::Inactive),
            other => Err(ParseEnumError::new("listing status", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RentalPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl RentalPeriod {
    pub fn days(&self) -> i64 {
        match self {
            RentalPeriod::Daily => 1,
            RentalPeriod::Weekly => 7,
            RentalPeriod::Monthly => 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(ParseEnumError::new("order status", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderItemType {
    Buy,
    Rent,
}

impl OrderItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderItemType::Buy => "buy",
            OrderItemType::Rent => "rent",
        }
    }
}

impl FromStr for OrderItemType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(OrderItemType::Buy),
            "rent" => Ok(OrderItemType::Rent),
            other => Err(ParseEnumError::new("order item type", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Page,
    Post,
    Announcement,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Page => "page",
            ContentType::Post => "post",
            ContentType::Announcement => "announcement",
        }
    }
}

impl FromStr for ContentType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "page" => Ok(ContentType::Page),
            "post" => Ok(ContentType::Post),
            "announcement" => Ok(ContentType::Announcement),
            other => Err(ParseEnumError::new("content type", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    Draft,
    Published,
    Archived,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Draft => "draft",
            ContentStatus::Published => "published",
            ContentStatus::Archived => "archived",
        }
    }
}

impl FromStr for ContentStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ContentStatus::Draft),
            "published" => Ok(ContentStatus::Published),
            "archived" => Ok(ContentStatus::Archived),
            other => Err(ParseEnumError::new("content status", other)),
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),* $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

display_as_str!(
    Role,
    ListingType,
    ListingCondition,
    ListingStatus,
    OrderStatus,
    OrderItemType,
    ContentType,
    ContentStatus,
);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Profile {
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: Uuid,
    /// Base64-encoded payload.
    pub data: String,
    pub content_type: String,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SellerSummary {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_day: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_week: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_month: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_deposit: Option<i64>,
    #[serde(default)]
    pub delivery_charges: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: Uuid,
    pub seller: SellerSummary,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub listing_type: ListingType,
    pub price: Price,
    pub category: String,
    pub condition: ListingCondition,
    pub images: Vec<Image>,
    pub status: ListingStatus,
    pub location: String,
    pub delivery_available: bool,
    pub contact_info: String,
    pub renter_id: Option<Uuid>,
    pub rental_start_date: Option<DateTime<Utc>>,
    pub rental_end_date: Option<DateTime<Utc>>,
    pub rental_quantity: Option<i32>,
    pub rental_total_amount: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub price: i64,
    pub quantity: i32,
    #[serde(rename = "type")]
    pub item_type: OrderItemType,
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    /// Cleared when the buyer's account is deleted; the order itself stays.
    pub user_id: Option<Uuid>,
    pub items: Vec<OrderItem>,
    pub total_amount: i64,
    pub status: OrderStatus,
    pub delivery_address: String,
    pub order_date: DateTime<Utc>,
    pub estimated_delivery: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub status: ContentStatus,
    pub author_id: Uuid,
    pub featured_image: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub site_name: String,
    pub site_description: String,
    pub maintenance_mode: bool,
    pub allow_registration: bool,
    pub email_notifications: bool,
    pub theme: String,
    pub contact_email: String,
    #[schema(value_type = Object)]
    pub social_links: serde_json::Value,
    #[schema(value_type = Object)]
    pub analytics: serde_json::Value,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            site_name: "Marketplace".to_string(),
            site_description: String::new(),
            maintenance_mode: false,
            allow_registration: true,
            email_notifications: true,
            theme: "light".to_string(),
            contact_email: String::new(),
            social_links: serde_json::json!({}),
            analytics: serde_json::json!({}),
            updated_at: None,
        }
    }
}
