use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{ContentStatus, ContentType, ListingStatus, Order, OrderStatus, Role, User};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdminLoginResponse {
    pub token: String,
    pub admin: User,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: u64,
    pub total_listings: u64,
    pub total_orders: u64,
    pub total_content: u64,
    pub revenue: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub recent_users: Vec<User>,
    pub recent_orders: Vec<Order>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderPage {
    pub orders: Vec<Order>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct AdminUserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub name: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct UpdateListingStatusRequest {
    pub status: ListingStatus,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateContentRequest {
    pub title: String,
    /// Derived from the title when omitted.
    pub slug: Option<String>,
    pub content: String,
    #[serde(rename = "type")]
    pub content_type: Option<ContentType>,
    pub status: Option<ContentStatus>,
    pub featured_image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContentRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub content_type: Option<ContentType>,
    pub status: Option<ContentStatus>,
    pub featured_image: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub site_name: Option<String>,
    pub site_description: Option<String>,
    pub maintenance_mode: Option<bool>,
    pub allow_registration: Option<bool>,
    pub email_notifications: Option<bool>,
    pub theme: Option<String>,
    pub contact_email: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub social_links: Option<serde_json::Value>,
    #[schema(value_type = Option<Object>)]
    pub analytics: Option<serde_json::Value>,
}

/// Lowercase, ASCII alphanumerics separated by single dashes.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Summer Sale: 50% off!! "), "summer-sale-50-off");
        assert_eq!(slugify("About"), "about");
        assert_eq!(slugify("***"), "");
    }
}
