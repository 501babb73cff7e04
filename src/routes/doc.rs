use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        admin::{
            AdminLoginResponse, AdminOrderPage, AdminUserUpdate, CreateContentRequest, Dashboard,
            DashboardStats, UpdateContentRequest, UpdateListingStatusRequest,
            UpdateOrderStatusRequest, UpdateSettingsRequest,
        },
        auth::{AuthResponse, LoginRequest, RegisterRequest},
        listings::{ListingEnvelope, ListingList, ListingUploadForm, RentListingRequest},
        orders::{CreateOrderRequest, OrderEnvelope, OrderList},
        profile::{ProfileResponse, UpdateProfileRequest},
    },
    models::{
        Content, ContentStatus, ContentType, Image, Listing, ListingCondition, ListingStatus,
        ListingType, Order, OrderItem, OrderItemType, OrderStatus, Price, Profile, RentalPeriod,
        Role, SellerSummary, Settings, User,
    },
    response::{ApiResponse, MessageData},
    routes::{admin, auth, health, images, listings, orders, params, profile},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::me,
        profile::show,
        profile::update,
        listings::create_listing,
        listings::list_listings,
        listings::my_listings,
        listings::my_rentals,
        listings::get_listing,
        listings::update_listing,
        listings::delete_listing,
        listings::rent_listing,
        listings::return_listing,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        images::get_image,
        admin::login,
        admin::logout,
        admin::dashboard,
        admin::list_users,
        admin::get_user,
        admin::update_user,
        admin::delete_user,
        admin::list_orders,
        admin::update_order_status,
        admin::list_listings,
        admin::update_listing_status,
        admin::delete_listing,
        admin::list_content,
        admin::create_content,
        admin::update_content,
        admin::delete_content,
        admin::get_settings,
        admin::update_settings
    ),
    components(
        schemas(
            User,
            Role,
            Profile,
            Image,
            SellerSummary,
            Price,
            Listing,
            ListingType,
            ListingCondition,
            ListingStatus,
            RentalPeriod,
            Order,
            OrderItem,
            OrderItemType,
            OrderStatus,
            Content,
            ContentType,
            ContentStatus,
            Settings,
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            UpdateProfileRequest,
            ProfileResponse,
            ListingEnvelope,
            ListingList,
            ListingUploadForm,
            RentListingRequest,
            CreateOrderRequest,
            OrderEnvelope,
            OrderList,
            AdminLoginResponse,
            AdminOrderPage,
            AdminUserUpdate,
            Dashboard,
            DashboardStats,
            UpdateOrderStatusRequest,
            UpdateListingStatusRequest,
            CreateContentRequest,
            UpdateContentRequest,
            UpdateSettingsRequest,
            MessageData,
            params::Pagination,
            params::ListingQuery,
            params::AdminOrderQuery,
            ApiResponse<User>,
            ApiResponse<AuthResponse>,
            ApiResponse<ProfileResponse>,
            ApiResponse<ListingEnvelope>,
            ApiResponse<ListingList>,
            ApiResponse<OrderEnvelope>,
            ApiResponse<OrderList>,
            ApiResponse<MessageData>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and the current user"),
        (name = "Profile", description = "Profile of the caller"),
        (name = "Listings", description = "Sale and rental listings"),
        (name = "Rentals", description = "Renting and returning listings"),
        (name = "Orders", description = "Checkout and order history"),
        (name = "Images", description = "Stored listing images"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_listing_and_admin_paths() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/api/listings"));
        assert!(paths.contains_key("/api/listings/{id}/rent"));
        assert!(paths.contains_key("/api/admin/settings"));
        assert!(paths.contains_key("/health"));
    }
}
