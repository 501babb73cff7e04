use reqwest::{
    Method, RequestBuilder, Response,
    multipart::{Form, Part},
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::{
    client::{ClientError, cart::CartStore},
    dto::{
        auth::{AuthResponse, LoginRequest, RegisterRequest},
        listings::{ImageUpload, ListingEnvelope, ListingList, NewListing, RentListingRequest},
        orders::{CreateOrderRequest, OrderEnvelope, OrderList},
        profile::{ProfileResponse, UpdateProfileRequest},
    },
    models::{Listing, Order, User},
    response::{ApiResponse, MessageData},
    routes::params::ListingQuery,
};

/// HTTP client for the public API. Holds the bearer token once logged in.
#[derive(Debug, Clone)]
pub struct MarketplaceClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl MarketplaceClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), base_url)
    }

    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn logout(&mut self) {
        self.token = None;
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self.http.get(self.url("/health")).send().await?;
        Ok(resp.status().is_success())
    }

    pub async fn register(&mut self, payload: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        let req = self.request(Method::POST, "/api/auth/register").json(payload);
        let auth: AuthResponse = envelope(req.send().await?).await?;
        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let payload = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let req = self.request(Method::POST, "/api/auth/login").json(&payload);
        let auth: AuthResponse = envelope(req.send().await?).await?;
        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    pub async fn me(&self) -> Result<User, ClientError> {
        let req = self.authed(Method::GET, "/api/auth/me")?;
        envelope(req.send().await?).await
    }

    pub async fn profile(&self) -> Result<ProfileResponse, ClientError> {
        let req = self.authed(Method::GET, "/api/profile")?;
        envelope(req.send().await?).await
    }

    pub async fn update_profile(
        &self,
        name: &str,
        address: &str,
    ) -> Result<ProfileResponse, ClientError> {
        let payload = UpdateProfileRequest {
            name: Some(name.to_string()),
            address: Some(address.to_string()),
        };
        let req = self.authed(Method::PUT, "/api/profile")?.json(&payload);
        envelope(req.send().await?).await
    }

    pub async fn listings(&self, query: &ListingQuery) -> Result<Vec<Listing>, ClientError> {
        let req = self.request(Method::GET, "/api/listings").query(query);
        let list: ListingList = envelope(req.send().await?).await?;
        Ok(list.listings)
    }

    pub async fn my_listings(&self) -> Result<Vec<Listing>, ClientError> {
        let req = self.authed(Method::GET, "/api/listings/my-listings")?;
        let list: ListingList = envelope(req.send().await?).await?;
        Ok(list.listings)
    }

    pub async fn my_rentals(&self) -> Result<Vec<Listing>, ClientError> {
        let req = self.authed(Method::GET, "/api/listings/my-rentals")?;
        let list: ListingList = envelope(req.send().await?).await?;
        Ok(list.listings)
    }

    pub async fn listing(&self, id: Uuid) -> Result<Listing, ClientError> {
        let req = self.authed(Method::GET, &format!("/api/listings/{id}"))?;
        let found: ListingEnvelope = envelope(req.send().await?).await?;
        Ok(found.listing)
    }

    pub async fn create_listing(
        &self,
        listing: &NewListing,
        images: Vec<ImageUpload>,
    ) -> Result<Listing, ClientError> {
        let form = listing_form(listing.to_form_fields(), images)?;
        let req = self.authed(Method::POST, "/api/listings")?.multipart(form);
        let created: ListingEnvelope = envelope(req.send().await?).await?;
        Ok(created.listing)
    }

    /// Send only the given text parts; images replace the current set when
    /// non-empty.
    pub async fn update_listing(
        &self,
        id: Uuid,
        fields: Vec<(&'static str, String)>,
        images: Vec<ImageUpload>,
    ) -> Result<Listing, ClientError> {
        let form = listing_form(fields, images)?;
        let req = self
            .authed(Method::PUT, &format!("/api/listings/{id}"))?
            .multipart(form);
        let updated: ListingEnvelope = envelope(req.send().await?).await?;
        Ok(updated.listing)
    }

    pub async fn delete_listing(&self, id: Uuid) -> Result<MessageData, ClientError> {
        let req = self.authed(Method::DELETE, &format!("/api/listings/{id}"))?;
        envelope(req.send().await?).await
    }

    pub async fn rent_listing(
        &self,
        id: Uuid,
        payload: &RentListingRequest,
    ) -> Result<Listing, ClientError> {
        let req = self
            .authed(Method::POST, &format!("/api/listings/{id}/rent"))?
            .json(payload);
        let rented: ListingEnvelope = envelope(req.send().await?).await?;
        Ok(rented.listing)
    }

    pub async fn return_listing(&self, id: Uuid) -> Result<Listing, ClientError> {
        let req = self.authed(Method::POST, &format!("/api/listings/{id}/return"))?;
        let returned: ListingEnvelope = envelope(req.send().await?).await?;
        Ok(returned.listing)
    }

    pub async fn create_order(&self, payload: &CreateOrderRequest) -> Result<Order, ClientError> {
        let req = self.authed(Method::POST, "/api/orders")?.json(payload);
        let created: OrderEnvelope = envelope(req.send().await?).await?;
        Ok(created.order)
    }

    pub async fn orders(&self) -> Result<Vec<Order>, ClientError> {
        let req = self.authed(Method::GET, "/api/orders")?;
        let list: OrderList = envelope(req.send().await?).await?;
        Ok(list.orders)
    }

    pub async fn order(&self, id: Uuid) -> Result<Order, ClientError> {
        let req = self.authed(Method::GET, &format!("/api/orders/{id}"))?;
        let found: OrderEnvelope = envelope(req.send().await?).await?;
        Ok(found.order)
    }

    /// Place an order for everything in the cart and empty the cart once the
    /// server has accepted it. A rejected order leaves the cart as it was.
    pub async fn checkout(
        &self,
        cart: &mut CartStore,
        delivery_address: &str,
    ) -> Result<Order, ClientError> {
        let payload = cart.checkout_request(delivery_address)?;
        let order = self.create_order(&payload).await?;
        cart.clear()?;
        tracing::debug!(order_id = %order.id, "checkout complete, cart cleared");
        Ok(order)
    }

    pub async fn image(&self, id: Uuid) -> Result<Vec<u8>, ClientError> {
        let resp = self
            .request(Method::GET, &format!("/api/images/{id}"))
            .send()
            .await?;
        let resp = ensure_success(resp).await?;
        Ok(resp.bytes().await?.to_vec())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.url(path))
    }

    fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let token = self.token.as_deref().ok_or(ClientError::NotAuthenticated)?;
        Ok(self.request(method, path).bearer_auth(token))
    }
}

fn listing_form(
    fields: Vec<(&'static str, String)>,
    images: Vec<ImageUpload>,
) -> Result<Form, ClientError> {
    let mut form = Form::new();
    for (key, value) in fields {
        form = form.text(key, value);
    }
    for image in images {
        let part = Part::bytes(image.bytes)
            .file_name(image.filename)
            .mime_str(&image.content_type)?;
        form = form.part("images", part);
    }
    Ok(form)
}

/// Unwrap `{success, data, error}`, turning failures into [`ClientError::Api`].
async fn envelope<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    let status = resp.status();
    let body: ApiResponse<T> = match resp.json().await {
        Ok(body) => body,
        Err(_) if !status.is_success() => {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("error").to_string(),
            });
        }
        Err(err) => return Err(err.into()),
    };
    match body {
        ApiResponse {
            success: true,
            data: Some(data),
            ..
        } if status.is_success() => Ok(data),
        ApiResponse { error, .. } => Err(ClientError::Api {
            status: status.as_u16(),
            message: error.unwrap_or_else(|| "missing data".to_string()),
        }),
    }
}

async fn ensure_success(resp: Response) -> Result<Response, ClientError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let message = match resp.json::<ApiResponse<serde_json::Value>>().await {
        Ok(ApiResponse {
            error: Some(error), ..
        }) => error,
        _ => "request failed".to_string(),
    };
    Err(ClientError::Api { status, message })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let client = MarketplaceClient::new("http://localhost:5000/");
        assert_eq!(client.url("/api/listings"), "http://localhost:5000/api/listings");
    }

    #[tokio::test]
    async fn protected_calls_need_a_token() {
        let client = MarketplaceClient::new("http://127.0.0.1:9");
        assert!(matches!(
            client.orders().await,
            Err(ClientError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn checkout_with_empty_cart_never_hits_the_network() {
        let mut client = MarketplaceClient::new("http://127.0.0.1:9");
        client.set_token(Some("token".into()));
        let mut cart = CartStore::in_memory();
        assert!(matches!(
            client.checkout(&mut cart, "1 Main St").await,
            Err(ClientError::EmptyCart)
        ));
    }
}
