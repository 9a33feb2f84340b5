//! `reqwest` implementation of the pet backend client.
//!
//! Caches pet listings using `moka` (5-minute TTL). Cart responses are never
//! cached.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use pawmart_core::{CartItemId, CartLineItem, Pet, PetId, PetType, Price};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::cache::{CacheKey, CacheValue};
use super::types::{
    AddItemRequest, CheckoutReceipt, TotalResponse, UpdateQuantityRequest, confirmation_message,
};
use super::{ApiError, CART_ID_HEADER, CartApi, CartBackend};
use crate::config::PetApiConfig;

/// Number of body characters kept in logs and error messages.
const BODY_PREVIEW_CHARS: usize = 200;

/// Client for the pet backend REST API.
///
/// Cheaply cloneable; clones share the connection pool and the pet cache.
#[derive(Clone)]
pub struct PetApiClient {
    inner: Arc<PetApiClientInner>,
}

struct PetApiClientInner {
    client: reqwest::Client,
    /// Base URL without a trailing slash.
    base: String,
    token: Option<SecretString>,
    cache: Cache<CacheKey, CacheValue>,
}

impl PetApiClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &PetApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Ok(Self {
            inner: Arc::new(PetApiClientInner {
                client,
                base: config.base_url.as_str().trim_end_matches('/').to_string(),
                token: config.token.clone(),
                cache,
            }),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base)
    }

    /// Send a request and turn non-success statuses into errors.
    ///
    /// Returns the response body as text.
    async fn send(&self, request: reqwest::RequestBuilder, path: &str) -> Result<String, ApiError> {
        let request = match &self.inner.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(path.to_string()));
        }

        let body = response.text().await?;

        if !status.is_success() {
            let preview = body.chars().take(BODY_PREVIEW_CHARS).collect::<String>();
            tracing::error!(
                status = %status,
                path,
                body = %preview,
                "Pet backend returned non-success status"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: preview,
            });
        }

        Ok(body)
    }

    /// GET a JSON document.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.fetch_json(self.inner.client.get(self.url(path)), path)
            .await
    }

    /// Send a request and parse the response body as JSON.
    async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        path: &str,
    ) -> Result<T, ApiError> {
        let body = self.send(request, path).await?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                path,
                body = %body.chars().take(BODY_PREVIEW_CHARS).collect::<String>(),
                "Failed to parse pet backend response"
            );
            ApiError::Parse(e)
        })
    }

    // =========================================================================
    // Pet Methods
    // =========================================================================

    /// List pets, optionally restricted to one pet type.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_pets(&self, pet_type: Option<PetType>) -> Result<Vec<Pet>, ApiError> {
        let pets = if let Some(CacheValue::Pets(pets)) = self.inner.cache.get(&CacheKey::Pets).await
        {
            debug!("Cache hit for pet listing");
            pets
        } else {
            let pets: Arc<Vec<Pet>> = Arc::new(self.get_json("/api/v1/pets").await?);
            self.inner
                .cache
                .insert(CacheKey::Pets, CacheValue::Pets(Arc::clone(&pets)))
                .await;
            pets
        };

        Ok(pets
            .iter()
            .filter(|pet| pet_type.is_none() || pet.pet_type == pet_type)
            .cloned()
            .collect())
    }

    /// Get a single pet by ID.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the backend has no such pet, or another
    /// error if the API request fails.
    #[instrument(skip(self), fields(pet_id = %pet_id))]
    pub async fn get_pet(&self, pet_id: PetId) -> Result<Pet, ApiError> {
        let key = CacheKey::Pet(pet_id);

        if let Some(CacheValue::Pet(pet)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for pet");
            return Ok(*pet);
        }

        let pet: Pet = self.get_json(&format!("/api/v1/pets/{pet_id}")).await?;

        self.inner
            .cache
            .insert(key, CacheValue::Pet(Box::new(pet.clone())))
            .await;

        Ok(pet)
    }

    /// Invalidate all cached pet data.
    pub fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
    }
}

impl CartBackend for PetApiClient {
    type Cart = CartClient;

    fn cart(&self, cart_id: Uuid) -> CartClient {
        CartClient {
            api: self.clone(),
            cart_id,
        }
    }
}

/// [`CartApi`] bound to a single backend cart.
///
/// Every request carries the cart id in [`CART_ID_HEADER`], so two shoppers
/// never read or change each other's carts.
#[derive(Clone)]
pub struct CartClient {
    api: PetApiClient,
    cart_id: Uuid,
}

impl CartClient {
    /// Backend cart this handle operates on.
    #[must_use]
    pub const fn cart_id(&self) -> Uuid {
        self.cart_id
    }

    fn scoped(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.header(CART_ID_HEADER, self.cart_id.to_string())
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.scoped(self.api.inner.client.request(method, self.api.url(path)))
    }

    async fn send(&self, method: reqwest::Method, path: &str) -> Result<String, ApiError> {
        self.api.send(self.request(method, path), path).await
    }
}

impl CartApi for CartClient {
    #[instrument(skip(self), fields(cart_id = %self.cart_id))]
    async fn list_items(&self) -> Result<Vec<CartLineItem>, ApiError> {
        let path = "/api/v1/cart";
        self.api
            .fetch_json(self.request(Method::GET, path), path)
            .await
    }

    #[instrument(skip(self), fields(cart_id = %self.cart_id, pet_id = %pet_id))]
    async fn add_item(&self, pet_id: PetId, quantity: u32) -> Result<(), ApiError> {
        let path = "/api/v1/cart/items";
        let body = AddItemRequest { pet_id, quantity };
        self.api
            .send(self.request(Method::POST, path).json(&body), path)
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(cart_id = %self.cart_id, item_id = %item_id))]
    async fn update_quantity(&self, item_id: CartItemId, quantity: u32) -> Result<(), ApiError> {
        let path = "/api/v1/cart/items";
        let body = UpdateQuantityRequest {
            cart_item_id: item_id,
            quantity,
        };
        self.api
            .send(self.request(Method::PUT, path).json(&body), path)
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(cart_id = %self.cart_id, item_id = %item_id))]
    async fn remove_item(&self, item_id: CartItemId) -> Result<Option<String>, ApiError> {
        let body = self
            .send(Method::DELETE, &format!("/api/v1/cart/items/{item_id}"))
            .await?;
        Ok(confirmation_message(&body))
    }

    #[instrument(skip(self), fields(cart_id = %self.cart_id))]
    async fn clear(&self) -> Result<Option<String>, ApiError> {
        let body = self.send(Method::DELETE, "/api/v1/cart").await?;
        Ok(confirmation_message(&body))
    }

    #[instrument(skip(self), fields(cart_id = %self.cart_id))]
    async fn checkout(&self) -> Result<CheckoutReceipt, ApiError> {
        let body = self.send(Method::POST, "/api/v1/cart/checkout").await?;
        Ok(serde_json::from_str(&body)?)
    }

    #[instrument(skip(self), fields(cart_id = %self.cart_id))]
    async fn total(&self) -> Result<Price, ApiError> {
        let path = "/api/v1/cart/total";
        let total: TotalResponse = self
            .api
            .fetch_json(self.request(Method::GET, path), path)
            .await?;
        Ok(total.into_price())
    }
}
