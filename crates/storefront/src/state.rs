//! Application state shared across handlers.

use std::sync::Arc;

use crate::api::{ApiError, PetApiClient};
use crate::cart::CartSessions;
use crate::config::StorefrontConfig;
use crate::images::{HttpProbe, ImageResolver};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the backend client, per-session carts and the image resolver. Each
/// session's cart store talks to its own backend cart through a
/// [`CartClient`](crate::api::CartClient) handed out by the shared client.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    api: PetApiClient,
    carts: CartSessions<PetApiClient>,
    images: ImageResolver<HttpProbe>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client fails to build.
    pub fn new(config: StorefrontConfig) -> Result<Self, ApiError> {
        let api = PetApiClient::new(&config.pet_api)?;
        let carts = CartSessions::new(api.clone(), config.cart_idle_timeout);
        let probe = HttpProbe::new(config.image_probe_timeout)?;
        let images = ImageResolver::new(probe, config.pet_api.origin());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                carts,
                images,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the pet backend client.
    #[must_use]
    pub fn api(&self) -> &PetApiClient {
        &self.inner.api
    }

    /// Get a reference to the per-session cart stores.
    #[must_use]
    pub fn carts(&self) -> &CartSessions<PetApiClient> {
        &self.inner.carts
    }

    /// Get a reference to the pet image resolver.
    #[must_use]
    pub fn images(&self) -> &ImageResolver<HttpProbe> {
        &self.inner.images
    }
}
