//! Integration tests for Pawmart.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p pawmart-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_store` - Cart store behaviour against an in-process backend
//! - `cart_sessions` - One backend cart per shopper
//! - `image_resolution` - Image resolution and extension probing
//! - `storefront_routes` - Cart panel HTML and HTMX headers, end to end
//!
//! No outside network is needed. [`FakeBackend`] keeps a cart in memory the
//! way the pet backend does, including its habit of dropping image fields
//! from cart responses, [`FakeCarts`] keeps one of those per cart id, and
//! [`FakeProbe`] answers image probes from a fixed set. Route tests run the
//! real storefront against [`backend::PetBackend`] on a local port.

pub mod backend;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use pawmart_core::{CartItemId, CartLineItem, Pet, PetId, Price};
use pawmart_storefront::api::{ApiError, CartApi, CartBackend, CheckoutReceipt};
use pawmart_storefront::images::ImageProbe;
use uuid::Uuid;

/// Backend operation names, as recorded in [`FakeBackend::calls`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    List,
    Add,
    Update,
    Remove,
    Clear,
    Checkout,
    Total,
}

#[derive(Default)]
struct BackendState {
    items: Vec<CartLineItem>,
    next_item_id: i64,
    calls: Vec<Call>,
    failing: HashSet<Call>,
}

/// In-memory stand-in for the pet backend's cart endpoints.
///
/// Cheaply cloneable; clones share the same cart.
#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<BackendState>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    latency: Option<Duration>,
}

impl FakeBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call, so overlapping store operations actually overlap.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every later call of `call` fail with a 500.
    pub fn fail(&self, call: Call) {
        self.lock().failing.insert(call);
    }

    /// Stop failing `call`.
    pub fn recover(&self, call: Call) {
        self.lock().failing.remove(&call);
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Number of recorded calls of one kind.
    #[must_use]
    pub fn count(&self, call: Call) -> usize {
        self.lock().calls.iter().filter(|c| **c == call).count()
    }

    /// Highest number of calls that were ever in progress at once.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Current backend line items.
    #[must_use]
    pub fn items(&self) -> Vec<CartLineItem> {
        self.lock().items.clone()
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn enter(&self, call: Call) -> Result<InFlight<'_>, ApiError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.lock();
        state.calls.push(call);
        if state.failing.contains(&call) {
            return Err(ApiError::Status {
                status: 500,
                message: format!("{call:?} failed"),
            });
        }
        Ok(guard)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A pet as it appears inside cart responses: no image fields.
fn without_images(pet_id: PetId) -> Pet {
    let mut pet = pet(pet_id.as_i64(), "", None);
    pet.name = format!("Pet {pet_id}");
    pet
}

impl CartApi for FakeBackend {
    async fn list_items(&self) -> Result<Vec<CartLineItem>, ApiError> {
        let _call = self.enter(Call::List).await?;
        Ok(self.items())
    }

    async fn add_item(&self, pet_id: PetId, quantity: u32) -> Result<(), ApiError> {
        let _call = self.enter(Call::Add).await?;
        let mut state = self.lock();

        if let Some(item) = state.items.iter_mut().find(|i| i.pet.id == pet_id) {
            item.quantity += quantity;
            return Ok(());
        }

        state.next_item_id += 1;
        let item = CartLineItem {
            id: CartItemId::new(state.next_item_id + 9),
            pet: without_images(pet_id),
            quantity,
            subtotal: None,
        };
        state.items.push(item);
        Ok(())
    }

    async fn update_quantity(&self, item_id: CartItemId, quantity: u32) -> Result<(), ApiError> {
        let _call = self.enter(Call::Update).await?;
        let mut state = self.lock();
        match state.items.iter_mut().find(|i| i.id == item_id) {
            Some(item) => {
                item.quantity = quantity;
                Ok(())
            }
            None => Err(ApiError::NotFound(format!("/api/v1/cart/items/{item_id}"))),
        }
    }

    async fn remove_item(&self, item_id: CartItemId) -> Result<Option<String>, ApiError> {
        let _call = self.enter(Call::Remove).await?;
        self.lock().items.retain(|i| i.id != item_id);
        Ok(Some("Item removed from cart".to_string()))
    }

    async fn clear(&self) -> Result<Option<String>, ApiError> {
        let _call = self.enter(Call::Clear).await?;
        self.lock().items.clear();
        Ok(None)
    }

    async fn checkout(&self) -> Result<CheckoutReceipt, ApiError> {
        let _call = self.enter(Call::Checkout).await?;
        let mut state = self.lock();
        let total = sum(&state.items);
        state.items.clear();
        Ok(CheckoutReceipt {
            message: "Order placed".to_string(),
            total,
        })
    }

    async fn total(&self) -> Result<Price, ApiError> {
        let _call = self.enter(Call::Total).await?;
        Ok(sum(&self.lock().items))
    }
}

/// One [`FakeBackend`] cart per cart id.
///
/// Cheaply cloneable; clones share the same carts.
#[derive(Clone, Default)]
pub struct FakeCarts {
    carts: Arc<Mutex<HashMap<Uuid, FakeBackend>>>,
}

impl FakeCarts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The cart for `cart_id`, created empty on first use.
    #[must_use]
    pub fn cart_for(&self, cart_id: Uuid) -> FakeBackend {
        self.carts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(cart_id)
            .or_default()
            .clone()
    }
}

impl CartBackend for FakeCarts {
    type Cart = FakeBackend;

    fn cart(&self, cart_id: Uuid) -> FakeBackend {
        self.cart_for(cart_id)
    }
}

fn sum(items: &[CartLineItem]) -> Price {
    Price::new(items.iter().map(|i| i.line_total().amount()).sum())
}

/// Build a pet with a whole-dollar price of `10 * id`.
#[must_use]
pub fn pet(id: i64, name: &str, image: Option<&str>) -> Pet {
    Pet {
        id: PetId::new(id),
        name: name.to_string(),
        breed: String::new(),
        pet_type: None,
        birth_year: None,
        price: Price::new(rust_decimal::Decimal::from(id * 10)),
        image: image.map(String::from),
        image_url: None,
    }
}

/// Image probe that succeeds for a fixed set of URLs and records attempts.
///
/// Clones share the attempt log, so a test can keep one after handing the
/// probe to a resolver.
#[derive(Clone, Default)]
pub struct FakeProbe {
    loads: Arc<HashSet<String>>,
    attempts: Arc<Mutex<Vec<String>>>,
}

impl FakeProbe {
    #[must_use]
    pub fn loading(urls: &[&str]) -> Self {
        Self {
            loads: Arc::new(urls.iter().map(|u| (*u).to_string()).collect()),
            attempts: Arc::default(),
        }
    }

    /// Every URL probed so far, in order.
    #[must_use]
    pub fn attempts(&self) -> Vec<String> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ImageProbe for FakeProbe {
    async fn probe(&self, url: &str) -> bool {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
        self.loads.contains(url)
    }
}
