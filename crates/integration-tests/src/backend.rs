//! In-process HTTP pet backend.
//!
//! Serves the same REST endpoints as the real backend on a random local
//! port, so the storefront can be driven end to end through its real client,
//! session layer and image checks. Carts are kept per `X-Cart-Id` header and
//! cart responses drop pet image fields, as the real backend does.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use pawmart_core::{CartItemId, CartLineItem, Pet, PetId, Price};
use pawmart_storefront::api::CART_ID_HEADER;
use pawmart_storefront::config::{PetApiConfig, StorefrontConfig};
use serde::Deserialize;
use serde_json::json;

#[derive(Default)]
struct ServerState {
    carts: HashMap<String, Vec<CartLineItem>>,
    next_item_id: i64,
    requests: Vec<String>,
    failing_updates: bool,
    remove_message: Option<String>,
}

struct Shared {
    pets: Vec<Pet>,
    images: HashSet<String>,
    state: Mutex<ServerState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to a running in-process backend.
pub struct PetBackend {
    addr: SocketAddr,
    shared: Arc<Shared>,
}

impl PetBackend {
    /// Start a backend listing `pets` and serving image files named in
    /// `images` (for example `"rex.jpg"`).
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    #[allow(clippy::unwrap_used)]
    pub async fn start(pets: Vec<Pet>, images: &[&str]) -> Self {
        let shared = Arc::new(Shared {
            pets,
            images: images.iter().map(|name| (*name).to_string()).collect(),
            state: Mutex::default(),
        });

        let router = Router::new()
            .route("/api/v1/pets", get(list_pets))
            .route("/api/v1/pets/{id}", get(get_pet))
            .route("/api/v1/pets/images/{name}", get(image))
            .route("/api/v1/cart", get(list_items).delete(clear))
            .route("/api/v1/cart/items", post(add_item).put(update_quantity))
            .route("/api/v1/cart/items/{id}", axum::routing::delete(remove_item))
            .route("/api/v1/cart/total", get(total))
            .route("/api/v1/cart/checkout", post(checkout))
            .with_state(Arc::clone(&shared));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await });

        Self { addr, shared }
    }

    /// Base URL of the backend.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Storefront configuration pointing at this backend.
    ///
    /// # Panics
    ///
    /// Panics if the base URL does not parse.
    #[allow(clippy::unwrap_used)]
    #[must_use]
    pub fn storefront_config(&self) -> StorefrontConfig {
        StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 0,
            base_url: "http://localhost:3000".to_string(),
            pet_api: PetApiConfig {
                base_url: self.base_url().parse().unwrap(),
                token: None,
                timeout: Duration::from_secs(5),
            },
            image_probe_timeout: Duration::from_secs(2),
            cart_idle_timeout: Duration::from_secs(600),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    /// Every request served so far, as `"METHOD /path"`.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.shared.lock().requests.clone()
    }

    /// Number of requests served for one `"METHOD /path"`.
    #[must_use]
    pub fn count(&self, request: &str) -> usize {
        self.requests().iter().filter(|r| *r == request).count()
    }

    /// Number of requests for image files.
    #[must_use]
    pub fn image_requests(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.contains("/api/v1/pets/images/"))
            .count()
    }

    /// Number of carts that hold at least one item.
    #[must_use]
    pub fn non_empty_carts(&self) -> usize {
        self.shared
            .lock()
            .carts
            .values()
            .filter(|items| !items.is_empty())
            .count()
    }

    /// Make quantity updates fail with a 500 until called with `false`.
    pub fn fail_updates(&self, failing: bool) {
        self.shared.lock().failing_updates = failing;
    }

    /// Text the remove endpoint answers with. `None` means an empty body.
    pub fn set_remove_message(&self, message: Option<&str>) {
        self.shared.lock().remove_message = message.map(String::from);
    }
}

fn record(shared: &Shared, request: String) {
    shared.lock().requests.push(request);
}

fn cart_id(headers: &HeaderMap) -> String {
    headers
        .get(CART_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn sum(items: &[CartLineItem]) -> Price {
    Price::new(items.iter().map(|i| i.line_total().amount()).sum())
}

async fn list_pets(State(shared): State<Arc<Shared>>) -> Json<Vec<Pet>> {
    record(&shared, "GET /api/v1/pets".to_string());
    Json(shared.pets.clone())
}

async fn get_pet(
    State(shared): State<Arc<Shared>>,
    Path(id): Path<PetId>,
) -> Result<Json<Pet>, StatusCode> {
    record(&shared, format!("GET /api/v1/pets/{id}"));
    shared
        .pets
        .iter()
        .find(|pet| pet.id == id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn image(State(shared): State<Arc<Shared>>, Path(name): Path<String>) -> Response {
    record(&shared, format!("HEAD /api/v1/pets/images/{name}"));
    if shared.images.contains(&name) {
        ([(header::CONTENT_TYPE, "image/png")], Vec::<u8>::new()).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn list_items(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
) -> Json<Vec<CartLineItem>> {
    record(&shared, "GET /api/v1/cart".to_string());
    let state = shared.lock();
    Json(
        state
            .carts
            .get(&cart_id(&headers))
            .cloned()
            .unwrap_or_default(),
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddItem {
    pet_id: PetId,
    quantity: u32,
}

async fn add_item(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
    Json(body): Json<AddItem>,
) -> StatusCode {
    record(&shared, "POST /api/v1/cart/items".to_string());
    let Some(pet) = shared.pets.iter().find(|pet| pet.id == body.pet_id) else {
        return StatusCode::NOT_FOUND;
    };

    let mut state = shared.lock();
    state.next_item_id += 1;
    let item_id = CartItemId::new(state.next_item_id + 99);
    let items = state.carts.entry(cart_id(&headers)).or_default();

    if let Some(item) = items.iter_mut().find(|item| item.pet.id == body.pet_id) {
        item.quantity += body.quantity;
    } else {
        let mut pet = pet.clone();
        pet.image = None;
        pet.image_url = None;
        items.push(CartLineItem {
            id: item_id,
            pet,
            quantity: body.quantity,
            subtotal: None,
        });
    }
    StatusCode::CREATED
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateQuantity {
    cart_item_id: CartItemId,
    quantity: u32,
}

async fn update_quantity(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
    Json(body): Json<UpdateQuantity>,
) -> StatusCode {
    record(&shared, "PUT /api/v1/cart/items".to_string());
    let mut state = shared.lock();
    if state.failing_updates {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }

    let item = state
        .carts
        .get_mut(&cart_id(&headers))
        .and_then(|items| items.iter_mut().find(|item| item.id == body.cart_item_id));
    match item {
        Some(item) => {
            item.quantity = body.quantity;
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn remove_item(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
    Path(id): Path<CartItemId>,
) -> Response {
    record(&shared, format!("DELETE /api/v1/cart/items/{id}"));
    let mut state = shared.lock();
    if let Some(items) = state.carts.get_mut(&cart_id(&headers)) {
        items.retain(|item| item.id != id);
    }

    match &state.remove_message {
        Some(message) => Json(json!({ "message": message })).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn clear(State(shared): State<Arc<Shared>>, headers: HeaderMap) -> StatusCode {
    record(&shared, "DELETE /api/v1/cart".to_string());
    shared.lock().carts.remove(&cart_id(&headers));
    StatusCode::NO_CONTENT
}

async fn total(State(shared): State<Arc<Shared>>, headers: HeaderMap) -> Json<serde_json::Value> {
    record(&shared, "GET /api/v1/cart/total".to_string());
    let state = shared.lock();
    let total = state
        .carts
        .get(&cart_id(&headers))
        .map_or(Price::ZERO, |items| sum(items));
    Json(json!({ "total": total }))
}

async fn checkout(State(shared): State<Arc<Shared>>, headers: HeaderMap) -> Json<serde_json::Value> {
    record(&shared, "POST /api/v1/cart/checkout".to_string());
    let items = shared
        .lock()
        .carts
        .remove(&cart_id(&headers))
        .unwrap_or_default();
    Json(json!({ "message": "Order placed", "total": sum(&items) }))
}
