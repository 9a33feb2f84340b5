//! Session-related types.
//!
//! The session only carries an opaque cart key. Cart contents live in the
//! per-key [`CartStore`](crate::cart::CartStore), never in the cookie.

use tower_sessions::Session;
use uuid::Uuid;

/// Session keys.
pub mod session_keys {
    /// Key for the shopper's cart store.
    pub const CART_KEY: &str = "cart_key";
}

/// Get the session's cart key, minting one on first use.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn cart_key(session: &Session) -> Result<Uuid, tower_sessions::session::Error> {
    if let Some(key) = session.get::<Uuid>(session_keys::CART_KEY).await? {
        return Ok(key);
    }

    let key = Uuid::new_v4();
    session.insert(session_keys::CART_KEY, key).await?;
    tracing::debug!(cart_key = %key, "Started new cart session");
    Ok(key)
}
