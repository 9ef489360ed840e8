//! Integration test support for Shopfront cart sessions.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopfront-integration-tests
//! ```
//!
//! Cart session tests run on a paused tokio clock, so debounce timing is
//! exact and the suite needs no database or network.
//!
//! [`RecordingPersistence`] wraps the in-memory store, logs every call with
//! the (virtual) time it was made, and can inject failures and latency.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::time::Instant;

use shopfront_core::{CartState, Email, Item, ItemId, Price, StoredCartLine, UserKey};
use shopfront_storefront::models::{ProfileUpdate, SessionUser, User, UserProfile};
use shopfront_storefront::persistence::{InMemoryPersistence, Persistence, SyncError};
use shopfront_storefront::sync::CartHandle;

/// Upper bound on any wait in a test; virtual time, so it costs nothing.
const WAIT_LIMIT: Duration = Duration::from_secs(600);

/// A persistence call as seen by [`RecordingPersistence`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FetchCart(UserKey),
    ReplaceCart(UserKey, Vec<StoredCartLine>),
    ClearCart(UserKey),
    FetchOrCreateUser(UserKey),
    UpdateUser(UserKey),
}

/// A call and the instant it started.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub at: Instant,
    pub call: Call,
}

#[derive(Debug, Default)]
struct Faults {
    fail_fetch: bool,
    fail_replace: bool,
    fail_clear: bool,
    fetch_delay: Duration,
    replace_delay: Duration,
}

/// In-memory persistence that records calls and injects faults.
#[derive(Debug, Clone, Default)]
pub struct RecordingPersistence {
    store: InMemoryPersistence,
    calls: Arc<Mutex<Vec<Recorded>>>,
    faults: Arc<Mutex<Faults>>,
}

impl RecordingPersistence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The backing store, for seeding and inspecting stored carts.
    #[must_use]
    pub const fn store(&self) -> &InMemoryPersistence {
        &self.store
    }

    /// Every call so far, in start order.
    #[must_use]
    pub fn calls(&self) -> Vec<Recorded> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Start times and payloads of `replace_cart` calls.
    #[must_use]
    pub fn replace_calls(&self) -> Vec<(Instant, Vec<StoredCartLine>)> {
        self.calls()
            .into_iter()
            .filter_map(|r| match r.call {
                Call::ReplaceCart(_, lines) => Some((r.at, lines)),
                _ => None,
            })
            .collect()
    }

    /// Number of `clear_cart` calls.
    #[must_use]
    pub fn clear_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|r| matches!(r.call, Call::ClearCart(_)))
            .count()
    }

    /// Number of `fetch_cart` calls.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|r| matches!(r.call, Call::FetchCart(_)))
            .count()
    }

    pub fn fail_fetch(&self, fail: bool) {
        self.with_faults(|f| f.fail_fetch = fail);
    }

    pub fn fail_replace(&self, fail: bool) {
        self.with_faults(|f| f.fail_replace = fail);
    }

    pub fn fail_clear(&self, fail: bool) {
        self.with_faults(|f| f.fail_clear = fail);
    }

    /// Delay every `fetch_cart` by `delay` before it reads the store.
    pub fn delay_fetch(&self, delay: Duration) {
        self.with_faults(|f| f.fetch_delay = delay);
    }

    /// Delay every `replace_cart` by `delay` before it writes the store.
    pub fn delay_replace(&self, delay: Duration) {
        self.with_faults(|f| f.replace_delay = delay);
    }

    fn with_faults<T>(&self, f: impl FnOnce(&mut Faults) -> T) -> T {
        f(&mut self.faults.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn record(&self, call: Call) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Recorded {
                at: Instant::now(),
                call,
            });
    }
}

fn injected() -> SyncError {
    SyncError::Remote("injected failure".to_string())
}

#[async_trait]
impl Persistence for RecordingPersistence {
    async fn fetch_cart(&self, user: &UserKey) -> Result<Vec<StoredCartLine>, SyncError> {
        self.record(Call::FetchCart(user.clone()));
        let (fail, delay) = self.with_faults(|f| (f.fail_fetch, f.fetch_delay));
        tokio::time::sleep(delay).await;
        if fail {
            return Err(injected());
        }
        self.store.fetch_cart(user).await
    }

    async fn replace_cart(
        &self,
        user: &UserKey,
        lines: &[StoredCartLine],
    ) -> Result<(), SyncError> {
        self.record(Call::ReplaceCart(user.clone(), lines.to_vec()));
        let (fail, delay) = self.with_faults(|f| (f.fail_replace, f.replace_delay));
        tokio::time::sleep(delay).await;
        if fail {
            return Err(injected());
        }
        self.store.replace_cart(user, lines).await
    }

    async fn clear_cart(&self, user: &UserKey) -> Result<(), SyncError> {
        self.record(Call::ClearCart(user.clone()));
        if self.with_faults(|f| f.fail_clear) {
            return Err(injected());
        }
        self.store.clear_cart(user).await
    }

    async fn fetch_or_create_user(
        &self,
        user: &UserKey,
        profile: &UserProfile,
    ) -> Result<User, SyncError> {
        self.record(Call::FetchOrCreateUser(user.clone()));
        self.store.fetch_or_create_user(user, profile).await
    }

    async fn update_user(
        &self,
        user: &UserKey,
        update: &ProfileUpdate,
    ) -> Result<User, SyncError> {
        self.record(Call::UpdateUser(user.clone()));
        self.store.update_user(user, update).await
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// A signed-in shopper whose key and email derive from `name`.
///
/// # Panics
///
/// Panics if `name` is not a valid user key.
#[must_use]
pub fn shopper(name: &str) -> SessionUser {
    let key = UserKey::parse(name).expect("valid user key");
    let email = Email::parse(&format!("{name}@example.com")).expect("valid email");
    SessionUser::new(key, email, Some(name))
}

/// A catalog item priced in whole dollars.
///
/// # Panics
///
/// Panics if `dollars` is negative.
#[must_use]
pub fn item(id: &str, dollars: i64) -> Item {
    Item {
        id: ItemId::from(id),
        name: format!("Item {id}"),
        price: Price::new(Decimal::from(dollars)).expect("non-negative price"),
        image: String::new(),
        description: String::new(),
        category: "test".to_string(),
    }
}

/// A stored cart line priced in whole dollars.
#[must_use]
pub fn stored_line(id: &str, dollars: i64, quantity: i64) -> StoredCartLine {
    StoredCartLine {
        product_id: id.to_string(),
        name: format!("Item {id}"),
        price: Decimal::from(dollars),
        image: String::new(),
        description: String::new(),
        category: "test".to_string(),
        quantity,
    }
}

/// Wait until the published cart satisfies `pred` and return it.
///
/// # Panics
///
/// Panics if the session stops or the condition does not hold in time.
pub async fn wait_until(cart: &CartHandle, pred: impl FnMut(&CartState) -> bool) -> CartState {
    let mut rx = cart.subscribe();
    tokio::time::timeout(WAIT_LIMIT, async move {
        rx.wait_for(pred).await.map(|state| state.clone())
    })
    .await
    .expect("condition not reached in time")
    .expect("cart session closed")
}

/// Quantities of the cart's lines, by item id, in cart order.
#[must_use]
pub fn quantities(cart: &CartState) -> Vec<(String, u32)> {
    cart.lines()
        .iter()
        .map(|line| (line.item.id.to_string(), line.quantity.get()))
        .collect()
}
