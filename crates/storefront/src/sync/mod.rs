//! Client-side cart session with debounced server synchronization.
//!
//! A session is one tokio task (the coordinator) that exclusively owns a
//! [`CartState`]. Everything that can change the cart reaches it as an event:
//!
//! - shopper commands sent through a [`CartHandle`]
//! - identity transitions observed on the identity provider's `watch` channel
//! - completions of the network calls the coordinator spawned
//!
//! Events are handled one at a time and each runs to completion, so cart
//! transitions never interleave. Network calls run in their own tasks and
//! report back as events; the coordinator never awaits I/O itself.
//!
//! # Identity transitions
//!
//! ```text
//! anonymous ──sign in──▶ authenticated: loading, fetch stored cart, replace local
//! authenticated ──sign out──▶ anonymous: clear local cart, no remote call
//! user A ──sign in B──▶ user B: clear local cart, then as for sign in
//! ```
//!
//! A failed or invalid load keeps whatever the local cart holds.
//!
//! Every transition cancels the pending debounce, aborts in-flight writes and
//! invalidates outstanding loads, so no write issued for one user can land
//! after another identity took over.
//!
//! # Write-back
//!
//! While authenticated, a change to a non-empty cart that is not loading
//! (re)starts a [`SYNC_DEBOUNCE`] timer. When it elapses the current lines
//! are captured and sent with `replace_cart`. Overlapping writes are allowed;
//! the last one to complete wins. An explicit clear also sends `clear_cart`
//! immediately and cancels a load still in flight.

mod coordinator;
mod handle;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use shopfront_core::CartState;

use crate::models::SessionUser;
use crate::persistence::Persistence;

pub use handle::CartHandle;

/// Quiet period after the last cart change before the cart is written back.
pub const SYNC_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Capacity of the command queue between handles and the coordinator.
const COMMAND_QUEUE_CAPACITY: usize = 64;

/// Errors returned by [`CartHandle`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The coordinator task has stopped.
    #[error("cart session is closed")]
    Closed,
}

/// Entry point for starting cart sessions.
pub struct CartSession;

impl CartSession {
    /// Spawn a coordinator on the current tokio runtime and return a handle
    /// to it.
    ///
    /// The session follows `identity` for its whole life; the current value
    /// is applied immediately, so a session started for a signed-in user
    /// loads that user's stored cart.
    ///
    /// The coordinator stops on [`CartHandle::shutdown`] or once every handle
    /// has been dropped.
    #[must_use]
    pub fn spawn(
        persistence: Arc<dyn Persistence>,
        identity: watch::Receiver<Option<SessionUser>>,
    ) -> CartHandle {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let (state_tx, state_rx) = watch::channel(CartState::new());

        let coordinator = coordinator::Coordinator::new(persistence, identity, state_tx);
        tokio::spawn(coordinator.run(command_rx));

        CartHandle::new(command_tx, state_rx)
    }
}
