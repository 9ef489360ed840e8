//! Shopper-facing handle to a running cart session.

use tokio::sync::{mpsc, oneshot, watch};

use shopfront_core::{CartAction, CartState, Item, ItemId};

use super::SessionError;

/// Requests sent from handles to the coordinator.
#[derive(Debug)]
pub(super) enum Command {
    /// Apply a shopper mutation and reply with the resulting state.
    Mutate {
        action: CartAction,
        reply: oneshot::Sender<CartState>,
    },
    /// Write the current cart now, skipping the debounce.
    SyncNow { reply: oneshot::Sender<CartState> },
    Shutdown,
}

/// Cloneable handle to a cart session.
///
/// Mutating methods resolve once the coordinator has applied the change and
/// return the cart as it stood right after it. They fail only if the session
/// has stopped; persistence failures never reach the caller.
#[derive(Debug, Clone)]
pub struct CartHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<CartState>,
}

impl CartHandle {
    pub(super) const fn new(
        commands: mpsc::Sender<Command>,
        state: watch::Receiver<CartState>,
    ) -> Self {
        Self { commands, state }
    }

    /// Add one unit of `item`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the session has stopped.
    pub async fn add(&self, item: Item) -> Result<CartState, SessionError> {
        self.mutate(CartAction::Add(item)).await
    }

    /// Remove the line for `id`, if present.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the session has stopped.
    pub async fn remove(&self, id: ItemId) -> Result<CartState, SessionError> {
        self.mutate(CartAction::Remove(id)).await
    }

    /// Set the quantity for `id`; zero or below removes the line.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the session has stopped.
    pub async fn set_quantity(&self, id: ItemId, quantity: i64) -> Result<CartState, SessionError> {
        self.mutate(CartAction::SetQuantity { id, quantity }).await
    }

    /// Empty the cart. When signed in, the stored cart is cleared too.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the session has stopped.
    pub async fn clear(&self) -> Result<CartState, SessionError> {
        self.mutate(CartAction::Clear).await
    }

    /// Write the current cart immediately instead of waiting for the debounce.
    /// Does nothing while signed out or while the stored cart is loading.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the session has stopped.
    pub async fn sync_now(&self) -> Result<CartState, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SyncNow { reply }).await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Stop the session. Pending writes are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the session had already stopped.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.send(Command::Shutdown).await
    }

    /// The latest published cart.
    #[must_use]
    pub fn state(&self) -> CartState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every published change, including flag changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.state.clone()
    }

    async fn mutate(&self, action: CartAction) -> Result<CartState, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Mutate { action, reply }).await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    async fn send(&self, command: Command) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)
    }
}
