//! The coordinator task that owns a session's cart.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use shopfront_core::{CartAction, CartLine, CartState, StoredCartLine, UserKey};

use super::SYNC_DEBOUNCE;
use super::handle::Command;
use crate::models::SessionUser;
use crate::persistence::{Persistence, SyncError};

/// Completions reported by tasks the coordinator spawned.
///
/// Writes carry the identity epoch they were started in; results from an
/// earlier epoch belong to a previous user and are dropped. Loads carry their
/// own id and only the current load is accepted.
#[derive(Debug)]
enum Event {
    DebounceElapsed {
        ticket: u64,
    },
    CartLoaded {
        load: u64,
        result: Result<Vec<StoredCartLine>, SyncError>,
    },
    WriteFinished {
        epoch: u64,
        write: u64,
        result: Result<(), SyncError>,
    },
}

/// A scheduled write waiting out the debounce window.
struct PendingWrite {
    ticket: u64,
    timer: JoinHandle<()>,
}

/// An outstanding fetch of the stored cart.
struct PendingLoad {
    id: u64,
    task: JoinHandle<()>,
}

pub(super) struct Coordinator {
    cart: CartState,
    user: Option<SessionUser>,
    persistence: Arc<dyn Persistence>,
    identity: watch::Receiver<Option<SessionUser>>,
    identity_open: bool,
    state_tx: watch::Sender<CartState>,
    events_tx: mpsc::UnboundedSender<Event>,
    events_rx: mpsc::UnboundedReceiver<Event>,
    epoch: u64,
    next_ticket: u64,
    pending: Option<PendingWrite>,
    next_write: u64,
    writes: HashMap<u64, JoinHandle<()>>,
    next_load: u64,
    load: Option<PendingLoad>,
}

impl Coordinator {
    pub(super) fn new(
        persistence: Arc<dyn Persistence>,
        identity: watch::Receiver<Option<SessionUser>>,
        state_tx: watch::Sender<CartState>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            cart: CartState::new(),
            user: None,
            persistence,
            identity,
            identity_open: true,
            state_tx,
            events_tx,
            events_rx,
            epoch: 0,
            next_ticket: 0,
            pending: None,
            next_write: 0,
            writes: HashMap::new(),
            next_load: 0,
            load: None,
        }
    }

    pub(super) async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let initial = self.identity.borrow_and_update().clone();
        self.on_identity(initial);

        loop {
            tokio::select! {
                biased;

                changed = self.identity.changed(), if self.identity_open => {
                    if changed.is_err() {
                        debug!("identity provider dropped; keeping current user");
                        self.identity_open = false;
                        continue;
                    }
                    let user = self.identity.borrow_and_update().clone();
                    self.on_identity(user);
                }

                Some(event) = self.events_rx.recv() => self.on_event(event),

                command = commands.recv() => match command {
                    Some(Command::Mutate { action, reply }) => self.on_mutate(action, reply),
                    Some(Command::SyncNow { reply }) => self.on_sync_now(reply),
                    Some(Command::Shutdown) | None => break,
                },
            }
        }

        self.cancel_pending();
        self.abort_writes();
        self.abort_load();
        debug!("cart session stopped");
    }

    fn on_identity(&mut self, user: Option<SessionUser>) {
        let previous = self.user_key();
        let next = user.as_ref().map(|u| u.key.clone());
        if previous == next {
            // Same user (or still anonymous); only profile details changed.
            self.user = user;
            return;
        }

        self.epoch += 1;
        self.cancel_pending();
        self.abort_writes();
        self.abort_load();
        self.user = user;

        match next {
            None => {
                info!("signed out; clearing local cart");
                self.cart.clear();
                self.cart.set_loading(false);
            }
            Some(key) => {
                if previous.is_some() {
                    // Switching accounts: never show one user's cart to another.
                    self.cart.clear();
                }
                info!(user = %key, "signed in; loading stored cart");
                self.start_load(key);
            }
        }
        self.publish();
    }

    fn on_event(&mut self, event: Event) {
        match event {
            Event::DebounceElapsed { ticket } => {
                if self.pending.as_ref().is_some_and(|p| p.ticket == ticket) {
                    self.pending = None;
                    self.start_write();
                } else {
                    debug!(ticket, "ignoring superseded debounce timer");
                }
            }
            Event::CartLoaded { load, result } => {
                if !self.load.as_ref().is_some_and(|l| l.id == load) {
                    debug!(load, "discarding result of a cancelled cart load");
                    return;
                }
                self.load = None;
                self.finish_load(result);
            }
            Event::WriteFinished {
                epoch,
                write,
                result,
            } => {
                self.writes.remove(&write);
                if epoch != self.epoch {
                    return;
                }
                match result {
                    Ok(()) => debug!(write, "cart synced"),
                    Err(e) => warn!(write, error = %e, "failed to sync cart; keeping local cart"),
                }
                self.cart.set_syncing(!self.writes.is_empty());
                self.publish();
            }
        }
    }

    fn on_mutate(&mut self, action: CartAction, reply: oneshot::Sender<CartState>) {
        let explicit_clear = matches!(action, CartAction::Clear);
        let changed = self.cart.apply(action);

        if explicit_clear {
            self.cancel_pending();
            if self.cart.loading() {
                // A stored cart fetched before the clear must not bring items back.
                self.abort_load();
                self.cart.set_loading(false);
            }
            if let Some(key) = self.user_key() {
                self.spawn_clear(key);
            }
        } else if changed {
            self.cancel_pending();
            self.schedule_write();
        }

        self.publish();
        let _ = reply.send(self.cart.clone());
    }

    fn on_sync_now(&mut self, reply: oneshot::Sender<CartState>) {
        if self.user.is_some() && !self.cart.loading() {
            self.cancel_pending();
            self.start_write();
        }
        let _ = reply.send(self.cart.clone());
    }

    fn start_load(&mut self, key: UserKey) {
        self.cart.set_loading(true);

        self.next_load += 1;
        let id = self.next_load;
        let persistence = Arc::clone(&self.persistence);
        let events = self.events_tx.clone();
        let task = tokio::spawn(async move {
            let result = persistence.fetch_cart(&key).await;
            let _ = events.send(Event::CartLoaded { load: id, result });
        });
        self.load = Some(PendingLoad { id, task });
    }

    fn finish_load(&mut self, result: Result<Vec<StoredCartLine>, SyncError>) {
        let lines = result.and_then(|stored| {
            stored
                .into_iter()
                .map(CartLine::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map_err(SyncError::from)
        });

        match lines {
            Ok(lines) => {
                debug!(lines = lines.len(), "replacing local cart with stored cart");
                // Loaded lines mirror the server, so no write-back is scheduled.
                self.cart.replace_all(lines);
            }
            Err(e) => warn!(error = %e, "failed to load stored cart; keeping local cart"),
        }
        self.cart.set_loading(false);
        self.publish();
    }

    fn schedule_write(&mut self) {
        if self.user.is_none() || self.cart.is_empty() || self.cart.loading() {
            return;
        }

        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let events = self.events_tx.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(SYNC_DEBOUNCE).await;
            let _ = events.send(Event::DebounceElapsed { ticket });
        });
        self.pending = Some(PendingWrite { ticket, timer });
    }

    fn start_write(&mut self) {
        let Some(key) = self.user_key() else {
            return;
        };
        let lines: Vec<StoredCartLine> = self.cart.lines().iter().map(StoredCartLine::from).collect();

        self.next_write += 1;
        let write = self.next_write;
        let epoch = self.epoch;
        let persistence = Arc::clone(&self.persistence);
        let events = self.events_tx.clone();
        debug!(write, lines = lines.len(), "writing cart");

        let task = tokio::spawn(async move {
            let result = persistence.replace_cart(&key, &lines).await;
            let _ = events.send(Event::WriteFinished {
                epoch,
                write,
                result,
            });
        });
        self.writes.insert(write, task);
        self.cart.set_syncing(true);
        self.publish();
    }

    fn spawn_clear(&self, key: UserKey) {
        let persistence = Arc::clone(&self.persistence);
        tokio::spawn(async move {
            match persistence.clear_cart(&key).await {
                Ok(()) => debug!(user = %key, "stored cart cleared"),
                Err(e) => warn!(user = %key, error = %e, "failed to clear stored cart"),
            }
        });
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.timer.abort();
        }
    }

    fn abort_writes(&mut self) {
        for (_, task) in self.writes.drain() {
            task.abort();
        }
        self.cart.set_syncing(false);
    }

    fn abort_load(&mut self) {
        if let Some(load) = self.load.take() {
            load.task.abort();
        }
    }

    fn user_key(&self) -> Option<UserKey> {
        self.user.as_ref().map(|u| u.key.clone())
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.cart.clone());
    }
}
