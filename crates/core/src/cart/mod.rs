//! Cart state machine.
//!
//! [`CartState`] is a reducer: every change goes through [`CartState::apply`]
//! with a [`CartAction`], and the derived total is recomputed from the lines
//! after each change. Transitions are synchronous and never fail; a change
//! that would overflow the total is refused and reported as no change.
//!
//! Invariants held after every action:
//! - `total == Σ(unit price × quantity)` over all lines
//! - every line has a quantity of at least one (enforced by [`NonZeroU32`])
//! - no two lines share an item ID
//!
//! The cart knows nothing about users or persistence; the storefront sync
//! coordinator decides when a change needs to be written back.

mod stored;

use std::num::NonZeroU32;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{ItemId, Price};

pub use stored::{CartValidationError, StoredCartLine};

/// A catalog item as placed in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub price: Price,
    pub image: String,
    pub description: String,
    pub category: String,
}

/// An item paired with a quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(flatten)]
    pub item: Item,
    pub quantity: NonZeroU32,
}

impl CartLine {
    /// Create a line holding `quantity` units of `item`.
    #[must_use]
    pub const fn new(item: Item, quantity: NonZeroU32) -> Self {
        Self { item, quantity }
    }

    /// Unit price × quantity, or `None` if it exceeds the decimal range.
    ///
    /// Always `Some` for lines held by a [`CartState`].
    #[must_use]
    pub fn subtotal(&self) -> Option<Decimal> {
        self.item.price.checked_times(self.quantity.get())
    }
}

/// A discrete change to the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    /// Add one unit of an item, appending a line if it is not in the cart.
    Add(Item),
    /// Remove the line for an item. Absent items are ignored.
    Remove(ItemId),
    /// Set the quantity of an existing line. Zero or below removes the line.
    SetQuantity { id: ItemId, quantity: i64 },
    /// Remove every line.
    Clear,
    /// Replace all lines with a stored cart.
    ReplaceAll(Vec<CartLine>),
    SetLoading(bool),
    SetSyncing(bool),
}

impl CartAction {
    /// Whether the action is one a shopper performs directly, as opposed to
    /// bookkeeping done by the sync coordinator.
    #[must_use]
    pub const fn is_local_mutation(&self) -> bool {
        matches!(
            self,
            Self::Add(_) | Self::Remove(_) | Self::SetQuantity { .. } | Self::Clear
        )
    }
}

/// Cart contents plus sync status flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    lines: Vec<CartLine>,
    total: Decimal,
    loading: bool,
    syncing: bool,
}

impl CartState {
    /// An empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an action.
    ///
    /// Returns `true` if the set of lines (and therefore possibly the total)
    /// changed. Flag setters and no-op removals return `false`. A change whose
    /// total would exceed the decimal range is refused: the cart is left as it
    /// was and `false` is returned.
    pub fn apply(&mut self, action: CartAction) -> bool {
        let previous = match action {
            CartAction::SetLoading(loading) => {
                self.loading = loading;
                return false;
            }
            CartAction::SetSyncing(syncing) => {
                self.syncing = syncing;
                return false;
            }
            _ => self.lines.clone(),
        };

        if !self.reduce(action) {
            return false;
        }
        match checked_total(&self.lines) {
            Some(total) => {
                self.total = total;
                true
            }
            None => {
                self.lines = previous;
                false
            }
        }
    }

    fn reduce(&mut self, action: CartAction) -> bool {
        match action {
            CartAction::Add(item) => {
                if let Some(line) = self.line_mut(&item.id) {
                    line.quantity = line.quantity.saturating_add(1);
                } else {
                    self.lines.push(CartLine::new(item, NonZeroU32::MIN));
                }
                true
            }
            CartAction::Remove(id) => self.remove_line(&id),
            CartAction::SetQuantity { id, quantity } => {
                match u32::try_from(quantity).ok().and_then(NonZeroU32::new) {
                    Some(quantity) => self.line_mut(&id).is_some_and(|line| {
                        let changed = line.quantity != quantity;
                        line.quantity = quantity;
                        changed
                    }),
                    // Quantities above u32::MAX are clamped rather than treated as removal.
                    None if quantity > 0 => self.line_mut(&id).is_some_and(|line| {
                        let changed = line.quantity != NonZeroU32::MAX;
                        line.quantity = NonZeroU32::MAX;
                        changed
                    }),
                    None => self.remove_line(&id),
                }
            }
            CartAction::Clear => {
                let changed = !self.lines.is_empty();
                self.lines.clear();
                changed
            }
            CartAction::ReplaceAll(lines) => {
                let merged = merge_duplicates(lines);
                let changed = merged != self.lines;
                self.lines = merged;
                changed
            }
            CartAction::SetLoading(_) | CartAction::SetSyncing(_) => false,
        }
    }

    /// Add one unit of `item`.
    pub fn add(&mut self, item: Item) -> bool {
        self.apply(CartAction::Add(item))
    }

    /// Remove the line for `id`, if present.
    pub fn remove(&mut self, id: &ItemId) -> bool {
        self.apply(CartAction::Remove(id.clone()))
    }

    /// Set the quantity for `id`; `quantity <= 0` removes the line.
    pub fn set_quantity(&mut self, id: &ItemId, quantity: i64) -> bool {
        self.apply(CartAction::SetQuantity {
            id: id.clone(),
            quantity,
        })
    }

    /// Remove every line.
    pub fn clear(&mut self) -> bool {
        self.apply(CartAction::Clear)
    }

    /// Install `lines` in place of the current contents.
    pub fn replace_all(&mut self, lines: Vec<CartLine>) -> bool {
        self.apply(CartAction::ReplaceAll(lines))
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.apply(CartAction::SetLoading(loading));
    }

    pub fn set_syncing(&mut self, syncing: bool) {
        self.apply(CartAction::SetSyncing(syncing));
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// The line for `id`, if present.
    #[must_use]
    pub fn line(&self, id: &ItemId) -> Option<&CartLine> {
        self.lines.iter().find(|line| &line.item.id == id)
    }

    /// Sum of unit price × quantity over all lines.
    #[must_use]
    pub const fn total(&self) -> Decimal {
        self.total
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines
            .iter()
            .map(|line| u64::from(line.quantity.get()))
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether the initial fetch of a stored cart is outstanding.
    #[must_use]
    pub const fn loading(&self) -> bool {
        self.loading
    }

    /// Whether an outbound write is in flight.
    #[must_use]
    pub const fn syncing(&self) -> bool {
        self.syncing
    }

    fn line_mut(&mut self, id: &ItemId) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|line| &line.item.id == id)
    }

    fn remove_line(&mut self, id: &ItemId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| &line.item.id != id);
        self.lines.len() != before
    }

}

/// Σ(unit price × quantity), or `None` if it exceeds the decimal range.
fn checked_total(lines: &[CartLine]) -> Option<Decimal> {
    lines
        .iter()
        .try_fold(Decimal::ZERO, |total, line| total.checked_add(line.subtotal()?))
}

/// Collapse lines sharing an item ID into the first occurrence, summing
/// quantities.
fn merge_duplicates(lines: Vec<CartLine>) -> Vec<CartLine> {
    let mut merged: Vec<CartLine> = Vec::with_capacity(lines.len());
    for line in lines {
        if let Some(existing) = merged.iter_mut().find(|l| l.item.id == line.item.id) {
            existing.quantity = existing.quantity.saturating_add(line.quantity.get());
        } else {
            merged.push(line);
        }
    }
    merged
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn item(id: &str, cents: i64) -> Item {
        Item {
            id: ItemId::from(id),
            name: format!("Item {id}"),
            price: Price::from_cents(cents).unwrap(),
            image: format!("/images/{id}.jpg"),
            description: String::new(),
            category: "misc".to_string(),
        }
    }

    fn qty(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    fn assert_invariants(cart: &CartState) {
        let expected: Decimal = cart
            .lines()
            .iter()
            .map(|line| line.subtotal().unwrap())
            .sum();
        assert_eq!(cart.total(), expected);
        let ids: HashSet<_> = cart.lines().iter().map(|l| l.item.id.clone()).collect();
        assert_eq!(ids.len(), cart.lines().len(), "duplicate item ids");
    }

    #[test]
    fn test_add_same_item_twice_increments() {
        let mut cart = CartState::new();
        cart.add(item("a", 1000));
        cart.add(item("a", 1000));

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity.get(), 2);
        assert_eq!(cart.total(), Decimal::new(2000, 2));
    }

    #[test]
    fn test_add_keeps_insertion_order() {
        let mut cart = CartState::new();
        cart.add(item("b", 100));
        cart.add(item("a", 100));
        cart.add(item("b", 100));

        let ids: Vec<_> = cart.lines().iter().map(|l| l.item.id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = CartState::new();
        cart.add(item("a", 100));
        assert!(!cart.remove(&ItemId::from("zzz")));
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut with_zero = CartState::new();
        with_zero.add(item("a", 250));
        with_zero.add(item("b", 100));
        let mut with_remove = with_zero.clone();

        with_zero.set_quantity(&ItemId::from("a"), 0);
        with_remove.remove(&ItemId::from("a"));

        assert_eq!(with_zero, with_remove);
        assert!(with_zero.line(&ItemId::from("a")).is_none());
    }

    #[test]
    fn test_set_quantity_negative_removes() {
        let mut cart = CartState::new();
        cart.add(item("a", 250));
        assert!(cart.set_quantity(&ItemId::from("a"), -4));
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Decimal::ZERO);
    }

    #[test]
    fn test_set_quantity_absent_is_noop() {
        let mut cart = CartState::new();
        assert!(!cart.set_quantity(&ItemId::from("a"), 3));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_updates_total() {
        let mut cart = CartState::new();
        cart.add(item("a", 250));
        cart.set_quantity(&ItemId::from("a"), 4);
        assert_eq!(cart.total(), Decimal::new(1000, 2));
        assert_eq!(cart.item_count(), 4);
    }

    #[test]
    fn test_clear() {
        let mut cart = CartState::new();
        cart.add(item("a", 250));
        cart.add(item("b", 300));
        cart.clear();
        assert!(cart.lines().is_empty());
        assert_eq!(cart.total(), Decimal::ZERO);
    }

    #[test]
    fn test_replace_all_installs_lines_verbatim() {
        let mut cart = CartState::new();
        cart.add(item("a", 10000));

        let changed = cart.replace_all(vec![CartLine::new(item("b", 5000), qty(2))]);

        assert!(changed);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].item.id.as_str(), "b");
        assert_eq!(cart.total(), Decimal::from(100));
    }

    #[test]
    fn test_replace_all_merges_duplicates() {
        let mut cart = CartState::new();
        cart.replace_all(vec![
            CartLine::new(item("a", 100), qty(1)),
            CartLine::new(item("b", 100), qty(1)),
            CartLine::new(item("a", 100), qty(2)),
        ]);
        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.line(&ItemId::from("a")).unwrap().quantity.get(), 3);
        assert_invariants(&cart);
    }

    #[test]
    fn test_flags_do_not_touch_lines() {
        let mut cart = CartState::new();
        cart.add(item("a", 100));
        let before = cart.clone();

        cart.set_loading(true);
        cart.set_syncing(true);

        assert!(cart.loading());
        assert!(cart.syncing());
        assert_eq!(cart.lines(), before.lines());
        assert_eq!(cart.total(), before.total());
    }

    #[test]
    fn test_invariants_hold_across_operation_sequences() {
        let ids = ["a", "b", "c", "d"];
        let mut cart = CartState::new();
        // Small linear congruential sequence so the walk is deterministic.
        let mut seed: u64 = 0x2545_f491;
        for _ in 0..500 {
            seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            let id = ids[usize::try_from(seed >> 62).unwrap()];
            let quantity = i64::try_from((seed >> 40) % 7).unwrap() - 2;
            match (seed >> 33) % 3 {
                0 => {
                    cart.add(item(id, 199));
                }
                1 => {
                    cart.remove(&ItemId::from(id));
                }
                _ => {
                    cart.set_quantity(&ItemId::from(id), quantity);
                }
            }
            assert_invariants(&cart);
        }
    }

    fn priced(id: &str, amount: Decimal) -> Item {
        Item {
            price: Price::new(amount).unwrap(),
            ..item(id, 0)
        }
    }

    #[test]
    fn test_quantity_change_that_overflows_total_is_refused() {
        let big = priced("big", Decimal::from_i128_with_scale(10_i128.pow(21), 0));
        let mut cart = CartState::new();
        assert!(cart.add(big.clone()));

        assert!(!cart.set_quantity(&big.id, 4_000_000_000));

        assert_eq!(cart.line(&big.id).unwrap().quantity.get(), 1);
        assert_eq!(cart.total(), big.price.amount());
        assert_invariants(&cart);

        // The cart still accepts ordinary changes afterwards.
        assert!(cart.set_quantity(&big.id, 3));
        assert_invariants(&cart);
    }

    #[test]
    fn test_add_that_overflows_total_is_refused() {
        let mut cart = CartState::new();
        assert!(cart.add(priced("max", Decimal::MAX)));

        assert!(!cart.add(priced("max", Decimal::MAX)));
        assert!(!cart.add(priced("one", Decimal::ONE)));

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.total(), Decimal::MAX);
        assert_invariants(&cart);
    }

    #[test]
    fn test_replace_all_that_overflows_total_keeps_cart() {
        let mut cart = CartState::new();
        cart.add(item("a", 500));
        let before = cart.clone();

        let replaced = cart.replace_all(vec![
            CartLine::new(priced("x", Decimal::MAX), qty(1)),
            CartLine::new(priced("y", Decimal::MAX), qty(1)),
        ]);

        assert!(!replaced);
        assert_eq!(cart, before);
    }

    #[test]
    fn test_local_mutation_classification() {
        assert!(CartAction::Clear.is_local_mutation());
        assert!(!CartAction::ReplaceAll(Vec::new()).is_local_mutation());
        assert!(!CartAction::SetSyncing(true).is_local_mutation());
    }
}
