//! # Cart Reconciliation Store
//!
//! Local cart state that stays eventually consistent with the server cart.
//!
//! ## Mutation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  add_item / merge_items ──► local only (persist() or place order)       │
//! │                                                                         │
//! │  set_quantity / remove_item                                             │
//! │     │                                                                   │
//! │     ├─ 1. apply locally, generation += 1   (subtotal updates NOW)       │
//! │     ├─ 2. send to server                                                │
//! │     └─ 3. failure? ──► refresh_cart()      (compensate, never retry)    │
//! │                                                                         │
//! │  refresh_cart ──► fetch ──► generation unchanged? ──► replace items     │
//! │                                  │                                      │
//! │                                  └─ no: a newer edit exists, drop the   │
//! │                                     response and fetch again            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The subtotal is always computed from local items. The total comes from
//! the server and may lag behind an edit until the next refresh.

use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use cuota_core::cart::Cart;
use cuota_core::coerce;
use cuota_core::money::Money;
use cuota_core::types::{CartItem, OrderSummary, SaleId, ServerTotals};
use cuota_ledger::wire::ServerCart;
use cuota_ledger::{LedgerClient, LedgerError};
use serde_json::Value;

use crate::error::{SyncError, SyncResult};

/// How many times a refresh is re-issued when newer local edits keep
/// superseding its response.
const MAX_REFRESH_ATTEMPTS: usize = 3;

// =============================================================================
// State
// =============================================================================

#[derive(Debug, Default)]
struct CartState {
    cart: Cart,
    totals: ServerTotals,
    /// Bumped by every local mutation.
    generation: u64,
    /// Ids the server returned on the last refresh.
    known: HashSet<String>,
    /// Lines added or incremented locally since the last persist.
    dirty: HashSet<String>,
}

impl CartState {
    fn summary(&self) -> OrderSummary {
        OrderSummary::compose(self.cart.subtotal(), &self.totals)
    }

    fn touch(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Takes the server's lines, keeping every local edit not yet sent.
    ///
    /// A dirty line the server knows keeps its local quantity. A dirty line
    /// the server has never seen is carried over. A line that was known
    /// before and is gone from the server now stays gone.
    fn apply_server(&mut self, server: ServerCart) {
        let pending: Vec<CartItem> = self
            .cart
            .items()
            .iter()
            .filter(|item| self.dirty.contains(&item.id))
            .cloned()
            .collect();
        let previously_known = std::mem::take(&mut self.known);

        self.known = server.items.iter().map(|item| item.id.clone()).collect();
        let mut items = server.items;
        let mut dirty = HashSet::new();
        for line in pending {
            match items.iter_mut().find(|item| item.id == line.id) {
                Some(item) => {
                    if item.quantity != line.quantity {
                        item.quantity = line.quantity;
                        dirty.insert(line.id);
                    }
                }
                None if !previously_known.contains(&line.id) => {
                    dirty.insert(line.id.clone());
                    items.push(line);
                }
                None => {}
            }
        }

        self.dirty = dirty;
        self.cart = Cart::from_items(items);
        self.apply_totals(server.totals);
    }

    fn apply_totals(&mut self, totals: ServerTotals) {
        let previous_sale = self.totals.sale_id;
        self.totals = totals;
        if self.totals.sale_id.is_none() {
            self.totals.sale_id = previous_sale;
        }
    }
}

/// Fresh server totals handed straight to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TotalsSnapshot {
    pub sale_id: Option<SaleId>,
    pub total: Option<Money>,
    pub summary: OrderSummary,
}

// =============================================================================
// Cart Store
// =============================================================================

/// Shared cart store. Clones operate on the same cart.
#[derive(Clone)]
pub struct CartStore {
    ledger: Arc<dyn LedgerClient>,
    state: Arc<Mutex<CartState>>,
}

impl CartStore {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        CartStore {
            ledger,
            state: Arc::new(Mutex::new(CartState::default())),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn summary(&self) -> OrderSummary {
        self.state.lock().await.summary()
    }

    pub async fn items(&self) -> Vec<CartItem> {
        self.state.lock().await.cart.items().to_vec()
    }

    /// Σ unit_price × quantity over local items.
    pub async fn subtotal(&self) -> Money {
        self.state.lock().await.cart.subtotal()
    }

    /// Last sale id the server reported for this cart.
    pub async fn known_sale_id(&self) -> Option<SaleId> {
        self.state.lock().await.totals.sale_id
    }

    /// True while some line was added or changed locally and not yet sent.
    pub async fn has_unsent(&self) -> bool {
        !self.state.lock().await.dirty.is_empty()
    }

    // =========================================================================
    // Local Mutations
    // =========================================================================

    /// Adds one unit of `item`. No server call.
    pub async fn add_item(&self, item: CartItem) -> OrderSummary {
        let mut state = self.state.lock().await;
        debug!(item_id = %item.id, "Cart add");
        state.dirty.insert(item.id.clone());
        state.cart.add_item(item);
        state.touch();
        state.summary()
    }

    /// Folds externally sourced items into the cart. No server call.
    pub async fn merge_items(&self, items: Vec<CartItem>) -> OrderSummary {
        let mut state = self.state.lock().await;
        debug!(count = items.len(), "Cart merge");
        let before: HashSet<String> = state.cart.items().iter().map(|i| i.id.clone()).collect();
        let touched: Vec<(String, (String, i64))> = items
            .iter()
            .map(|item| (item.id.clone(), item.match_key()))
            .collect();

        state.cart.merge_items(items);

        // A line matched by title and price keeps its own id.
        for (id, key) in touched {
            let line = state
                .cart
                .items()
                .iter()
                .find(|line| line.id == id)
                .or_else(|| state.cart.items().iter().find(|line| line.match_key() == key))
                .map(|line| line.id.clone());
            if let Some(line) = line {
                state.dirty.insert(line);
            }
        }
        state.touch();

        let added = state.cart.len().saturating_sub(before.len());
        debug!(added, "Cart merge applied");
        state.summary()
    }

    /// Merges raw item payloads (e.g. scraped by a store web view),
    /// coercing prices and quantities on the way in.
    pub async fn merge_raw(&self, payloads: &[Value]) -> OrderSummary {
        let items = payloads.iter().map(coerce::cart_item).collect();
        self.merge_items(items).await
    }

    /// Resets to an empty cart (sign-out). No server call.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        *state = CartState {
            generation: state.generation + 1,
            ..CartState::default()
        };
        info!("Cart state reset");
    }

    // =========================================================================
    // Optimistic Mutations
    // =========================================================================

    /// Sets a line's quantity locally, then on the server.
    ///
    /// `quantity < 1` is a no-op: nothing changes and no request is sent.
    /// A failed server update is compensated by a full refresh; only the
    /// refresh's own failure reaches the caller.
    pub async fn set_quantity(&self, item_id: &str, quantity: i64) -> SyncResult<OrderSummary> {
        if quantity < 1 {
            debug!(item_id, quantity, "Ignoring quantity below 1");
            return Ok(self.summary().await);
        }

        let known = {
            let mut state = self.state.lock().await;
            let previous = state.cart.set_quantity(item_id, quantity)?;
            let generation = state.touch();
            debug!(item_id, previous, quantity, generation, "Cart quantity (local)");
            state.known.contains(item_id)
        };

        // Lines the server has never seen are persisted later.
        if !known {
            self.state.lock().await.dirty.insert(item_id.to_string());
            return Ok(self.summary().await);
        }

        match self.ledger.update_cart_item(item_id, quantity).await {
            Ok(()) => {
                self.state.lock().await.dirty.remove(item_id);
                Ok(self.summary().await)
            }
            Err(e) if e.is_auth() => Err(e.into()),
            Err(e) => {
                warn!(item_id, error = %e, "Quantity update failed, refreshing cart");
                self.refresh_cart().await
            }
        }
    }

    /// Removes a line locally, then on the server.
    pub async fn remove_item(&self, item_id: &str) -> SyncResult<OrderSummary> {
        let known = {
            let mut state = self.state.lock().await;
            if state.cart.remove_item(item_id).is_none() {
                debug!(item_id, "Remove of unknown cart item");
                return Ok(state.summary());
            }
            state.dirty.remove(item_id);
            state.touch();
            state.known.contains(item_id)
        };

        if !known {
            return Ok(self.summary().await);
        }

        match self.ledger.remove_cart_item(item_id).await {
            Ok(()) => {
                self.state.lock().await.known.remove(item_id);
                Ok(self.summary().await)
            }
            Err(e) if e.is_auth() => Err(e.into()),
            Err(e) => {
                warn!(item_id, error = %e, "Remove failed, refreshing cart");
                self.refresh_cart().await
            }
        }
    }

    /// Empties the cart locally and on the server.
    pub async fn clear_cart(&self) -> SyncResult<OrderSummary> {
        {
            let mut state = self.state.lock().await;
            state.cart.clear();
            state.dirty.clear();
            state.touch();
        }

        match self.ledger.clear_cart().await {
            Ok(()) => {
                self.state.lock().await.known.clear();
                Ok(self.summary().await)
            }
            Err(e) if e.is_auth() => Err(e.into()),
            Err(e) => {
                warn!(error = %e, "Clear failed, refreshing cart");
                self.refresh_cart().await
            }
        }
    }

    // =========================================================================
    // Server Synchronization
    // =========================================================================

    /// Sends locally added lines to the server, then refreshes.
    ///
    /// Lines the server already knows are updated to their local quantity;
    /// new lines are added in one batch. Each write clears its lines'
    /// dirty flags as soon as it succeeds, so a retry after a partial
    /// failure never sends them twice. A non-auth failure is compensated by
    /// a refresh and then returned, since the server cart is not what the
    /// user sees.
    pub async fn persist(&self) -> SyncResult<OrderSummary> {
        let (new_items, updates) = {
            let state = self.state.lock().await;
            let mut new_items = Vec::new();
            let mut updates = Vec::new();
            for item in state.cart.items() {
                if !state.dirty.contains(&item.id) {
                    continue;
                }
                if state.known.contains(&item.id) {
                    updates.push((item.id.clone(), item.quantity));
                } else {
                    new_items.push(item.clone());
                }
            }
            (new_items, updates)
        };

        if new_items.is_empty() && updates.is_empty() {
            return self.refresh_cart().await;
        }

        info!(new = new_items.len(), updated = updates.len(), "Persisting cart");
        if !new_items.is_empty() {
            if let Err(e) = self.ledger.add_cart_items(&new_items).await {
                return Err(self.compensate(e).await);
            }
            let mut state = self.state.lock().await;
            // Sent lines come back from the server, possibly under new ids.
            let sent: HashSet<&str> = new_items.iter().map(|item| item.id.as_str()).collect();
            for id in &sent {
                state.dirty.remove(*id);
            }
            let kept: Vec<CartItem> = state
                .cart
                .items()
                .iter()
                .filter(|item| !sent.contains(item.id.as_str()))
                .cloned()
                .collect();
            state.cart = Cart::from_items(kept);
        }

        for (id, quantity) in &updates {
            if let Err(e) = self.ledger.update_cart_item(id, *quantity).await {
                return Err(self.compensate(e).await);
            }
            self.state.lock().await.dirty.remove(id);
        }

        self.refresh_cart().await
    }

    /// Refreshes after a failed persist write and picks the error to report.
    async fn compensate(&self, error: LedgerError) -> SyncError {
        if error.is_auth() {
            return error.into();
        }
        warn!(error = %error, "Cart persist failed, refreshing cart");
        match self.refresh_cart().await {
            Err(refresh) if refresh.is_auth() => refresh,
            _ => error.into(),
        }
    }

    /// Replaces local items and totals with the server's.
    ///
    /// A response that arrives after a newer local edit is discarded and the
    /// fetch is re-issued, up to three times. After that the local state is
    /// kept as is.
    pub async fn refresh_cart(&self) -> SyncResult<OrderSummary> {
        for attempt in 1..=MAX_REFRESH_ATTEMPTS {
            let issued_at = self.state.lock().await.generation;
            let server = self.ledger.fetch_cart().await?;

            let mut state = self.state.lock().await;
            if state.generation == issued_at {
                info!(items = server.items.len(), "Cart refreshed from server");
                state.apply_server(server);
                return Ok(state.summary());
            }
            debug!(attempt, issued_at, current = state.generation, "Discarding stale cart response");
        }

        warn!("Cart refresh kept losing to local edits, keeping local state");
        Ok(self.summary().await)
    }

    /// Re-fetches only the summary and returns it directly.
    ///
    /// The returned snapshot is always the fresh answer. The stored totals
    /// are only updated when no newer local edit happened meanwhile. A
    /// missing sale id falls back to the last known one.
    pub async fn refresh_cart_totals(&self) -> SyncResult<TotalsSnapshot> {
        let issued_at = self.state.lock().await.generation;
        let server = self.ledger.fetch_cart_totals().await?;

        let mut state = self.state.lock().await;
        let sale_id = server.totals.sale_id.or(state.totals.sale_id);
        let total = server.totals.total;

        if state.generation == issued_at {
            state.apply_totals(server.totals);
            debug!(sale_id = ?sale_id, "Cart totals refreshed");
            return Ok(TotalsSnapshot {
                sale_id,
                total,
                summary: state.summary(),
            });
        }

        debug!("Cart totals superseded by a local edit, not stored");
        let mut summary = OrderSummary::compose(state.cart.subtotal(), &server.totals);
        summary.sale_id = sale_id;
        Ok(TotalsSnapshot {
            sale_id,
            total,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockLedger;
    use cuota_ledger::LedgerError;
    use serde_json::json;
    use std::time::Duration;

    fn widget() -> CartItem {
        CartItem::new("A", "Widget", Money::from_cents(1999))
    }

    fn store_with(mock: &Arc<MockLedger>) -> CartStore {
        CartStore::new(mock.clone())
    }

    async fn seeded(mock: &Arc<MockLedger>, items: Vec<CartItem>) -> CartStore {
        mock.set_cart(items, ServerTotals::default());
        let store = store_with(mock);
        store.refresh_cart().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_subtotal_tracks_every_local_mutation() {
        let mock = Arc::new(MockLedger::new());
        let store = seeded(
            &mock,
            vec![
                widget().with_quantity(2),
                CartItem::new("B", "Gadget", Money::from_cents(500)),
            ],
        )
        .await;

        let expected = |items: &[CartItem]| items.iter().map(CartItem::line_total).sum::<Money>();

        store.add_item(widget()).await;
        assert_eq!(store.subtotal().await, expected(&store.items().await));

        mock.delay_next("update_cart_item", Duration::from_millis(50));
        let pending = {
            let store = store.clone();
            tokio::spawn(async move { store.set_quantity("B", 4).await })
        };
        tokio::task::yield_now().await;
        // Local edit is visible before the server answers
        assert_eq!(store.subtotal().await, Money::from_cents(1999 * 3 + 500 * 4));
        pending.await.unwrap().unwrap();

        store.remove_item("A").await.unwrap();
        assert_eq!(store.subtotal().await, Money::from_cents(2000));
        assert_eq!(store.subtotal().await, expected(&store.items().await));
    }

    #[tokio::test]
    async fn test_quantity_below_one_is_a_no_op() {
        let mock = Arc::new(MockLedger::new());
        let store = seeded(&mock, vec![widget().with_quantity(2)]).await;
        let before = mock.total_calls();

        store.set_quantity("A", 0).await.unwrap();
        store.set_quantity("A", -1).await.unwrap();

        assert_eq!(store.items().await[0].quantity, 2);
        assert_eq!(mock.total_calls(), before);
    }

    #[tokio::test]
    async fn test_failed_update_refreshes_from_server() {
        let mock = Arc::new(MockLedger::new());
        let store = seeded(&mock, vec![widget().with_quantity(2)]).await;

        mock.fail("update_cart_item", LedgerError::Network("reset".into()));
        let summary = store.set_quantity("A", 5).await.unwrap();

        // Server still says 2
        assert_eq!(store.items().await[0].quantity, 2);
        assert_eq!(summary.subtotal_local, Money::from_cents(3998));
        assert_eq!(mock.call_count("fetch_cart"), 2);
    }

    #[tokio::test]
    async fn test_failed_remove_restores_line() {
        let mock = Arc::new(MockLedger::new());
        let store = seeded(&mock, vec![widget()]).await;

        mock.fail("remove_cart_item", LedgerError::Timeout);
        store.remove_item("A").await.unwrap();
        assert_eq!(store.items().await.len(), 1);
    }

    #[tokio::test]
    async fn test_auth_failure_propagates() {
        let mock = Arc::new(MockLedger::new());
        let store = seeded(&mock, vec![widget()]).await;

        mock.fail("update_cart_item", LedgerError::Auth("expired".into()));
        let err = store.set_quantity("A", 3).await.unwrap_err();
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn test_merge_twice_does_not_duplicate() {
        let mock = Arc::new(MockLedger::new());
        let store = seeded(&mock, vec![widget().with_quantity(2)]).await;

        let incoming = vec![
            CartItem::new("A", "Widget", Money::from_cents(1999)).with_quantity(3),
            CartItem::new("tmp-9", "  gadget ", Money::from_cents(500)),
        ];
        store.merge_items(incoming.clone()).await;
        store.merge_items(incoming).await;

        let items = store.items().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].quantity, 8);
        assert_eq!(items[1].quantity, 2);
        assert_eq!(mock.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_merge_raw_coerces_fields() {
        let mock = Arc::new(MockLedger::new());
        let store = store_with(&mock);

        store
            .merge_raw(&[
                json!({ "id": "X", "title": "Lamp", "price": "abc", "quantity": "many" }),
                json!({ "title": "Mug", "price": "4.50", "quantity": 2 }),
            ])
            .await;

        let items = store.items().await;
        assert_eq!(items[0].unit_price, Money::zero());
        assert_eq!(items[0].quantity, 1);
        assert!(items[1].id.starts_with(cuota_core::TEMP_ID_PREFIX));
        assert_eq!(store.subtotal().await, Money::from_cents(900));
    }

    #[tokio::test]
    async fn test_totals_scenario() {
        let mock = Arc::new(MockLedger::new());
        let store = seeded(&mock, vec![widget().with_quantity(2)]).await;

        store.add_item(widget()).await;
        assert_eq!(store.items().await[0].quantity, 3);
        assert_eq!(store.subtotal().await, Money::from_cents(5997));

        mock.set_totals(ServerTotals {
            total: Some(Money::from_cents(6547)),
            sale_id: Some(12),
            ..ServerTotals::default()
        });
        let snapshot = store.refresh_cart_totals().await.unwrap();

        assert_eq!(snapshot.total, Some(Money::from_cents(6547)));
        assert_eq!(snapshot.sale_id, Some(12));

        let summary = store.summary().await;
        assert_eq!(summary.total(), Money::from_cents(6547));
        assert_eq!(summary.subtotal_local, Money::from_cents(5997));
    }

    #[tokio::test]
    async fn test_totals_keep_known_sale_id() {
        let mock = Arc::new(MockLedger::new());
        let store = store_with(&mock);

        mock.set_totals(ServerTotals {
            sale_id: Some(7),
            ..ServerTotals::default()
        });
        store.refresh_cart_totals().await.unwrap();

        mock.set_totals(ServerTotals::default());
        let snapshot = store.refresh_cart_totals().await.unwrap();
        assert_eq!(snapshot.sale_id, Some(7));
    }

    #[tokio::test]
    async fn test_stale_refresh_is_discarded() {
        let mock = Arc::new(MockLedger::new());
        let store = seeded(&mock, vec![widget()]).await;

        // First re-fetch is slow; a local edit lands while it is in flight
        mock.delay_next("fetch_cart", Duration::from_millis(50));
        let refresh = {
            let store = store.clone();
            tokio::spawn(async move { store.refresh_cart().await })
        };
        tokio::task::yield_now().await;
        store
            .add_item(CartItem::new("tmp-1", "Lamp", Money::from_cents(100)))
            .await;

        refresh.await.unwrap().unwrap();
        // Second fetch was issued after the edit and applied
        assert_eq!(mock.call_count("fetch_cart"), 3);
        // The unsent local line survives the refresh
        let items = store.items().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].id, "tmp-1");
    }

    #[tokio::test]
    async fn test_persist_sends_new_lines_then_refreshes() {
        let mock = Arc::new(MockLedger::new());
        let store = seeded(&mock, vec![widget()]).await;

        store.add_item(widget()).await;
        store
            .add_item(CartItem::new("tmp-1", "Lamp", Money::from_cents(100)))
            .await;
        store.persist().await.unwrap();

        assert_eq!(mock.call_count("add_cart_items"), 1);
        assert_eq!(mock.call_count("update_cart_item"), 1);
        let items = store.items().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_refresh_keeps_unsent_increment_of_known_line() {
        let mock = Arc::new(MockLedger::new());
        let store = seeded(
            &mock,
            vec![
                widget().with_quantity(2),
                CartItem::new("B", "Gadget", Money::from_cents(500)),
            ],
        )
        .await;

        store.add_item(widget()).await;
        mock.fail("update_cart_item", LedgerError::Network("reset".into()));
        store.set_quantity("B", 3).await.unwrap();

        // The compensating refresh keeps the local A and reverts B
        let items = store.items().await;
        let a = items.iter().find(|i| i.id == "A").unwrap();
        let b = items.iter().find(|i| i.id == "B").unwrap();
        assert_eq!(a.quantity, 3);
        assert_eq!(b.quantity, 1);

        mock.clear_failure("update_cart_item");
        store.persist().await.unwrap();
        assert_eq!(mock.call_count("update_cart_item"), 2);
        let a = store.items().await.into_iter().find(|i| i.id == "A").unwrap();
        assert_eq!(a.quantity, 3);
    }

    #[tokio::test]
    async fn test_partial_persist_failure_never_resends_added_lines() {
        let mock = Arc::new(MockLedger::new());
        let store = seeded(&mock, vec![widget()]).await;

        store.add_item(widget()).await;
        store
            .add_item(CartItem::new("tmp-1", "Lamp", Money::from_cents(100)))
            .await;

        mock.fail("update_cart_item", LedgerError::Network("reset".into()));
        let err = store.persist().await.unwrap_err();
        assert!(err.is_retryable());
        // Compensated by a refresh: the lamp now comes from the server
        assert_eq!(mock.call_count("fetch_cart"), 2);

        mock.clear_failure("update_cart_item");
        store.persist().await.unwrap();

        assert_eq!(mock.call_count("add_cart_items"), 1);
        let items = store.items().await;
        let lamps: i64 = items
            .iter()
            .filter(|i| i.title == "Lamp")
            .map(|i| i.quantity)
            .sum();
        assert_eq!(lamps, 1);
        assert_eq!(items.iter().find(|i| i.id == "A").unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn test_reset_empties_everything() {
        let mock = Arc::new(MockLedger::new());
        mock.set_cart(
            vec![widget()],
            ServerTotals {
                sale_id: Some(3),
                ..ServerTotals::default()
            },
        );
        let store = store_with(&mock);
        store.refresh_cart().await.unwrap();

        store.reset().await;
        assert!(store.items().await.is_empty());
        assert_eq!(store.known_sale_id().await, None);
    }
}
