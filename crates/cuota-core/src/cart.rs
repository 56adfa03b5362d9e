//! # Cart Module
//!
//! Local cart math. The sync layer wraps this with server calls; nothing
//! here knows a server exists.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add_item(item)         same id? qty + 1 : push with qty 1              │
//! │  merge_items(batch)     match by id, then by title+price; sum qty       │
//! │  set_quantity(id, n)    n < 1 rejected, item untouched                  │
//! │  remove_item(id)        returns the removed line                        │
//! │  subtotal()             Σ unit_price × quantity, always from items      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::CartItem;

/// Ordered list of cart lines with unique ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Cart::default()
    }

    /// Builds a cart from server items, folding duplicates together.
    pub fn from_items(items: Vec<CartItem>) -> Self {
        let mut cart = Cart::new();
        cart.merge_items(items);
        cart
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Adds one unit of `item`.
    ///
    /// An existing line with the same id gains exactly one unit, whatever
    /// quantity the incoming item carries. A new line starts at 1.
    pub fn add_item(&mut self, item: CartItem) {
        match self.items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => existing.quantity += 1,
            None => self.items.push(CartItem { quantity: 1, ..item }),
        }
    }

    /// Folds a batch of externally sourced items into the cart.
    ///
    /// ## Matching Order
    /// 1. Same `id`
    /// 2. Same normalized title and unit price
    ///
    /// A match sums quantities; anything else is appended. Incoming
    /// quantities below 1 count as 1.
    pub fn merge_items(&mut self, incoming: Vec<CartItem>) {
        for item in incoming {
            let quantity = item.quantity.max(1);
            let key = item.match_key();

            let position = self
                .items
                .iter()
                .position(|existing| existing.id == item.id)
                .or_else(|| self.items.iter().position(|existing| existing.match_key() == key));

            match position {
                Some(index) => self.items[index].quantity += quantity,
                None => self.items.push(CartItem { quantity, ..item }),
            }
        }
    }

    /// Sets a line's quantity and returns the previous quantity.
    ///
    /// ## Errors
    /// - `OutOfRange` when `quantity < 1` (the line is left untouched)
    /// - `CartItemNotFound` when no line has `id`
    pub fn set_quantity(&mut self, id: &str, quantity: i64) -> CoreResult<i64> {
        if quantity < 1 {
            return Err(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 1,
                max: i64::MAX,
            }
            .into());
        }

        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| CoreError::CartItemNotFound(id.to_string()))?;

        let previous = item.quantity;
        item.quantity = quantity;
        Ok(previous)
    }

    /// Removes a line, returning it if it existed.
    pub fn remove_item(&mut self, id: &str) -> Option<CartItem> {
        let index = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(index))
    }

    /// Σ unit_price × quantity over current lines.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
