//! Local cart state with durable persistence.
//!
//! The cart is the engine's source of truth for what the user intends to
//! order; the remote cart is only reconciled at submit time. Every
//! mutation recomputes the total and persists synchronously, so a process
//! restart restores the exact cart the user last saw.
//!
//! Persistence failures are deliberately non-fatal: the in-memory cart
//! keeps working and the failure is logged, mirroring how a durable
//! key-value slot behaves in the embedding shell.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use piatto_core::ProductId;
use thiserror::Error;
use tracing::warn;

use crate::types::{Cart, CartItem};

const CART_STORAGE_KEY: &str = "piatto_cart";

/// Errors from the persistence backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Poisoned storage lock")]
    Poisoned,
}

/// Durable string-keyed slot the cart serializes itself into.
///
/// Payloads are opaque strings so the backend stays format-agnostic; the
/// cart owns the JSON encoding.
pub trait CartStorage: Send + Sync {
    /// Read the stored payload, `None` when nothing was saved.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the backend cannot be read.
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write the payload, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the backend cannot be written.
    fn save(&self, key: &str, payload: &str) -> Result<(), StorageError>;

    /// Delete the stored payload, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// File-backed storage: one file per key under a base directory.
#[derive(Debug)]
pub struct FileStorage {
    base_dir: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{key}.json"))
    }
}

impl CartStorage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, payload: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::write(self.path_for(key), payload)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory storage for tests and hosts without durable slots.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: Mutex<std::collections::HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CartStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let slots = self.slots.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(slots.get(key).cloned())
    }

    fn save(&self, key: &str, payload: &str) -> Result<(), StorageError> {
        let mut slots = self.slots.lock().map_err(|_| StorageError::Poisoned)?;
        slots.insert(key.to_string(), payload.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut slots = self.slots.lock().map_err(|_| StorageError::Poisoned)?;
        slots.remove(key);
        Ok(())
    }
}

/// The cart plus its persistence backend.
///
/// All mutating operations persist synchronously before returning, and
/// none of them fail: a broken backend degrades to in-memory operation
/// with a warning.
pub struct CartStore {
    storage: Arc<dyn CartStorage>,
    cart: Cart,
}

impl CartStore {
    /// Start from whatever the backend has saved.
    ///
    /// A missing, unreadable, or corrupt payload yields an empty cart;
    /// loading never fails.
    #[must_use]
    pub fn load(storage: Arc<dyn CartStorage>) -> Self {
        let cart = match storage.load(CART_STORAGE_KEY) {
            Ok(Some(payload)) => match serde_json::from_str::<Cart>(&payload) {
                Ok(mut cart) => {
                    // Stored totals are untrusted; rederive from the lines.
                    cart.recompute_total();
                    cart
                }
                Err(e) => {
                    warn!(error = %e, "Discarding corrupt cart payload");
                    Cart::empty()
                }
            },
            Ok(None) => Cart::empty(),
            Err(e) => {
                warn!(error = %e, "Cart storage unreadable, starting empty");
                Cart::empty()
            }
        };
        Self { storage, cart }
    }

    /// The current cart contents.
    #[must_use]
    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Owned copy of the current cart, safe to hand across await points.
    #[must_use]
    pub fn snapshot(&self) -> Cart {
        self.cart.clone()
    }

    /// Add `quantity` units of an item, merging with an existing line for
    /// the same product. A zero quantity is a no-op.
    pub fn add_item(&mut self, item: CartItem) {
        if item.quantity == 0 {
            return;
        }
        if let Some(line) = self
            .cart
            .items
            .iter_mut()
            .find(|line| line.product_id == item.product_id)
        {
            line.quantity += item.quantity;
        } else {
            self.cart.items.push(item);
        }
        self.commit();
    }

    /// Set the quantity of a product's line; zero removes the line.
    /// Unknown products are ignored.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) {
        if quantity == 0 {
            self.remove_item(product_id);
            return;
        }
        if let Some(line) = self
            .cart
            .items
            .iter_mut()
            .find(|line| line.product_id == product_id)
        {
            line.quantity = quantity;
            self.commit();
        }
    }

    /// Remove a product's line entirely.
    pub fn remove_item(&mut self, product_id: ProductId) {
        let before = self.cart.items.len();
        self.cart.items.retain(|line| line.product_id != product_id);
        if self.cart.items.len() != before {
            self.commit();
        }
    }

    /// Empty the cart and persist the empty state (used after a
    /// successful order so a restart does not resurrect purchased items).
    pub fn clear(&mut self) {
        self.cart = Cart::empty();
        self.commit();
    }

    fn commit(&mut self) {
        self.cart.recompute_total();
        match serde_json::to_string(&self.cart) {
            Ok(payload) => {
                if let Err(e) = self.storage.save(CART_STORAGE_KEY, &payload) {
                    warn!(error = %e, "Cart persistence failed, continuing in memory");
                }
            }
            Err(e) => warn!(error = %e, "Cart serialization failed"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn item(id: i64, price: i64, quantity: u32) -> CartItem {
        CartItem {
            product_id: ProductId::new(id),
            name: format!("Item {id}"),
            unit_price: Decimal::from(price),
            quantity,
            image_ref: String::new(),
        }
    }

    #[test]
    fn test_add_merges_same_product() {
        let mut store = CartStore::load(Arc::new(MemoryStorage::new()));
        store.add_item(item(1, 500, 1));
        store.add_item(item(1, 500, 2));

        assert_eq!(store.cart().items.len(), 1);
        assert_eq!(store.cart().items[0].quantity, 3);
        assert_eq!(store.cart().total_amount, Decimal::from(1500));
    }

    #[test]
    fn test_zero_quantity_add_is_noop() {
        let mut store = CartStore::load(Arc::new(MemoryStorage::new()));
        store.add_item(item(1, 500, 0));
        assert!(store.cart().is_empty());
    }

    #[test]
    fn test_set_quantity_zero_removes_line() {
        let mut store = CartStore::load(Arc::new(MemoryStorage::new()));
        store.add_item(item(1, 500, 2));
        store.set_quantity(ProductId::new(1), 0);

        assert!(store.cart().is_empty());
        assert_eq!(store.cart().total_amount, Decimal::ZERO);
    }

    #[test]
    fn test_reload_restores_cart() {
        let storage = Arc::new(MemoryStorage::new());
        {
            let mut store = CartStore::load(Arc::clone(&storage) as Arc<dyn CartStorage>);
            store.add_item(item(1, 500, 2));
            store.add_item(item(2, 120, 1));
        }

        let reloaded = CartStore::load(storage);
        assert_eq!(reloaded.cart().items.len(), 2);
        assert_eq!(reloaded.cart().total_amount, Decimal::from(1120));

        let snapshot = reloaded.snapshot();
        assert_eq!(snapshot.items, reloaded.cart().items);
        assert_eq!(snapshot.total_amount, reloaded.cart().total_amount);
    }

    #[test]
    fn test_corrupt_payload_starts_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.save(CART_STORAGE_KEY, "{not json").unwrap();

        let store = CartStore::load(storage);
        assert!(store.cart().is_empty());
    }

    #[test]
    fn test_clear_persists_empty_state() {
        let storage = Arc::new(MemoryStorage::new());
        let mut store = CartStore::load(Arc::clone(&storage) as Arc<dyn CartStorage>);
        store.add_item(item(1, 500, 1));
        store.clear();

        let reloaded = CartStore::load(storage);
        assert!(reloaded.cart().is_empty());
    }

    #[test]
    fn test_file_storage_roundtrip() {
        let dir = std::env::temp_dir().join(format!("piatto-cart-{}", uuid::Uuid::new_v4()));
        let storage = FileStorage::new(&dir);

        assert!(storage.load("cart").unwrap().is_none());
        storage.save("cart", "{\"items\":[]}").unwrap();
        assert_eq!(
            storage.load("cart").unwrap().as_deref(),
            Some("{\"items\":[]}")
        );
        storage.remove("cart").unwrap();
        assert!(storage.load("cart").unwrap().is_none());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
