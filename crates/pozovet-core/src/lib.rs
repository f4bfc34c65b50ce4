//! PozoVet Core Library
//!
//! Store/checkout subsystem of the PozoVet veterinary-clinic backend:
//! product catalog with live stock, transactional order creation with
//! per-line price snapshots and sequential invoice codes, compensating
//! cancellation, order queries, invoice export and an append-only user
//! history trail.
//!
//! # Architecture
//!
//! ```text
//!                 cart (product, quantity)*
//!                           │
//!               ┌───────────▼────────────┐
//!               │     Checkout Engine    │  one immediate transaction:
//!               │  validate → price →    │  lock, check stock, snapshot
//!               │  invoice code → debit  │  prices, debit, commit
//!               └───────────┬────────────┘
//!                           │
//!            ┌──────────────┼──────────────┐
//!            ▼              ▼              ▼
//!       Order Queries   Invoice Export   User History
//!                                        (best effort)
//! ```
//!
//! # Core Principle
//!
//! **Stock is only read and mutated under the write lock.** Order creation
//! and cancellation are all-or-nothing; an order that fails validation
//! leaves no rows and no stock change behind.
//!
//! # Modules
//!
//! - [`db`]: SQLite database layer (users, pets, products, orders, history)
//! - [`models`]: Domain types (User, Pet, Product, Order, HistoryEntry)
//! - [`checkout`]: Transactional checkout engine and invoice codes
//! - [`export`]: Invoice read model with JSON/CSV output

pub mod checkout;
pub mod db;
pub mod export;
pub mod models;

// Re-export commonly used types
pub use checkout::{CheckoutEngine, CheckoutError, CheckoutResult, StatusTarget, INVOICE_PREFIX};
pub use db::{Database, DbError, DbResult};
pub use export::{InvoiceExport, InvoiceLine, InvoiceMetadata};
pub use models::{
    CartLine, HistoryEntry, Order, OrderItem, OrderStatus, Pet, Product, Role, User,
};

use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

// =========================================================================
// Facade Error Type
// =========================================================================

/// Errors surfaced by the [`PozovetCore`] facade.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("internal lock poisoned")]
    Poisoned,
}

impl<T> From<PoisonError<T>> for CoreError {
    fn from(_: PoisonError<T>) -> Self {
        CoreError::Poisoned
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe service wrapper exposing the store's operation surface to
/// the request layer.
pub struct PozovetCore {
    db: Arc<Mutex<Database>>,
}

impl PozovetCore {
    /// Open or create a database at the given path.
    pub fn open(path: &str) -> CoreResult<Self> {
        let db = Database::open(path)?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    /// Create an in-memory instance (for testing).
    pub fn open_in_memory() -> CoreResult<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    // =========================================================================
    // User Operations
    // =========================================================================

    /// Create a new user.
    pub fn create_user(&self, user: &User) -> CoreResult<()> {
        let db = self.db.lock()?;
        db.insert_user(user)?;
        Ok(())
    }

    /// Get a user by ID.
    pub fn get_user(&self, user_id: &str) -> CoreResult<Option<User>> {
        let db = self.db.lock()?;
        Ok(db.get_user(user_id)?)
    }

    /// List all users.
    pub fn list_users(&self) -> CoreResult<Vec<User>> {
        let db = self.db.lock()?;
        Ok(db.list_users()?)
    }

    /// Update a user.
    pub fn update_user(&self, user: &User) -> CoreResult<bool> {
        let db = self.db.lock()?;
        Ok(db.update_user(user)?)
    }

    /// Delete a user.
    pub fn delete_user(&self, user_id: &str) -> CoreResult<bool> {
        let db = self.db.lock()?;
        Ok(db.delete_user(user_id)?)
    }

    // =========================================================================
    // Pet Operations
    // =========================================================================

    /// Register a pet.
    pub fn create_pet(&self, pet: &Pet) -> CoreResult<()> {
        let db = self.db.lock()?;
        db.insert_pet(pet)?;
        Ok(())
    }

    /// Get a pet by ID.
    pub fn get_pet(&self, pet_id: &str) -> CoreResult<Option<Pet>> {
        let db = self.db.lock()?;
        Ok(db.get_pet(pet_id)?)
    }

    /// List a client's pets.
    pub fn list_pets_for_owner(&self, owner_id: &str) -> CoreResult<Vec<Pet>> {
        let db = self.db.lock()?;
        Ok(db.list_pets_for_owner(owner_id)?)
    }

    /// Update a pet.
    pub fn update_pet(&self, pet: &Pet) -> CoreResult<bool> {
        let db = self.db.lock()?;
        Ok(db.update_pet(pet)?)
    }

    /// Delete a pet.
    pub fn delete_pet(&self, pet_id: &str) -> CoreResult<bool> {
        let db = self.db.lock()?;
        Ok(db.delete_pet(pet_id)?)
    }

    // =========================================================================
    // Catalog Operations
    // =========================================================================

    /// Add a product to the catalog.
    pub fn create_product(&self, product: &Product) -> CoreResult<()> {
        let db = self.db.lock()?;
        db.insert_product(product)?;
        Ok(())
    }

    /// Get a product by ID.
    pub fn get_product(&self, product_id: &str) -> CoreResult<Option<Product>> {
        let db = self.db.lock()?;
        Ok(db.get_product(product_id)?)
    }

    /// List the whole catalog.
    pub fn list_products(&self) -> CoreResult<Vec<Product>> {
        let db = self.db.lock()?;
        Ok(db.list_products()?)
    }

    /// Search products by name prefix.
    pub fn search_products(&self, query: &str, limit: usize) -> CoreResult<Vec<Product>> {
        let db = self.db.lock()?;
        Ok(db.search_products(query, limit)?)
    }

    /// Update a product.
    pub fn update_product(&self, product: &Product) -> CoreResult<bool> {
        let db = self.db.lock()?;
        Ok(db.update_product(product)?)
    }

    /// Delete a product. Fails while order lines still reference it.
    pub fn delete_product(&self, product_id: &str) -> CoreResult<bool> {
        let db = self.db.lock()?;
        Ok(db.delete_product(product_id)?)
    }

    // =========================================================================
    // Checkout Operations
    // =========================================================================

    /// Create an order from a cart on behalf of `user_id`.
    pub fn create_order(
        &self,
        user_id: &str,
        items: &[CartLine],
        notes: Option<&str>,
    ) -> CoreResult<Order> {
        let mut db = self.db.lock()?;
        let user = db
            .get_user(user_id)?
            .ok_or_else(|| CheckoutError::UserNotFound(user_id.to_string()))?;

        let order = CheckoutEngine::new(&mut db).create_order_from_cart(&user, items, notes)?;

        self.record_history(
            &db,
            HistoryEntry::new(
                user.user_id.clone(),
                Some(user.user_id.clone()),
                "order_created".into(),
                format!("order {} created (total {})", order.invoice_code, order.total),
            ),
        );
        Ok(order)
    }

    /// Cancel a pending order as `actor_id` (owner or order manager).
    pub fn cancel_order(&self, actor_id: &str, order_id: &str) -> CoreResult<Order> {
        let mut db = self.db.lock()?;
        let actor = db
            .get_user(actor_id)?
            .ok_or_else(|| CheckoutError::UserNotFound(actor_id.to_string()))?;

        let order = CheckoutEngine::new(&mut db).cancel_order(&actor, order_id)?;

        self.record_history(
            &db,
            HistoryEntry::new(
                order.user_id.clone(),
                Some(actor.user_id.clone()),
                "order_cancelled".into(),
                format!("order {} cancelled", order.invoice_code),
            ),
        );
        Ok(order)
    }

    /// Change an order's status as `actor_id` (order managers only).
    pub fn set_order_status(
        &self,
        actor_id: &str,
        order_id: &str,
        target: StatusTarget,
    ) -> CoreResult<Order> {
        let mut db = self.db.lock()?;
        let actor = db
            .get_user(actor_id)?
            .ok_or_else(|| CheckoutError::UserNotFound(actor_id.to_string()))?;

        let order = CheckoutEngine::new(&mut db).set_order_status(&actor, order_id, target)?;

        self.record_history(
            &db,
            HistoryEntry::new(
                order.user_id.clone(),
                Some(actor.user_id.clone()),
                "order_status_changed".into(),
                format!("order {} status set to {}", order.invoice_code, order.status),
            ),
        );
        Ok(order)
    }

    // =========================================================================
    // Order Queries
    // =========================================================================

    /// List a user's own orders, newest first.
    pub fn list_orders_for_user(&self, user_id: &str) -> CoreResult<Vec<Order>> {
        let db = self.db.lock()?;
        Ok(db.list_orders_for_user(user_id)?)
    }

    /// List all orders, optionally filtered by purchaser name/national id
    /// or invoice code. Restricted to roles that view all orders.
    pub fn list_orders_admin(&self, actor_id: &str, query: Option<&str>) -> CoreResult<Vec<Order>> {
        let db = self.db.lock()?;
        let actor = db
            .get_user(actor_id)?
            .ok_or_else(|| CheckoutError::UserNotFound(actor_id.to_string()))?;
        if !actor.role.can_view_all_orders() {
            return Err(CheckoutError::NotAuthorized.into());
        }
        Ok(db.list_orders_admin(query)?)
    }

    /// Get an order by ID.
    pub fn get_order(&self, order_id: &str) -> CoreResult<Option<Order>> {
        let db = self.db.lock()?;
        Ok(db.get_order(order_id)?)
    }

    /// Build the invoice read model for an order. Allowed for the order's
    /// owner and for roles that view all orders.
    pub fn invoice_for_order(&self, actor_id: &str, order_id: &str) -> CoreResult<InvoiceExport> {
        let db = self.db.lock()?;
        let actor = db
            .get_user(actor_id)?
            .ok_or_else(|| CheckoutError::UserNotFound(actor_id.to_string()))?;
        let order = db
            .get_order(order_id)?
            .ok_or_else(|| CheckoutError::OrderNotFound(order_id.to_string()))?;

        if order.user_id != actor.user_id && !actor.role.can_view_all_orders() {
            return Err(CheckoutError::NotAuthorized.into());
        }

        let customer = db
            .get_user(&order.user_id)?
            .ok_or_else(|| CheckoutError::UserNotFound(order.user_id.clone()))?;
        Ok(InvoiceExport::from_order(&order, &customer))
    }

    // =========================================================================
    // History
    // =========================================================================

    /// List a user's history entries, newest first.
    pub fn history_for_user(&self, subject_id: &str) -> CoreResult<Vec<HistoryEntry>> {
        let db = self.db.lock()?;
        Ok(db.list_history_for_user(subject_id)?)
    }

    /// Best-effort history append: runs after the business transaction has
    /// committed, and a failure here never undoes it.
    fn record_history(&self, db: &Database, entry: HistoryEntry) {
        if let Err(err) = db.append_history(&entry) {
            warn!(kind = %entry.kind, error = %err, "history append failed");
        }
    }
}
