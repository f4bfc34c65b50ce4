//! Orders and their line items.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Product;

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderStatus {
    /// Created, stock reserved, awaiting confirmation
    Pending,
    /// Confirmed by staff
    Confirmed,
    /// Delivered/picked up
    Completed,
    /// Cancelled; reserved stock returned
    Cancelled,
}

impl OrderStatus {
    /// Canonical storage name for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Resolve a status by name, case-insensitively.
    ///
    /// Accepts both "cancelled" and "canceled".
    pub fn parse(s: &str) -> Option<OrderStatus> {
        match s.to_lowercase().as_str() {
            "pending" => Some(OrderStatus::Pending),
            "confirmed" => Some(OrderStatus::Confirmed),
            "completed" => Some(OrderStatus::Completed),
            "cancelled" | "canceled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One requested product line in a checkout cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartLine {
    /// Product to purchase
    pub product_id: String,
    /// Requested units, at least 1
    pub quantity: u32,
}

/// A persisted order line with its price snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    /// Unique line ID
    pub item_id: String,
    /// Owning order
    pub order_id: String,
    /// Purchased product
    pub product_id: String,
    /// Product name at purchase time
    pub product_name: String,
    /// Purchased units
    pub quantity: u32,
    /// Unit price at purchase time; later catalog changes do not affect it
    pub unit_price: Decimal,
    /// unit_price × quantity
    pub subtotal: Decimal,
    /// Creation timestamp
    pub created_at: String,
    /// User who created this line
    pub created_by: Option<String>,
}

impl OrderItem {
    /// Build a line for `quantity` units of `product`, snapshotting its
    /// current name and price and computing the subtotal.
    pub fn new(order_id: &str, product: &Product, quantity: u32, created_by: &str) -> Self {
        Self {
            item_id: uuid::Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            product_id: product.product_id.clone(),
            product_name: product.name.clone(),
            quantity,
            unit_price: product.unit_price,
            subtotal: product.unit_price * Decimal::from(quantity),
            created_at: chrono::Utc::now().to_rfc3339(),
            created_by: Some(created_by.to_string()),
        }
    }
}

/// A customer order ("reserva") created by the checkout engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Unique order ID
    pub order_id: String,
    /// Purchasing user
    pub user_id: String,
    /// Creation timestamp; immutable
    pub created_at: String,
    /// Estimated delivery timestamp
    pub estimated_delivery: Option<String>,
    /// Sum of line subtotals at creation time; never recomputed
    pub total: Decimal,
    /// Lifecycle status
    pub status: OrderStatus,
    /// Unique human-readable invoice code
    pub invoice_code: String,
    /// Free-text notes from the customer
    pub notes: Option<String>,
    /// Line items
    pub items: Vec<OrderItem>,
    /// Last update timestamp
    pub updated_at: String,
    /// User who created this record
    pub created_by: Option<String>,
    /// User who last updated this record
    pub updated_by: Option<String>,
}

impl Order {
    /// Create a pending order shell; the checkout engine assigns the invoice
    /// code and line items before persisting.
    pub fn new(user_id: String, total: Decimal, notes: Option<String>, created_by: &str) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            order_id: uuid::Uuid::new_v4().to_string(),
            user_id,
            created_at: now.clone(),
            estimated_delivery: None,
            total,
            status: OrderStatus::Pending,
            invoice_code: String::new(),
            notes,
            items: Vec::new(),
            updated_at: now,
            created_by: Some(created_by.to_string()),
            updated_by: Some(created_by.to_string()),
        }
    }
}
