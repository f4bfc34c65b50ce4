//! Store catalog products.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product sold by the clinic store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    /// Unique product ID
    pub product_id: String,
    /// Product name
    pub name: String,
    /// Longer description
    pub description: Option<String>,
    /// Category (e.g., "food", "medicine", "accessories")
    pub category: String,
    /// Unit price, 2 decimal places
    pub unit_price: Decimal,
    /// Units currently in stock; never negative
    pub stock: u32,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
    /// User who created this record
    pub created_by: Option<String>,
    /// User who last updated this record
    pub updated_by: Option<String>,
}

impl Product {
    /// Create a new product with required fields and zero stock.
    pub fn new(name: String, category: String, unit_price: Decimal) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            product_id: uuid::Uuid::new_v4().to_string(),
            name,
            description: None,
            category,
            unit_price,
            stock: 0,
            created_at: now.clone(),
            updated_at: now,
            created_by: None,
            updated_by: None,
        }
    }

    /// Whether the product can currently be purchased.
    pub fn available(&self) -> bool {
        self.stock > 0
    }
}
