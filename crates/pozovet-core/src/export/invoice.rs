//! Invoice export for orders.
//!
//! Produces the read model a document renderer consumes: header, one row
//! per line item and a grand total. JSON and CSV shapes are provided; page
//! layout belongs to the rendering collaborator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Order, User};

/// Invoice for a single order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceExport {
    /// Invoice metadata
    pub metadata: InvoiceMetadata,
    /// One row per order line
    pub lines: Vec<InvoiceLine>,
    /// Grand total, recomputed from the lines
    pub total: Decimal,
}

/// Invoice header fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceMetadata {
    /// Invoice code (e.g., "FAC-20250120-001")
    pub invoice_code: String,
    /// Order creation timestamp
    pub issued_at: String,
    /// Purchaser display name
    pub customer_name: String,
    /// Purchaser national identity number
    pub customer_national_id: String,
    /// Customer notes carried on the order
    pub notes: Option<String>,
    /// Export timestamp
    pub exported_at: String,
}

/// Single invoice row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceLine {
    /// Product name as snapshotted on the order line
    pub product_name: String,
    /// Purchased units
    pub quantity: u32,
    /// Unit price snapshot
    pub unit_price: Decimal,
    /// unit_price × quantity
    pub subtotal: Decimal,
}

impl InvoiceExport {
    /// Build the invoice for an order and its purchaser.
    pub fn from_order(order: &Order, customer: &User) -> Self {
        let lines: Vec<InvoiceLine> = order
            .items
            .iter()
            .map(|item| InvoiceLine {
                product_name: item.product_name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                subtotal: item.subtotal,
            })
            .collect();

        let total = lines.iter().map(|line| line.subtotal).sum();

        Self {
            metadata: InvoiceMetadata {
                invoice_code: order.invoice_code.clone(),
                issued_at: order.created_at.clone(),
                customer_name: customer.full_name(),
                customer_national_id: customer.national_id.clone(),
                notes: order.notes.clone(),
                exported_at: chrono::Utc::now().to_rfc3339(),
            },
            lines,
            total,
        }
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        // Header
        csv.push_str("invoice_code,issued_at,customer,national_id,product,quantity,unit_price,subtotal\n");

        // Lines
        for line in &self.lines {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{}\n",
                escape_csv(&self.metadata.invoice_code),
                escape_csv(&self.metadata.issued_at),
                escape_csv(&self.metadata.customer_name),
                escape_csv(&self.metadata.customer_national_id),
                escape_csv(&line.product_name),
                line.quantity,
                line.unit_price,
                line.subtotal,
            ));
        }

        csv
    }
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
