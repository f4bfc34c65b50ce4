//! Export functionality for invoices.

mod invoice;

pub use invoice::*;
