//! Sequential invoice code allocation.

use rusqlite::{params, Connection, OptionalExtension};

use crate::db::{DbError, DbResult};

/// Prefix carried by every invoice code.
pub const INVOICE_PREFIX: &str = "FAC";

/// Allocate the next invoice code for today: `FAC-YYYYMMDD-NNN`.
///
/// Must run on the checkout transaction's connection so the scan sees a
/// stable view; the UNIQUE constraint on `orders.invoice_code` plus the
/// engine's bounded retry cover any writer that slips a code in first.
pub(crate) fn next_invoice_code(conn: &Connection) -> DbResult<String> {
    let date = chrono::Utc::now().format("%Y%m%d").to_string();
    next_invoice_code_for_date(conn, &date)
}

/// Allocate the next code for an explicit date.
///
/// The sequence starts at 1 each day, zero-padded to three digits, and
/// widens past 999 instead of truncating. Codes longer than three digits
/// sort after shorter ones, so the scan orders by suffix length before
/// comparing lexicographically.
pub(crate) fn next_invoice_code_for_date(conn: &Connection, date: &str) -> DbResult<String> {
    let prefix = format!("{}-{}-", INVOICE_PREFIX, date);

    let last: Option<String> = conn
        .query_row(
            r#"
            SELECT invoice_code FROM orders
            WHERE invoice_code LIKE ?1 || '%'
            ORDER BY length(invoice_code) DESC, invoice_code DESC
            LIMIT 1
            "#,
            params![prefix],
            |row| row.get(0),
        )
        .optional()?;

    let next = match last {
        Some(code) => {
            let suffix = &code[prefix.len()..];
            let current: u64 = suffix
                .parse()
                .map_err(|_| DbError::Constraint(format!("Malformed invoice code: {}", code)))?;
            current + 1
        }
        None => 1,
    };

    Ok(format!("{}{:03}", prefix, next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn setup_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.conn()
            .execute(
                "INSERT INTO users (user_id, national_id, first_name, last_name, email, role)
                 VALUES ('u1', '111', 'Test', 'User', 't@example.com', 'client')",
                [],
            )
            .unwrap();
        db
    }

    fn insert_order_with_code(db: &Database, order_id: &str, code: &str) {
        db.conn()
            .execute(
                "INSERT INTO orders (order_id, user_id, total, invoice_code)
                 VALUES (?1, 'u1', '0.00', ?2)",
                params![order_id, code],
            )
            .unwrap();
    }

    #[test]
    fn test_first_code_of_the_day() {
        let db = setup_db();
        let code = next_invoice_code_for_date(db.conn(), "20250120").unwrap();
        assert_eq!(code, "FAC-20250120-001");
    }

    #[test]
    fn test_increments_highest_existing() {
        let db = setup_db();
        insert_order_with_code(&db, "o1", "FAC-20250120-001");
        insert_order_with_code(&db, "o2", "FAC-20250120-002");

        let code = next_invoice_code_for_date(db.conn(), "20250120").unwrap();
        assert_eq!(code, "FAC-20250120-003");
    }

    #[test]
    fn test_dates_have_independent_sequences() {
        let db = setup_db();
        insert_order_with_code(&db, "o1", "FAC-20250119-007");

        let code = next_invoice_code_for_date(db.conn(), "20250120").unwrap();
        assert_eq!(code, "FAC-20250120-001");
    }

    #[test]
    fn test_widens_past_999() {
        let db = setup_db();
        insert_order_with_code(&db, "o1", "FAC-20250120-999");

        let code = next_invoice_code_for_date(db.conn(), "20250120").unwrap();
        assert_eq!(code, "FAC-20250120-1000");
    }

    #[test]
    fn test_scan_prefers_widened_suffix() {
        // After widening, "1000" sorts before "999" lexicographically; the
        // length-first ordering must still find it.
        let db = setup_db();
        insert_order_with_code(&db, "o1", "FAC-20250120-999");
        insert_order_with_code(&db, "o2", "FAC-20250120-1000");

        let code = next_invoice_code_for_date(db.conn(), "20250120").unwrap();
        assert_eq!(code, "FAC-20250120-1001");
    }

    #[test]
    fn test_today_uses_current_date() {
        let db = setup_db();
        let code = next_invoice_code(db.conn()).unwrap();
        let date = chrono::Utc::now().format("%Y%m%d").to_string();
        assert_eq!(code, format!("FAC-{}-001", date));
    }
}
