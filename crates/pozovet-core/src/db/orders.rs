//! Order persistence and the order query surface.

use rusqlite::{params, Connection, OptionalExtension};

use super::{decimal_from_sql, decimal_to_sql, Database, DbError, DbResult};
use crate::models::{Order, OrderItem, OrderStatus};

impl Database {
    /// Get an order with its line items.
    pub fn get_order(&self, order_id: &str) -> DbResult<Option<Order>> {
        load_order(&self.conn, order_id)
    }

    /// List a user's orders, newest first, with line items.
    pub fn list_orders_for_user(&self, user_id: &str) -> DbResult<Vec<Order>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE user_id = ? ORDER BY created_at DESC",
            SELECT_ORDER
        ))?;
        let rows = stmt.query_map([user_id], map_order_row)?;

        let mut orders = Vec::new();
        for row in rows {
            let mut order: Order = row?.try_into()?;
            order.items = load_order_items(&self.conn, &order.order_id)?;
            orders.push(order);
        }
        Ok(orders)
    }

    /// List all orders, newest first, with line items. An optional query
    /// filters by purchaser first/last name, national id or invoice code
    /// (case-insensitive substring).
    pub fn list_orders_admin(&self, query: Option<&str>) -> DbResult<Vec<Order>> {
        let mut orders: Vec<Order> = Vec::new();

        match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => {
                let pattern = format!("%{}%", q);
                let mut stmt = self.conn.prepare(&format!(
                    r#"
                    SELECT {} FROM orders o
                    JOIN users u ON u.user_id = o.user_id
                    WHERE u.first_name LIKE ?1
                       OR u.last_name LIKE ?1
                       OR u.national_id LIKE ?1
                       OR o.invoice_code LIKE ?1
                    ORDER BY o.created_at DESC
                    "#,
                    ORDER_COLUMNS_QUALIFIED
                ))?;
                let rows = stmt.query_map([pattern], map_order_row)?;
                for row in rows {
                    orders.push(row?.try_into()?);
                }
            }
            None => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("{} ORDER BY created_at DESC", SELECT_ORDER))?;
                let rows = stmt.query_map([], map_order_row)?;
                for row in rows {
                    orders.push(row?.try_into()?);
                }
            }
        }

        for order in &mut orders {
            order.items = load_order_items(&self.conn, &order.order_id)?;
        }
        Ok(orders)
    }
}

/// Insert the order row (without its items). Runs on the caller's
/// connection so the checkout engine can persist inside its transaction.
pub(crate) fn insert_order_row(conn: &Connection, order: &Order) -> DbResult<()> {
    conn.execute(
        r#"
        INSERT INTO orders (
            order_id, user_id, created_at, estimated_delivery, total, status,
            invoice_code, notes, updated_at, created_by, updated_by
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
        params![
            order.order_id,
            order.user_id,
            order.created_at,
            order.estimated_delivery,
            decimal_to_sql(order.total),
            order.status.as_str(),
            order.invoice_code,
            order.notes,
            order.updated_at,
            order.created_by,
            order.updated_by,
        ],
    )?;
    Ok(())
}

/// Insert one line item on the caller's connection.
pub(crate) fn insert_order_item(conn: &Connection, item: &OrderItem) -> DbResult<()> {
    conn.execute(
        r#"
        INSERT INTO order_items (
            item_id, order_id, product_id, product_name, quantity,
            unit_price, subtotal, created_at, created_by
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            item.item_id,
            item.order_id,
            item.product_id,
            item.product_name,
            item.quantity,
            decimal_to_sql(item.unit_price),
            decimal_to_sql(item.subtotal),
            item.created_at,
            item.created_by,
        ],
    )?;
    Ok(())
}

/// Load an order with its items on the caller's connection.
pub(crate) fn load_order(conn: &Connection, order_id: &str) -> DbResult<Option<Order>> {
    let row = conn
        .query_row(
            &format!("{} WHERE order_id = ?", SELECT_ORDER),
            [order_id],
            map_order_row,
        )
        .optional()?;

    match row {
        Some(row) => {
            let mut order: Order = row.try_into()?;
            order.items = load_order_items(conn, order_id)?;
            Ok(Some(order))
        }
        None => Ok(None),
    }
}

/// Set an order's status and refresh its audit fields on the caller's
/// connection.
pub(crate) fn update_order_status(
    conn: &Connection,
    order_id: &str,
    status: OrderStatus,
    updated_by: &str,
) -> DbResult<bool> {
    let rows_affected = conn.execute(
        "UPDATE orders SET status = ?2, updated_at = ?3, updated_by = ?4 WHERE order_id = ?1",
        params![
            order_id,
            status.as_str(),
            chrono::Utc::now().to_rfc3339(),
            updated_by,
        ],
    )?;
    Ok(rows_affected > 0)
}

fn load_order_items(conn: &Connection, order_id: &str) -> DbResult<Vec<OrderItem>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT item_id, order_id, product_id, product_name, quantity,
               unit_price, subtotal, created_at, created_by
        FROM order_items
        WHERE order_id = ?
        ORDER BY product_name
        "#,
    )?;

    let rows = stmt.query_map([order_id], |row| {
        Ok(OrderItemRow {
            item_id: row.get(0)?,
            order_id: row.get(1)?,
            product_id: row.get(2)?,
            product_name: row.get(3)?,
            quantity: row.get(4)?,
            unit_price: row.get(5)?,
            subtotal: row.get(6)?,
            created_at: row.get(7)?,
            created_by: row.get(8)?,
        })
    })?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row?.try_into()?);
    }
    Ok(items)
}

const ORDER_COLUMNS_QUALIFIED: &str =
    "o.order_id, o.user_id, o.created_at, o.estimated_delivery, o.total, o.status, \
     o.invoice_code, o.notes, o.updated_at, o.created_by, o.updated_by";

const SELECT_ORDER: &str = "SELECT order_id, user_id, created_at, estimated_delivery, total, status, \
                            invoice_code, notes, updated_at, created_by, updated_by FROM orders";

/// Intermediate row struct for database mapping.
struct OrderRow {
    order_id: String,
    user_id: String,
    created_at: String,
    estimated_delivery: Option<String>,
    total: String,
    status: String,
    invoice_code: String,
    notes: Option<String>,
    updated_at: String,
    created_by: Option<String>,
    updated_by: Option<String>,
}

fn map_order_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<OrderRow> {
    Ok(OrderRow {
        order_id: row.get(0)?,
        user_id: row.get(1)?,
        created_at: row.get(2)?,
        estimated_delivery: row.get(3)?,
        total: row.get(4)?,
        status: row.get(5)?,
        invoice_code: row.get(6)?,
        notes: row.get(7)?,
        updated_at: row.get(8)?,
        created_by: row.get(9)?,
        updated_by: row.get(10)?,
    })
}

impl TryFrom<OrderRow> for Order {
    type Error = DbError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = OrderStatus::parse(&row.status)
            .ok_or_else(|| DbError::Constraint(format!("Unknown order status: {}", row.status)))?;

        Ok(Order {
            order_id: row.order_id,
            user_id: row.user_id,
            created_at: row.created_at,
            estimated_delivery: row.estimated_delivery,
            total: decimal_from_sql(&row.total)?,
            status,
            invoice_code: row.invoice_code,
            notes: row.notes,
            items: Vec::new(),
            updated_at: row.updated_at,
            created_by: row.created_by,
            updated_by: row.updated_by,
        })
    }
}

/// Intermediate row struct for line item mapping.
struct OrderItemRow {
    item_id: String,
    order_id: String,
    product_id: String,
    product_name: String,
    quantity: u32,
    unit_price: String,
    subtotal: String,
    created_at: String,
    created_by: Option<String>,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = DbError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(OrderItem {
            item_id: row.item_id,
            order_id: row.order_id,
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: row.quantity,
            unit_price: decimal_from_sql(&row.unit_price)?,
            subtotal: decimal_from_sql(&row.subtotal)?,
            created_at: row.created_at,
            created_by: row.created_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Product, Role, User};
    use rust_decimal::Decimal;

    fn setup_db() -> (Database, User) {
        let db = Database::open_in_memory().unwrap();
        let user = User::new(
            "1712345678".into(),
            "Ana".into(),
            "Pozo".into(),
            "ana@example.com".into(),
            Role::Client,
        );
        db.insert_user(&user).unwrap();
        (db, user)
    }

    fn persist_order(db: &Database, user: &User, code: &str, cents: i64) -> Order {
        let mut product = Product::new("Kibble".into(), "food".into(), Decimal::new(cents, 2));
        product.stock = 10;
        db.insert_product(&product).unwrap();

        let mut order = Order::new(
            user.user_id.clone(),
            Decimal::new(cents, 2),
            None,
            &user.user_id,
        );
        order.invoice_code = code.to_string();
        insert_order_row(db.conn(), &order).unwrap();

        let item = OrderItem::new(&order.order_id, &product, 1, &user.user_id);
        insert_order_item(db.conn(), &item).unwrap();
        order.items.push(item);
        order
    }

    #[test]
    fn test_insert_and_load_with_items() {
        let (db, user) = setup_db();
        let order = persist_order(&db, &user, "FAC-20250101-001", 1299);

        let loaded = db.get_order(&order.order_id).unwrap().unwrap();
        assert_eq!(loaded.invoice_code, "FAC-20250101-001");
        assert_eq!(loaded.total, Decimal::new(1299, 2));
        assert_eq!(loaded.status, OrderStatus::Pending);
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.items[0].subtotal, Decimal::new(1299, 2));
    }

    #[test]
    fn test_list_for_user_newest_first() {
        let (db, user) = setup_db();
        let first = persist_order(&db, &user, "FAC-20250101-001", 100);
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = persist_order(&db, &user, "FAC-20250101-002", 200);

        let orders = db.list_orders_for_user(&user.user_id).unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].order_id, second.order_id);
        assert_eq!(orders[1].order_id, first.order_id);
    }

    #[test]
    fn test_update_status() {
        let (db, user) = setup_db();
        let order = persist_order(&db, &user, "FAC-20250101-001", 100);

        assert!(update_order_status(db.conn(), &order.order_id, OrderStatus::Confirmed, "admin-1").unwrap());

        let loaded = db.get_order(&order.order_id).unwrap().unwrap();
        assert_eq!(loaded.status, OrderStatus::Confirmed);
        assert_eq!(loaded.updated_by.as_deref(), Some("admin-1"));
    }

    #[test]
    fn test_admin_filter_by_invoice_code() {
        let (db, user) = setup_db();
        persist_order(&db, &user, "FAC-20250101-001", 100);
        persist_order(&db, &user, "FAC-20250102-001", 200);

        let hits = db.list_orders_admin(Some("20250102")).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].invoice_code, "FAC-20250102-001");
    }

    #[test]
    fn test_admin_filter_by_purchaser() {
        let (db, user) = setup_db();
        persist_order(&db, &user, "FAC-20250101-001", 100);

        let other = User::new(
            "0911111111".into(),
            "Luis".into(),
            "Mora".into(),
            "luis@example.com".into(),
            Role::Client,
        );
        db.insert_user(&other).unwrap();
        persist_order(&db, &other, "FAC-20250101-002", 200);

        // Case-insensitive name substring
        let hits = db.list_orders_admin(Some("pozo")).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].user_id, user.user_id);

        // National id substring
        let hits = db.list_orders_admin(Some("091111")).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].user_id, other.user_id);

        // Blank query falls back to the unfiltered listing
        let hits = db.list_orders_admin(Some("   ")).unwrap();
        assert_eq!(hits.len(), 2);
    }
}
