//! Product catalog database operations.

use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use super::{decimal_from_sql, decimal_to_sql, Database, DbError, DbResult};
use crate::models::Product;

impl Database {
    /// Insert a new product.
    pub fn insert_product(&self, product: &Product) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO products (
                product_id, name, description, category, unit_price, stock,
                created_at, updated_at, created_by, updated_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                product.product_id,
                product.name,
                product.description,
                product.category,
                decimal_to_sql(product.unit_price),
                product.stock,
                product.created_at,
                product.updated_at,
                product.created_by,
                product.updated_by,
            ],
        )?;
        Ok(())
    }

    /// Update an existing product.
    pub fn update_product(&self, product: &Product) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE products SET
                name = ?2,
                description = ?3,
                category = ?4,
                unit_price = ?5,
                stock = ?6,
                updated_at = ?7,
                updated_by = ?8
            WHERE product_id = ?1
            "#,
            params![
                product.product_id,
                product.name,
                product.description,
                product.category,
                decimal_to_sql(product.unit_price),
                product.stock,
                chrono::Utc::now().to_rfc3339(),
                product.updated_by,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a product by ID.
    pub fn get_product(&self, product_id: &str) -> DbResult<Option<Product>> {
        self.conn
            .query_row(
                &format!("{} WHERE product_id = ?", SELECT_PRODUCT),
                [product_id],
                map_product_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List all products, ordered by name.
    pub fn list_products(&self) -> DbResult<Vec<Product>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY name", SELECT_PRODUCT))?;
        let rows = stmt.query_map([], map_product_row)?;

        let mut products = Vec::new();
        for row in rows {
            products.push(row?.try_into()?);
        }
        Ok(products)
    }

    /// Search products by name (prefix match).
    pub fn search_products(&self, query: &str, limit: usize) -> DbResult<Vec<Product>> {
        let pattern = format!("{}%", query);
        let mut stmt = self
            .conn
            .prepare(&format!("{} WHERE name LIKE ? ORDER BY name LIMIT ?", SELECT_PRODUCT))?;
        let rows = stmt.query_map(params![pattern, limit as i64], map_product_row)?;

        let mut products = Vec::new();
        for row in rows {
            products.push(row?.try_into()?);
        }
        Ok(products)
    }

    /// Delete a product. Fails while order lines still reference it.
    pub fn delete_product(&self, product_id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM products WHERE product_id = ?", [product_id])?;
        Ok(rows_affected > 0)
    }
}

/// Load the products for a set of ids. Runs on the caller's connection so
/// the checkout engine can read stock inside its write transaction.
pub(crate) fn products_by_ids(conn: &Connection, ids: &[String]) -> DbResult<Vec<Product>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "{} WHERE product_id IN ({}) ORDER BY name",
        SELECT_PRODUCT, placeholders
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(ids.iter()), map_product_row)?;

    let mut products = Vec::new();
    for row in rows {
        products.push(row?.try_into()?);
    }
    Ok(products)
}

/// Apply a stock delta (negative = debit, positive = credit) on the caller's
/// connection. The schema's non-negative CHECK backstops the engine's own
/// validation.
pub(crate) fn adjust_stock(conn: &Connection, product_id: &str, delta: i64) -> DbResult<()> {
    let rows_affected = conn.execute(
        "UPDATE products SET stock = stock + ?2, updated_at = ?3 WHERE product_id = ?1",
        params![product_id, delta, chrono::Utc::now().to_rfc3339()],
    )?;
    if rows_affected == 0 {
        return Err(DbError::NotFound(format!("product {}", product_id)));
    }
    Ok(())
}

const SELECT_PRODUCT: &str = r#"
    SELECT product_id, name, description, category, unit_price, stock,
           created_at, updated_at, created_by, updated_by
    FROM products
"#;

/// Intermediate row struct for database mapping.
struct ProductRow {
    product_id: String,
    name: String,
    description: Option<String>,
    category: String,
    unit_price: String,
    stock: u32,
    created_at: String,
    updated_at: String,
    created_by: Option<String>,
    updated_by: Option<String>,
}

fn map_product_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProductRow> {
    Ok(ProductRow {
        product_id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        unit_price: row.get(4)?,
        stock: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        created_by: row.get(8)?,
        updated_by: row.get(9)?,
    })
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Product {
            product_id: row.product_id,
            name: row.name,
            description: row.description,
            category: row.category,
            unit_price: decimal_from_sql(&row.unit_price)?,
            stock: row.stock,
            created_at: row.created_at,
            updated_at: row.updated_at,
            created_by: row.created_by,
            updated_by: row.updated_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn make_product(name: &str, cents: i64, stock: u32) -> Product {
        let mut product = Product::new(name.into(), "supplies".into(), Decimal::new(cents, 2));
        product.stock = stock;
        product
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();

        let product = make_product("Flea collar", 1575, 8);
        db.insert_product(&product).unwrap();

        let retrieved = db.get_product(&product.product_id).unwrap().unwrap();
        assert_eq!(retrieved.name, "Flea collar");
        assert_eq!(retrieved.unit_price, Decimal::new(1575, 2));
        assert_eq!(retrieved.stock, 8);
    }

    #[test]
    fn test_update_product() {
        let db = setup_db();

        let mut product = make_product("Kibble 5kg", 2200, 3);
        db.insert_product(&product).unwrap();

        product.unit_price = Decimal::new(2450, 2);
        product.stock = 10;
        assert!(db.update_product(&product).unwrap());

        let retrieved = db.get_product(&product.product_id).unwrap().unwrap();
        assert_eq!(retrieved.unit_price, Decimal::new(2450, 2));
        assert_eq!(retrieved.stock, 10);
    }

    #[test]
    fn test_search_products() {
        let db = setup_db();

        db.insert_product(&make_product("Cat litter", 700, 5)).unwrap();
        db.insert_product(&make_product("Cat toy", 350, 5)).unwrap();
        db.insert_product(&make_product("Dog leash", 1200, 5)).unwrap();

        let results = db.search_products("Cat", 10).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name, "Cat litter");
        assert_eq!(results[1].name, "Cat toy");
    }

    #[test]
    fn test_products_by_ids() {
        let db = setup_db();

        let first = make_product("A", 100, 1);
        let second = make_product("B", 200, 2);
        db.insert_product(&first).unwrap();
        db.insert_product(&second).unwrap();

        let ids = vec![first.product_id.clone(), second.product_id.clone()];
        let products = products_by_ids(db.conn(), &ids).unwrap();
        assert_eq!(products.len(), 2);

        let missing = vec![first.product_id.clone(), "nope".to_string()];
        let products = products_by_ids(db.conn(), &missing).unwrap();
        assert_eq!(products.len(), 1);
    }

    #[test]
    fn test_adjust_stock() {
        let db = setup_db();

        let product = make_product("Wormer", 999, 6);
        db.insert_product(&product).unwrap();

        adjust_stock(db.conn(), &product.product_id, -4).unwrap();
        assert_eq!(db.get_product(&product.product_id).unwrap().unwrap().stock, 2);

        adjust_stock(db.conn(), &product.product_id, 3).unwrap();
        assert_eq!(db.get_product(&product.product_id).unwrap().unwrap().stock, 5);
    }

    #[test]
    fn test_adjust_stock_below_zero_fails() {
        let db = setup_db();

        let product = make_product("Wormer", 999, 2);
        db.insert_product(&product).unwrap();

        assert!(adjust_stock(db.conn(), &product.product_id, -3).is_err());
        assert_eq!(db.get_product(&product.product_id).unwrap().unwrap().stock, 2);
    }

    #[test]
    fn test_adjust_stock_unknown_product() {
        let db = setup_db();
        let result = adjust_stock(db.conn(), "missing", 1);
        assert!(matches!(result, Err(DbError::NotFound(_))));
    }
}
