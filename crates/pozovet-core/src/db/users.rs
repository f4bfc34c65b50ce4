//! User database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{Role, User};

impl Database {
    /// Insert a new user.
    pub fn insert_user(&self, user: &User) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO users (
                user_id, national_id, first_name, last_name, email, phone,
                address, role, created_at, updated_at, created_by, updated_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                user.user_id,
                user.national_id,
                user.first_name,
                user.last_name,
                user.email,
                user.phone,
                user.address,
                user.role.as_str(),
                user.created_at,
                user.updated_at,
                user.created_by,
                user.updated_by,
            ],
        )?;
        Ok(())
    }

    /// Update an existing user.
    pub fn update_user(&self, user: &User) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE users SET
                national_id = ?2,
                first_name = ?3,
                last_name = ?4,
                email = ?5,
                phone = ?6,
                address = ?7,
                role = ?8,
                updated_at = ?9,
                updated_by = ?10
            WHERE user_id = ?1
            "#,
            params![
                user.user_id,
                user.national_id,
                user.first_name,
                user.last_name,
                user.email,
                user.phone,
                user.address,
                user.role.as_str(),
                chrono::Utc::now().to_rfc3339(),
                user.updated_by,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a user by ID.
    pub fn get_user(&self, user_id: &str) -> DbResult<Option<User>> {
        self.conn
            .query_row(
                &format!("{} WHERE user_id = ?", SELECT_USER),
                [user_id],
                map_user_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Get a user by national identity number.
    pub fn get_user_by_national_id(&self, national_id: &str) -> DbResult<Option<User>> {
        self.conn
            .query_row(
                &format!("{} WHERE national_id = ?", SELECT_USER),
                [national_id],
                map_user_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List all users, ordered by last then first name.
    pub fn list_users(&self) -> DbResult<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY last_name, first_name", SELECT_USER))?;
        let rows = stmt.query_map([], map_user_row)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?.try_into()?);
        }
        Ok(users)
    }

    /// Delete a user.
    pub fn delete_user(&self, user_id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM users WHERE user_id = ?", [user_id])?;
        Ok(rows_affected > 0)
    }
}

const SELECT_USER: &str = r#"
    SELECT user_id, national_id, first_name, last_name, email, phone,
           address, role, created_at, updated_at, created_by, updated_by
    FROM users
"#;

/// Intermediate row struct for database mapping.
struct UserRow {
    user_id: String,
    national_id: String,
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
    address: Option<String>,
    role: String,
    created_at: String,
    updated_at: String,
    created_by: Option<String>,
    updated_by: Option<String>,
}

fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        user_id: row.get(0)?,
        national_id: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        address: row.get(6)?,
        role: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
        created_by: row.get(10)?,
        updated_by: row.get(11)?,
    })
}

impl TryFrom<UserRow> for User {
    type Error = DbError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::parse(&row.role)
            .ok_or_else(|| DbError::Constraint(format!("Unknown role: {}", row.role)))?;

        Ok(User {
            user_id: row.user_id,
            national_id: row.national_id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            role,
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

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();

        let mut user = User::new(
            "1712345678".into(),
            "Ana".into(),
            "Pozo".into(),
            "ana@pozovet.ec".into(),
            Role::Admin,
        );
        user.phone = Some("0991234567".into());
        db.insert_user(&user).unwrap();

        let retrieved = db.get_user(&user.user_id).unwrap().unwrap();
        assert_eq!(retrieved.full_name(), "Ana Pozo");
        assert_eq!(retrieved.role, Role::Admin);
        assert_eq!(retrieved.phone, Some("0991234567".into()));
    }

    #[test]
    fn test_get_by_national_id() {
        let db = setup_db();

        let user = User::new(
            "0923456789".into(),
            "Luis".into(),
            "Mora".into(),
            "luis@example.com".into(),
            Role::Client,
        );
        db.insert_user(&user).unwrap();

        let retrieved = db.get_user_by_national_id("0923456789").unwrap().unwrap();
        assert_eq!(retrieved.user_id, user.user_id);
    }

    #[test]
    fn test_duplicate_national_id_rejected() {
        let db = setup_db();

        let first = User::new(
            "111".into(),
            "A".into(),
            "B".into(),
            "a@example.com".into(),
            Role::Client,
        );
        let second = User::new(
            "111".into(),
            "C".into(),
            "D".into(),
            "c@example.com".into(),
            Role::Client,
        );
        db.insert_user(&first).unwrap();
        assert!(db.insert_user(&second).is_err());
    }

    #[test]
    fn test_update_user() {
        let db = setup_db();

        let mut user = User::new(
            "222".into(),
            "Eva".into(),
            "Luna".into(),
            "eva@example.com".into(),
            Role::Client,
        );
        db.insert_user(&user).unwrap();

        user.email = "eva.luna@example.com".into();
        user.role = Role::Receptionist;
        assert!(db.update_user(&user).unwrap());

        let retrieved = db.get_user(&user.user_id).unwrap().unwrap();
        assert_eq!(retrieved.email, "eva.luna@example.com");
        assert_eq!(retrieved.role, Role::Receptionist);
    }

    #[test]
    fn test_list_users_sorted() {
        let db = setup_db();

        for (nid, first, last) in [("1", "Zoe", "Avila"), ("2", "Ana", "Ruiz"), ("3", "Max", "Ruiz")] {
            let user = User::new(
                nid.into(),
                first.into(),
                last.into(),
                format!("{}@example.com", first),
                Role::Client,
            );
            db.insert_user(&user).unwrap();
        }

        let users = db.list_users().unwrap();
        let names: Vec<String> = users.iter().map(|u| u.full_name()).collect();
        assert_eq!(names, vec!["Zoe Avila", "Ana Ruiz", "Max Ruiz"]);
    }

    #[test]
    fn test_delete_user() {
        let db = setup_db();

        let user = User::new(
            "333".into(),
            "Tim".into(),
            "Vega".into(),
            "tim@example.com".into(),
            Role::Client,
        );
        db.insert_user(&user).unwrap();

        assert!(db.delete_user(&user.user_id).unwrap());
        assert!(db.get_user(&user.user_id).unwrap().is_none());
        assert!(!db.delete_user(&user.user_id).unwrap());
    }
}
