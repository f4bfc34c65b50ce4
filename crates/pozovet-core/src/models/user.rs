//! User accounts and access roles.

use serde::{Deserialize, Serialize};

/// Access role for a clinic account.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    Admin,
    Receptionist,
    Veterinarian,
    Client,
}

impl Role {
    /// Whether this role may cancel any order or change an order's status.
    pub fn can_manage_orders(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Whether this role may list orders across all purchasers.
    pub fn can_view_all_orders(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Canonical storage name for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Receptionist => "receptionist",
            Role::Veterinarian => "veterinarian",
            Role::Client => "client",
        }
    }

    /// Resolve a role by name, case-insensitively.
    pub fn parse(s: &str) -> Option<Role> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "receptionist" => Some(Role::Receptionist),
            "veterinarian" => Some(Role::Veterinarian),
            "client" => Some(Role::Client),
            _ => None,
        }
    }
}

/// A clinic account: staff member or client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Unique user ID
    pub user_id: String,
    /// National identity number (unique)
    pub national_id: String,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Contact email
    pub email: String,
    /// Contact phone
    pub phone: Option<String>,
    /// Postal address
    pub address: Option<String>,
    /// Access role
    pub role: Role,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
    /// User who created this record
    pub created_by: Option<String>,
    /// User who last updated this record
    pub updated_by: Option<String>,
}

impl User {
    /// Create a new user with required fields.
    pub fn new(
        national_id: String,
        first_name: String,
        last_name: String,
        email: String,
        role: Role,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            user_id: uuid::Uuid::new_v4().to_string(),
            national_id,
            first_name,
            last_name,
            email,
            phone: None,
            address: None,
            role,
            created_at: now.clone(),
            updated_at: now,
            created_by: None,
            updated_by: None,
        }
    }

    /// Display name: "First Last".
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
