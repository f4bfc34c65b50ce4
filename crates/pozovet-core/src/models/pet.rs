//! Pet records.

use serde::{Deserialize, Serialize};

/// A pet belonging to a clinic client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pet {
    /// Unique pet ID
    pub pet_id: String,
    /// Owning client's user ID
    pub owner_id: String,
    /// Pet name
    pub name: String,
    /// Species (e.g., "canine", "feline")
    pub species: String,
    /// Sex
    pub sex: String,
    /// Breed
    pub breed: Option<String>,
    /// Age in whole years
    pub age_years: Option<u32>,
    /// Additional months beyond whole years
    pub age_months: u32,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
    /// User who created this record
    pub created_by: Option<String>,
    /// User who last updated this record
    pub updated_by: Option<String>,
}

impl Pet {
    /// Create a new pet with required fields.
    pub fn new(owner_id: String, name: String, species: String, sex: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            pet_id: uuid::Uuid::new_v4().to_string(),
            owner_id,
            name,
            species,
            sex,
            breed: None,
            age_years: None,
            age_months: 0,
            created_at: now.clone(),
            updated_at: now,
            created_by: None,
            updated_by: None,
        }
    }
}
