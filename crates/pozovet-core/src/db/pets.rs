//! Pet database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::Pet;

impl Database {
    /// Insert a new pet.
    pub fn insert_pet(&self, pet: &Pet) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO pets (
                pet_id, owner_id, name, species, sex, breed, age_years,
                age_months, created_at, updated_at, created_by, updated_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                pet.pet_id,
                pet.owner_id,
                pet.name,
                pet.species,
                pet.sex,
                pet.breed,
                pet.age_years,
                pet.age_months,
                pet.created_at,
                pet.updated_at,
                pet.created_by,
                pet.updated_by,
            ],
        )?;
        Ok(())
    }

    /// Update an existing pet.
    pub fn update_pet(&self, pet: &Pet) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE pets SET
                name = ?2,
                species = ?3,
                sex = ?4,
                breed = ?5,
                age_years = ?6,
                age_months = ?7,
                updated_at = ?8,
                updated_by = ?9
            WHERE pet_id = ?1
            "#,
            params![
                pet.pet_id,
                pet.name,
                pet.species,
                pet.sex,
                pet.breed,
                pet.age_years,
                pet.age_months,
                chrono::Utc::now().to_rfc3339(),
                pet.updated_by,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a pet by ID.
    pub fn get_pet(&self, pet_id: &str) -> DbResult<Option<Pet>> {
        self.conn
            .query_row(
                &format!("{} WHERE pet_id = ?", SELECT_PET),
                [pet_id],
                map_pet_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all pets owned by a user, ordered by name.
    pub fn list_pets_for_owner(&self, owner_id: &str) -> DbResult<Vec<Pet>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} WHERE owner_id = ? ORDER BY name", SELECT_PET))?;
        let rows = stmt.query_map([owner_id], map_pet_row)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Delete a pet.
    pub fn delete_pet(&self, pet_id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM pets WHERE pet_id = ?", [pet_id])?;
        Ok(rows_affected > 0)
    }
}

const SELECT_PET: &str = r#"
    SELECT pet_id, owner_id, name, species, sex, breed, age_years,
           age_months, created_at, updated_at, created_by, updated_by
    FROM pets
"#;

fn map_pet_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Pet> {
    Ok(Pet {
        pet_id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        species: row.get(3)?,
        sex: row.get(4)?,
        breed: row.get(5)?,
        age_years: row.get(6)?,
        age_months: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
        created_by: row.get(10)?,
        updated_by: row.get(11)?,
    })
}
