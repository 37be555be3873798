use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::ValidationErrors;

#[derive(Debug, Deserialize, Serialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub name_en: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Listado con el número de artículos de cada categoría
#[derive(Debug, Serialize, FromRow)]
pub struct CategoryWithCount {
    pub id: i64,
    pub name: String,
    pub name_en: String,
    pub post_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct CategorySchema {
    pub name: String,
    pub name_en: Option<String>,
}

impl CategorySchema {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let name_len = self.name.trim().chars().count();
        if name_len == 0 || name_len > 50 {
            errors.add("name", "El nombre debe tener entre 1 y 50 caracteres");
        }
        if let Some(name_en) = &self.name_en {
            let valid = !name_en.is_empty()
                && name_en.len() <= 50
                && name_en
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
            if !valid {
                errors.add("name_en", "Solo minúsculas, dígitos y guiones (máx. 50)");
            }
        }
        errors.into_result()
    }
}
