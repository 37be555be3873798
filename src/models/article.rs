use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::{DateTime, Utc};

use super::{comment::CommentThread, ValidationErrors};

// 1. Estructura que representa una fila completa en la Base de Datos
#[derive(Debug, Clone, Deserialize, Serialize, FromRow)]
pub struct Article {
    pub id: i64,
    pub author_id: i64,
    pub category_id: i64,
    pub title: String,
    pub price: i32, // unidad mínima de la moneda (yenes, céntimos...)
    pub content: String,
    pub thumbnail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub like_num: i32,
}

pub const ARTICLE_COLUMNS: &str =
    "id, author_id, category_id, title, price, content, thumbnail, created_at, updated_at, like_num";

pub const DEFAULT_PRICE: i32 = 100;

// 2. Estructura para recibir los datos del Frontend (JSON) al crear un artículo
#[derive(Debug, Deserialize)]
pub struct CreateArticleSchema {
    pub title: String,
    pub content: String,
    pub category_id: i64,
    pub thumbnail: Option<String>,
    pub price: Option<i32>,
}

impl CreateArticleSchema {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        check_title(&mut errors, &self.title);
        if self.content.trim().is_empty() {
            errors.add("content", "El contenido es obligatorio");
        }
        if let Some(price) = self.price {
            check_price(&mut errors, price);
        }
        errors.into_result()
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateArticleSchema {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<i64>,
    pub thumbnail: Option<String>,
    pub price: Option<i32>,
}

impl UpdateArticleSchema {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if let Some(title) = &self.title {
            check_title(&mut errors, title);
        }
        if let Some(content) = &self.content {
            if content.trim().is_empty() {
                errors.add("content", "El contenido es obligatorio");
            }
        }
        if let Some(price) = self.price {
            check_price(&mut errors, price);
        }
        errors.into_result()
    }
}

fn check_title(errors: &mut ValidationErrors, title: &str) {
    let len = title.trim().chars().count();
    if len == 0 || len > 100 {
        errors.add("title", "El título debe tener entre 1 y 100 caracteres");
    }
}

fn check_price(errors: &mut ValidationErrors, price: i32) {
    if price < 0 {
        errors.add("price", "El precio no puede ser negativo");
    }
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub freeword: Option<String>,
}

pub const FREEWORD_MAX_LEN: usize = 30;

impl SearchQuery {
    // None => búsqueda vacía (sin resultados), igual que un formulario sin texto
    pub fn term(&self) -> Result<Option<String>, ValidationErrors> {
        let term = self.freeword.as_deref().map(str::trim).unwrap_or("");
        if term.is_empty() {
            return Ok(None);
        }
        if term.chars().count() > FREEWORD_MAX_LEN {
            let mut errors = ValidationErrors::default();
            errors.add("freeword", "Máximo 30 caracteres");
            return Err(errors);
        }
        Ok(Some(term.to_string()))
    }
}

// Vista de detalle: lo que la página del artículo necesita
#[derive(Debug, Serialize)]
pub struct ArticleDetail {
    #[serde(flatten)]
    pub article: Article,
    pub like_count: i64,
    pub category_posts: Vec<Article>,
    pub comments: Vec<CommentThread>,
    pub publishable_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_rejects_long_title_and_negative_price() {
        let body = CreateArticleSchema {
            title: "x".repeat(101),
            content: "hola".into(),
            category_id: 1,
            thumbnail: None,
            price: Some(-1),
        };
        let err = body.validate().unwrap_err();
        assert!(err.fields.contains_key("title"));
        assert!(err.fields.contains_key("price"));
    }

    #[test]
    fn free_articles_are_allowed() {
        let body = CreateArticleSchema {
            title: "Gratis".into(),
            content: "hola".into(),
            category_id: 1,
            thumbnail: None,
            price: Some(0),
        };
        assert!(body.validate().is_ok());
    }

    #[test]
    fn search_term_bounds() {
        let q = |s: &str| SearchQuery { freeword: Some(s.to_string()) };
        assert_eq!(q("   ").term().unwrap(), None);
        assert_eq!(q(" rust ").term().unwrap(), Some("rust".to_string()));
        assert!(q(&"a".repeat(31)).term().is_err());
        assert!(SearchQuery { freeword: None }.term().unwrap().is_none());
    }
}
