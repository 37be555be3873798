use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    db::DbPool,
    models::{
        article::{Article, ARTICLE_COLUMNS},
        category::{Category, CategorySchema, CategoryWithCount},
    },
    utils::slug::slugify_or_random,
};

const CATEGORY_COLUMNS: &str = "id, name, name_en, created_at, updated_at";

// GET /api/categories
pub async fn list_categories_handler(State(pool): State<DbPool>) -> impl IntoResponse {
    let categories = sqlx::query_as::<_, CategoryWithCount>(
        r#"
        SELECT c.id, c.name, c.name_en, COUNT(a.id) AS post_count
        FROM categories c
        LEFT JOIN articles a ON a.category_id = c.id
        GROUP BY c.id
        ORDER BY c.id ASC
        "#,
    )
    .fetch_all(&pool)
    .await;

    match categories {
        Ok(data) => (StatusCode::OK, Json(data)).into_response(),
        Err(e) => {
            tracing::error!("Error listando categorías: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error interno").into_response()
        }
    }
}

// GET /api/categories/:name_en - la categoría y sus artículos, más nuevos primero
pub async fn get_category_handler(
    Path(name_en): Path<String>,
    State(pool): State<DbPool>,
) -> impl IntoResponse {
    let category = sqlx::query_as::<_, Category>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories WHERE name_en = $1"
    ))
    .bind(&name_en)
    .fetch_optional(&pool)
    .await;

    let category = match category {
        Ok(Some(c)) => c,
        Ok(None) => return (StatusCode::NOT_FOUND, "Categoría no encontrada").into_response(),
        Err(e) => {
            tracing::error!("Error buscando categoría {}: {:?}", name_en, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error interno").into_response();
        }
    };

    let posts = sqlx::query_as::<_, Article>(&format!(
        "SELECT {ARTICLE_COLUMNS} FROM articles WHERE category_id = $1 ORDER BY created_at DESC, id DESC"
    ))
    .bind(category.id)
    .fetch_all(&pool)
    .await;

    match posts {
        Ok(posts) => (
            StatusCode::OK,
            Json(json!({ "category": category, "category_posts": posts })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Error listando artículos de {}: {:?}", name_en, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error interno").into_response()
        }
    }
}

// POST /api/categories - solo superusuarios
pub async fn create_category_handler(
    State(pool): State<DbPool>,
    Json(body): Json<CategorySchema>,
) -> impl IntoResponse {
    if let Err(errors) = body.validate() {
        return errors.into_response();
    }
    let name_en = body
        .name_en
        .clone()
        .unwrap_or_else(|| slugify_or_random(&body.name, "category"));

    let result = sqlx::query_as::<_, Category>(&format!(
        "INSERT INTO categories (name, name_en) VALUES ($1, $2) RETURNING {CATEGORY_COLUMNS}"
    ))
    .bind(body.name.trim())
    .bind(&name_en)
    .fetch_one(&pool)
    .await;

    match result {
        Ok(category) => (StatusCode::CREATED, Json(category)).into_response(),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            (StatusCode::CONFLICT, "Ya existe una categoría con ese name_en").into_response()
        }
        Err(e) => {
            tracing::error!("Error creando categoría: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "No se pudo crear la categoría").into_response()
        }
    }
}

// PUT /api/categories/:id - solo superusuarios
pub async fn update_category_handler(
    Path(id): Path<i64>,
    State(pool): State<DbPool>,
    Json(body): Json<CategorySchema>,
) -> impl IntoResponse {
    if let Err(errors) = body.validate() {
        return errors.into_response();
    }

    let result = sqlx::query_as::<_, Category>(&format!(
        r#"
        UPDATE categories SET
            name = $1,
            name_en = COALESCE($2, name_en),
            updated_at = NOW()
        WHERE id = $3
        RETURNING {CATEGORY_COLUMNS}
        "#
    ))
    .bind(body.name.trim())
    .bind(&body.name_en)
    .bind(id)
    .fetch_optional(&pool)
    .await;

    match result {
        Ok(Some(category)) => (StatusCode::OK, Json(category)).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Categoría no encontrada").into_response(),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            (StatusCode::CONFLICT, "Ya existe una categoría con ese name_en").into_response()
        }
        Err(e) => {
            tracing::error!("Error actualizando categoría: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error al actualizar").into_response()
        }
    }
}

// DELETE /api/categories/:id - borra también sus artículos
pub async fn delete_category_handler(
    Path(id): Path<i64>,
    State(pool): State<DbPool>,
) -> impl IntoResponse {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await;

    match result {
        Ok(res) if res.rows_affected() == 0 => {
            (StatusCode::NOT_FOUND, "Categoría no encontrada").into_response()
        }
        Ok(_) => (StatusCode::OK, "Categoría eliminada correctamente").into_response(),
        Err(e) => {
            tracing::error!("Error eliminando categoría: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error interno").into_response()
        }
    }
}
