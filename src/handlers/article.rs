use axum::{
    extract::{Json, Path, Query, State},
    Extension,
    http::StatusCode,
    response::IntoResponse,
};
use crate::{
    db::DbPool,
    models::{
        article::{
            Article, ArticleDetail, CreateArticleSchema, PageQuery, SearchQuery, UpdateArticleSchema,
            ARTICLE_COLUMNS, DEFAULT_PRICE,
        },
        comment::{build_threads, Comment, Reply, COMMENT_COLUMNS},
        user::Claims,
    },
    state::AppState,
    utils::pagination::{Page, PageRequest},
};

const LATEST_LIMIT: i64 = 9;
const ARTICLES_PER_PAGE: i64 = 5;
const CATEGORY_POSTS_LIMIT: i64 = 5;

// GET /api/articles/latest - portada: los 9 artículos actualizados más recientes
pub async fn latest_articles_handler(State(pool): State<DbPool>) -> impl IntoResponse {
    let result = sqlx::query_as::<_, Article>(&format!(
        "SELECT {ARTICLE_COLUMNS} FROM articles ORDER BY updated_at DESC, id DESC LIMIT $1"
    ))
    .bind(LATEST_LIMIT)
    .fetch_all(&pool)
    .await;

    match result {
        Ok(data) => (StatusCode::OK, Json(data)).into_response(),
        Err(e) => {
            tracing::error!("Error listando portada: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error de base de datos").into_response()
        }
    }
}

// GET /api/articles?page=N
pub async fn list_articles_handler(
    Query(query): Query<PageQuery>,
    State(pool): State<DbPool>,
) -> impl IntoResponse {
    let page = PageRequest::new(query.page, ARTICLES_PER_PAGE);

    let total = match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM articles")
        .fetch_one(&pool)
        .await
    {
        Ok(n) => n,
        Err(e) => {
            tracing::error!("Error contando artículos: {:?}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error de base de datos").into_response();
        }
    };

    let result = sqlx::query_as::<_, Article>(&format!(
        "SELECT {ARTICLE_COLUMNS} FROM articles ORDER BY updated_at DESC, id DESC LIMIT $1 OFFSET $2"
    ))
    .bind(page.per_page)
    .bind(page.offset())
    .fetch_all(&pool)
    .await;

    match result {
        Ok(items) => (StatusCode::OK, Json(Page::new(items, page, total))).into_response(),
        Err(e) => {
            tracing::error!("Error listando artículos: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error de base de datos").into_response()
        }
    }
}

pub async fn find_article(pool: &DbPool, id: i64) -> Result<Option<Article>, sqlx::Error> {
    sqlx::query_as::<_, Article>(&format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

// Todo lo que muestra la página de un artículo: el propio artículo, otros de
// su categoría y los comentarios (más nuevos primero) con sus respuestas
pub async fn load_article_detail(
    pool: &DbPool,
    id: i64,
    publishable_key: Option<String>,
) -> Result<Option<ArticleDetail>, sqlx::Error> {
    let article = match find_article(pool, id).await? {
        Some(a) => a,
        None => return Ok(None),
    };

    // Conteo real de filas, no el contador desnormalizado
    let like_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM likes WHERE article_id = $1")
        .bind(id)
        .fetch_one(pool)
        .await?;

    let category_posts = sqlx::query_as::<_, Article>(&format!(
        "SELECT {ARTICLE_COLUMNS} FROM articles WHERE category_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2"
    ))
    .bind(article.category_id)
    .bind(CATEGORY_POSTS_LIMIT)
    .fetch_all(pool)
    .await?;

    let comments = sqlx::query_as::<_, Comment>(&format!(
        "SELECT {COMMENT_COLUMNS} FROM comments WHERE article_id = $1 ORDER BY created_at DESC, id DESC"
    ))
    .bind(id)
    .fetch_all(pool)
    .await?;

    let replies = sqlx::query_as::<_, Reply>(
        r#"
        SELECT r.id, r.comment_id, r.author, r.authority, r.text, r.created_at
        FROM replies r
        JOIN comments c ON c.id = r.comment_id
        WHERE c.article_id = $1
        ORDER BY r.created_at ASC, r.id ASC
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(Some(ArticleDetail {
        article,
        like_count,
        category_posts,
        comments: build_threads(comments, replies),
        publishable_key,
    }))
}

// GET /api/articles/:id
pub async fn get_article_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let result = load_article_detail(&state.pool, id, state.config.stripe_public_key.clone()).await;

    match result {
        Ok(Some(detail)) => (StatusCode::OK, Json(detail)).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Artículo no encontrado").into_response(),
        Err(e) => {
            tracing::error!("Error buscando artículo {}: {:?}", id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error interno").into_response()
        }
    }
}

// Los comodines del usuario se buscan literalmente
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

// GET /api/search?freeword=texto
pub async fn search_articles_handler(
    Query(query): Query<SearchQuery>,
    State(pool): State<DbPool>,
) -> impl IntoResponse {
    let term = match query.term() {
        Ok(Some(term)) => term,
        Ok(None) => return (StatusCode::OK, Json(Vec::<Article>::new())).into_response(),
        Err(errors) => return errors.into_response(),
    };

    // ILIKE: búsqueda insensible a mayúsculas en título o contenido
    let result = sqlx::query_as::<_, Article>(&format!(
        r#"
        SELECT {ARTICLE_COLUMNS}
        FROM articles
        WHERE title ILIKE '%' || $1 || '%' OR content ILIKE '%' || $1 || '%'
        ORDER BY updated_at DESC, id DESC
        "#
    ))
    .bind(escape_like(&term))
    .fetch_all(&pool)
    .await;

    match result {
        Ok(data) => (StatusCode::OK, Json(data)).into_response(),
        Err(e) => {
            tracing::error!("Error buscando artículos: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error de base de datos").into_response()
        }
    }
}

// POST /api/articles - solo superusuarios
pub async fn create_article_handler(
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<CreateArticleSchema>,
) -> impl IntoResponse {
    if let Err(errors) = body.validate() {
        return errors.into_response();
    }

    let query_result = sqlx::query_as::<_, Article>(&format!(
        r#"
        INSERT INTO articles (author_id, category_id, title, price, content, thumbnail)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {ARTICLE_COLUMNS}
        "#
    ))
    .bind(claims.user_id)
    .bind(body.category_id)
    .bind(body.title.trim())
    .bind(body.price.unwrap_or(DEFAULT_PRICE))
    .bind(&body.content)
    .bind(&body.thumbnail)
    .fetch_one(&pool)
    .await;

    match query_result {
        Ok(article) => {
            tracing::info!(article_id = article.id, "Artículo creado");
            (StatusCode::CREATED, Json(article)).into_response()
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
            (StatusCode::BAD_REQUEST, "La categoría no existe").into_response()
        }
        Err(e) => {
            tracing::error!("Error al crear artículo: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "No se pudo crear el artículo").into_response()
        }
    }
}

// PUT /api/articles/:id - solo superusuarios
pub async fn update_article_handler(
    Path(id): Path<i64>,
    State(pool): State<DbPool>,
    Json(body): Json<UpdateArticleSchema>,
) -> impl IntoResponse {
    if let Err(errors) = body.validate() {
        return errors.into_response();
    }

    // COALESCE($1, title): si no envían el campo se conserva el valor guardado
    let result = sqlx::query_as::<_, Article>(&format!(
        r#"
        UPDATE articles SET
            title = COALESCE($1, title),
            content = COALESCE($2, content),
            category_id = COALESCE($3, category_id),
            thumbnail = COALESCE($4, thumbnail),
            price = COALESCE($5, price),
            updated_at = NOW()
        WHERE id = $6
        RETURNING {ARTICLE_COLUMNS}
        "#
    ))
    .bind(body.title.as_deref().map(str::trim))
    .bind(&body.content)
    .bind(body.category_id)
    .bind(&body.thumbnail)
    .bind(body.price)
    .bind(id)
    .fetch_optional(&pool)
    .await;

    match result {
        Ok(Some(updated)) => (StatusCode::OK, Json(updated)).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Artículo no encontrado").into_response(),
        Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
            (StatusCode::BAD_REQUEST, "La categoría no existe").into_response()
        }
        Err(e) => {
            tracing::error!("Error actualizando artículo: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error al actualizar").into_response()
        }
    }
}

// DELETE /api/articles/:id - solo superusuarios; likes, comentarios y pagos caen en cascada
pub async fn delete_article_handler(
    Path(id): Path<i64>,
    State(pool): State<DbPool>,
) -> impl IntoResponse {
    let result = sqlx::query("DELETE FROM articles WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await;

    match result {
        Ok(res) => {
            if res.rows_affected() == 0 {
                (StatusCode::NOT_FOUND, "Artículo no encontrado").into_response()
            } else {
                (StatusCode::OK, "Artículo eliminado correctamente").into_response()
            }
        }
        Err(e) => {
            tracing::error!("Error eliminando artículo: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error interno").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b\\c"), "a\\_b\\\\c");
        assert_eq!(escape_like("rust"), "rust");
    }
}
