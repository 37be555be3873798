use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension,
};

use crate::{
    db::DbPool,
    models::{
        article::{Article, PageQuery},
        user::{Claims, UpdateUserPayload, User, USER_COLUMNS},
    },
    utils::pagination::{Page, PageRequest},
};

const LIKES_PER_PAGE: i64 = 5;

// Solo el propio usuario o un superusuario pueden ver/editar un perfil
fn can_access_profile(claims: &Claims, user_id: i64) -> bool {
    claims.user_id == user_id || claims.is_superuser
}

// GET /api/users/:id
pub async fn get_user_handler(
    Path(id): Path<i64>,
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    if !can_access_profile(&claims, id) {
        return (StatusCode::FORBIDDEN, "No puedes ver el perfil de otro usuario").into_response();
    }

    match User::find_by_id(&pool, id).await {
        Ok(Some(user)) => (StatusCode::OK, Json(user)).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Usuario no encontrado").into_response(),
        Err(e) => {
            tracing::error!("Error buscando usuario {}: {:?}", id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error interno").into_response()
        }
    }
}

// PUT /api/users/:id
pub async fn update_user_handler(
    Path(id): Path<i64>,
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<UpdateUserPayload>,
) -> impl IntoResponse {
    if !can_access_profile(&claims, id) {
        return (StatusCode::FORBIDDEN, "No puedes editar el perfil de otro usuario").into_response();
    }
    if let Err(errors) = body.validate() {
        return errors.into_response();
    }

    let result = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET name = $1 WHERE id = $2 RETURNING {USER_COLUMNS}"
    ))
    .bind(body.name.trim())
    .bind(id)
    .fetch_optional(&pool)
    .await;

    match result {
        Ok(Some(user)) => (StatusCode::OK, Json(user)).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Usuario no encontrado").into_response(),
        Err(e) => {
            tracing::error!("Error actualizando usuario {}: {:?}", id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error al actualizar").into_response()
        }
    }
}

// GET /api/me/likes?page=N - artículos que el usuario marcó con like
pub async fn my_likes_handler(
    Query(query): Query<PageQuery>,
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    let page = PageRequest::new(query.page, LIKES_PER_PAGE);

    let total = match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM likes WHERE user_id = $1")
        .bind(claims.user_id)
        .fetch_one(&pool)
        .await
    {
        Ok(n) => n,
        Err(e) => {
            tracing::error!("Error contando likes: {:?}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error interno").into_response();
        }
    };

    let items = sqlx::query_as::<_, Article>(
        r#"
        SELECT a.id, a.author_id, a.category_id, a.title, a.price, a.content,
               a.thumbnail, a.created_at, a.updated_at, a.like_num
        FROM likes l
        JOIN articles a ON a.id = l.article_id
        WHERE l.user_id = $1
        ORDER BY l.id DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(claims.user_id)
    .bind(page.per_page)
    .bind(page.offset())
    .fetch_all(&pool)
    .await;

    match items {
        Ok(items) => (StatusCode::OK, Json(Page::new(items, page, total))).into_response(),
        Err(e) => {
            tracing::error!("Error listando likes: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error interno").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(user_id: i64, is_superuser: bool) -> Claims {
        Claims {
            sub: "a@example.com".into(),
            exp: 0,
            iat: 0,
            user_id,
            is_superuser,
        }
    }

    #[test]
    fn only_self_or_superuser_reach_a_profile() {
        assert!(can_access_profile(&claims(3, false), 3));
        assert!(!can_access_profile(&claims(3, false), 4));
        assert!(can_access_profile(&claims(1, true), 4));
    }
}
