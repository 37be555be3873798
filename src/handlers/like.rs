use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use serde_json::json;

use crate::{
    db::DbPool,
    models::{like::LikeToggle, user::Claims},
};

// Alterna el like dentro de una transacción. La fila del artículo queda
// bloqueada (FOR UPDATE) y el contador se recalcula desde las filas reales,
// así dos toggles concurrentes no lo desincronizan.
pub async fn toggle_like(
    pool: &DbPool,
    user_id: i64,
    article_id: i64,
) -> Result<Option<LikeToggle>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let article = sqlx::query_scalar::<_, i64>("SELECT id FROM articles WHERE id = $1 FOR UPDATE")
        .bind(article_id)
        .fetch_optional(&mut *tx)
        .await?;
    if article.is_none() {
        return Ok(None);
    }

    let removed = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND article_id = $2")
        .bind(user_id)
        .bind(article_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let liked = if removed > 0 {
        false
    } else {
        sqlx::query(
            "INSERT INTO likes (user_id, article_id) VALUES ($1, $2) ON CONFLICT (user_id, article_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(article_id)
        .execute(&mut *tx)
        .await?;
        true
    };

    let like_num = sqlx::query_scalar::<_, i32>(
        r#"
        UPDATE articles
        SET like_num = (SELECT COUNT(*) FROM likes WHERE article_id = $1)
        WHERE id = $1
        RETURNING like_num
        "#,
    )
    .bind(article_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Some(LikeToggle { liked, like_num }))
}

// POST /api/articles/:id/like
pub async fn toggle_like_handler(
    Path(id): Path<i64>,
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    match toggle_like(&pool, claims.user_id, id).await {
        Ok(Some(toggle)) => {
            let message = if toggle.liked {
                "Añadido a favoritos"
            } else {
                "Eliminado de favoritos"
            };
            (
                StatusCode::OK,
                Json(json!({
                    "liked": toggle.liked,
                    "like_num": toggle.like_num,
                    "message": message,
                })),
            )
                .into_response()
        }
        Ok(None) => (StatusCode::NOT_FOUND, "Artículo no encontrado").into_response(),
        Err(e) => {
            tracing::error!("Error alternando like en {}: {:?}", id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error interno").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use sqlx::PgPool;

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "necesita Postgres en DATABASE_URL"]
    async fn two_toggles_restore_the_original_state(pool: PgPool) {
        let user = test_support::seed_user(&pool, "a@example.com", true, false).await;
        let article = test_support::seed_article(&pool, 100).await;

        let first = toggle_like(&pool, user, article).await.unwrap().unwrap();
        assert_eq!(first, LikeToggle { liked: true, like_num: 1 });

        let second = toggle_like(&pool, user, article).await.unwrap().unwrap();
        assert_eq!(second, LikeToggle { liked: false, like_num: 0 });

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM likes")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "necesita Postgres en DATABASE_URL"]
    async fn concurrent_toggles_keep_counter_consistent(pool: PgPool) {
        let user = test_support::seed_user(&pool, "a@example.com", true, false).await;
        let article = test_support::seed_article(&pool, 100).await;

        let (a, b) = tokio::join!(toggle_like(&pool, user, article), toggle_like(&pool, user, article));
        a.unwrap();
        b.unwrap();

        let (rows, counter): (i64, i32) = sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM likes WHERE article_id = $1), like_num FROM articles WHERE id = $1",
        )
        .bind(article)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(rows, i64::from(counter));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "necesita Postgres en DATABASE_URL"]
    async fn missing_article_is_reported(pool: PgPool) {
        let user = test_support::seed_user(&pool, "a@example.com", true, false).await;
        assert!(toggle_like(&pool, user, 999).await.unwrap().is_none());
    }
}
