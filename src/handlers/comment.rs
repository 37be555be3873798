use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension,
};

use crate::{
    handlers::article::find_article,
    mail,
    models::{
        comment::{
            is_owner, Comment, CreateCommentSchema, CreateReplySchema, Reply, COMMENT_COLUMNS,
            REPLY_COLUMNS,
        },
        user::Claims,
    },
    state::AppState,
};

// POST /api/articles/:id/comments
pub async fn create_comment_handler(
    Path(article_id): Path<i64>,
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<CreateCommentSchema>,
) -> impl IntoResponse {
    if let Err(errors) = body.validate() {
        return errors.into_response();
    }

    match find_article(&state.pool, article_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return (StatusCode::NOT_FOUND, "Artículo no encontrado").into_response(),
        Err(e) => {
            tracing::error!("Error buscando artículo {}: {:?}", article_id, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error interno").into_response();
        }
    }

    let notify_email = body
        .notify_email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());

    // useremail es el marcador de dueño: el email de la sesión, no lo que escriba el usuario
    let result = sqlx::query_as::<_, Comment>(&format!(
        r#"
        INSERT INTO comments (article_id, author, text, notify_email, useremail)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {COMMENT_COLUMNS}
        "#
    ))
    .bind(article_id)
    .bind(body.author.trim())
    .bind(&body.text)
    .bind(notify_email)
    .bind(&claims.sub)
    .fetch_one(&state.pool)
    .await;

    match result {
        Ok(comment) => (StatusCode::CREATED, Json(comment)).into_response(),
        Err(e) => {
            tracing::error!("Error creando comentario: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "No se pudo crear el comentario").into_response()
        }
    }
}

// DELETE /api/comments/:id - solo quien lo escribió; sus respuestas caen en cascada
pub async fn delete_comment_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    let comment = sqlx::query_as::<_, Comment>(&format!(
        "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.pool)
    .await;

    let comment = match comment {
        Ok(Some(c)) => c,
        Ok(None) => return (StatusCode::NOT_FOUND, "Comentario no encontrado").into_response(),
        Err(e) => {
            tracing::error!("Error buscando comentario {}: {:?}", id, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error interno").into_response();
        }
    };

    if !is_owner(comment.useremail.as_deref(), &claims.sub) {
        return (StatusCode::FORBIDDEN, "No puedes borrar comentarios de otros").into_response();
    }

    match sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await
    {
        Ok(_) => (StatusCode::OK, "Comentario eliminado").into_response(),
        Err(e) => {
            tracing::error!("Error eliminando comentario {}: {:?}", id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error interno").into_response()
        }
    }
}

// POST /api/comments/:id/replies
pub async fn create_reply_handler(
    Path(comment_id): Path<i64>,
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<CreateReplySchema>,
) -> impl IntoResponse {
    if let Err(errors) = body.validate() {
        return errors.into_response();
    }

    // El comentario padre tiene que existir al escribir
    let parent = sqlx::query_as::<_, Comment>(&format!(
        "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
    ))
    .bind(comment_id)
    .fetch_optional(&state.pool)
    .await;

    let parent = match parent {
        Ok(Some(c)) => c,
        Ok(None) => return (StatusCode::NOT_FOUND, "Comentario no encontrado").into_response(),
        Err(e) => {
            tracing::error!("Error buscando comentario {}: {:?}", comment_id, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error interno").into_response();
        }
    };

    let result = sqlx::query_as::<_, Reply>(&format!(
        r#"
        INSERT INTO replies (comment_id, author, authority, text)
        VALUES ($1, $2, $3, $4)
        RETURNING {REPLY_COLUMNS}
        "#
    ))
    .bind(comment_id)
    .bind(body.author.trim())
    .bind(&claims.sub)
    .bind(&body.text)
    .fetch_one(&state.pool)
    .await;

    let reply = match result {
        Ok(r) => r,
        // El padre pudo borrarse entre la consulta y el INSERT
        Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
            return (StatusCode::NOT_FOUND, "Comentario no encontrado").into_response();
        }
        Err(e) => {
            tracing::error!("Error creando respuesta: {:?}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "No se pudo crear la respuesta").into_response();
        }
    };

    notify_comment_author(&state, &parent, &reply).await;

    (StatusCode::CREATED, Json(reply)).into_response()
}

// Aviso por correo al autor del comentario, si dejó un email. Un fallo aquí
// no afecta a la respuesta ya guardada.
async fn notify_comment_author(state: &AppState, parent: &Comment, reply: &Reply) {
    let Some(to) = parent.notify_email.as_deref() else {
        return;
    };

    let title = match find_article(&state.pool, parent.article_id).await {
        Ok(Some(article)) => article.title,
        Ok(None) => return,
        Err(e) => {
            tracing::error!("Error buscando artículo {}: {:?}", parent.article_id, e);
            return;
        }
    };

    let link = state.absolute_url(&format!("/api/articles/{}", parent.article_id));
    if let Err(e) = state
        .mailer
        .send(mail::reply_notification_mail(to, &title, &reply.author, &link))
        .await
    {
        tracing::error!("Error avisando de respuesta a {}: {}", to, e);
    }
}

// DELETE /api/replies/:id - solo quien la escribió
pub async fn delete_reply_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    let reply = sqlx::query_as::<_, Reply>(&format!("SELECT {REPLY_COLUMNS} FROM replies WHERE id = $1"))
        .bind(id)
        .fetch_optional(&state.pool)
        .await;

    let reply = match reply {
        Ok(Some(r)) => r,
        Ok(None) => return (StatusCode::NOT_FOUND, "Respuesta no encontrada").into_response(),
        Err(e) => {
            tracing::error!("Error buscando respuesta {}: {:?}", id, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error interno").into_response();
        }
    };

    if !is_owner(reply.authority.as_deref(), &claims.sub) {
        return (StatusCode::FORBIDDEN, "No puedes borrar respuestas de otros").into_response();
    }

    match sqlx::query("DELETE FROM replies WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await
    {
        Ok(_) => (StatusCode::OK, "Respuesta eliminada").into_response(),
        Err(e) => {
            tracing::error!("Error eliminando respuesta {}: {:?}", id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error interno").into_response()
        }
    }
}
