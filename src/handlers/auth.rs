use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use chrono::Utc;
use serde_json::json;

use crate::{
    mail,
    models::{
        normalize_email,
        user::{
            AuthResponse, Claims, LoginPayload, PasswordChangePayload, PasswordResetConfirmPayload,
            PasswordResetRequestPayload, RegisterPayload, User, USER_COLUMNS,
        },
    },
    state::AppState,
    utils::{
        jwt::issue_session_token,
        security::{hash_password, verify_password},
        signing::{self, TokenPurpose},
    },
};

// POST /api/auth/register
// El usuario queda inactivo hasta abrir el enlace que le mandamos por email.
// El primer usuario de una base vacía se crea como superusuario.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> impl IntoResponse {
    if let Err(errors) = payload.validate() {
        return errors.into_response();
    }
    let email = normalize_email(&payload.email);

    // 1. Hashear la contraseña (nunca guardarla plana)
    let hashed_password = match hash_password(&payload.password) {
        Ok(h) => h,
        Err(e) => {
            tracing::error!("Error hasheando contraseña: {:?}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error de seguridad").into_response();
        }
    };

    let mut tx = match state.pool.begin().await {
        Ok(tx) => tx,
        Err(e) => {
            tracing::error!("Error abriendo transacción: {:?}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    // 2. Un registro pendiente anterior con el mismo email se descarta
    if let Err(e) = sqlx::query("DELETE FROM users WHERE email = $1 AND is_active = FALSE")
        .bind(&email)
        .execute(&mut *tx)
        .await
    {
        tracing::error!("Error limpiando registro pendiente: {:?}", e);
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let user_count = match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(&mut *tx)
        .await
    {
        Ok(count) => count,
        Err(e) => {
            tracing::error!("Error contando usuarios: {:?}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let bootstrap = user_count == 0;

    // 3. Insertar en Base de Datos, siempre inactivo
    let inserted = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (email, name, password_hash, is_active, is_staff, is_superuser)
         VALUES ($1, $2, $3, FALSE, $4, $4)
         RETURNING {USER_COLUMNS}"
    ))
    .bind(&email)
    .bind(payload.name.trim())
    .bind(&hashed_password)
    .bind(bootstrap)
    .fetch_one(&mut *tx)
    .await;

    let user = match inserted {
        Ok(user) => user,
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            return (StatusCode::CONFLICT, "El email ya está registrado").into_response();
        }
        Err(e) => {
            tracing::error!("Error creando usuario: {:?}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if let Err(e) = tx.commit().await {
        tracing::error!("Error confirmando registro: {:?}", e);
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    // 4. Enlace de activación firmado
    let token = match signing::sign(
        TokenPurpose::Activation,
        user.id,
        None,
        &state.config.jwt_secret,
        Utc::now(),
        state.config.activation_timeout_seconds,
    ) {
        Ok(t) => t,
        Err(_) => return (StatusCode::INTERNAL_SERVER_ERROR, "Error generando token").into_response(),
    };
    let link = state.absolute_url(&format!("/api/auth/activate/{}", token));

    if let Err(e) = state
        .mailer
        .send(mail::activation_mail(
            &user.email,
            &user.name,
            &link,
            state.config.activation_timeout_seconds,
        ))
        .await
    {
        tracing::error!("Error enviando correo de activación a {}: {}", user.email, e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "No se pudo enviar el correo de activación",
        )
            .into_response();
    }

    tracing::info!(user_id = user.id, "Usuario registrado, pendiente de activación");
    (
        StatusCode::CREATED,
        Json(json!({
            "message": "Te enviamos un correo para activar tu cuenta",
            "user": user,
        })),
    )
        .into_response()
}

// GET /api/auth/activate/:token
pub async fn activate_handler(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> impl IntoResponse {
    let verified = match signing::verify(
        &token,
        TokenPurpose::Activation,
        &state.config.jwt_secret,
        state.config.activation_timeout_seconds,
        Utc::now(),
    ) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("Token de activación rechazado: {}", e);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    // Solo se activa si sigue pendiente: PENDIENTE -> ACTIVO no tiene vuelta atrás
    let activated = sqlx::query_scalar::<_, i64>(
        "UPDATE users SET is_active = TRUE WHERE id = $1 AND is_active = FALSE RETURNING id",
    )
    .bind(verified.user_id)
    .fetch_optional(&state.pool)
    .await;

    match activated {
        Ok(Some(id)) => {
            tracing::info!(user_id = id, "Cuenta activada");
            (StatusCode::OK, Json(json!({ "status": "activated" }))).into_response()
        }
        Ok(None) => match User::find_by_id(&state.pool, verified.user_id).await {
            Ok(Some(_)) => (StatusCode::OK, Json(json!({ "status": "already_active" }))).into_response(),
            Ok(None) => StatusCode::BAD_REQUEST.into_response(),
            Err(e) => {
                tracing::error!("Error buscando usuario {}: {:?}", verified.user_id, e);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        },
        Err(e) => {
            tracing::error!("Error activando usuario {}: {:?}", verified.user_id, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// POST /api/auth/login
pub async fn login_handler(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> impl IntoResponse {
    // 1. Buscar usuario por email
    let user = match User::find_by_email(&state.pool, &normalize_email(&payload.email)).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!("Error buscando usuario: {:?}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let user = match user {
        Some(u) => u,
        None => return (StatusCode::UNAUTHORIZED, "Credenciales inválidas").into_response(),
    };

    // 2. Verificar contraseña (Argon2). Una cuenta sin activar no puede entrar.
    if !verify_password(&payload.password, &user.password_hash) || !user.is_active {
        return (StatusCode::UNAUTHORIZED, "Credenciales inválidas").into_response();
    }

    // 3. Generar JWT Token
    match issue_session_token(
        &user,
        &state.config.jwt_secret,
        Utc::now(),
        state.config.session_ttl_hours,
    ) {
        Ok(t) => (
            StatusCode::OK,
            Json(AuthResponse {
                token: t,
                token_type: "Bearer".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Error generando token: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error generando token").into_response()
        }
    }
}

// POST /api/auth/logout
// Las sesiones son JWT sin estado: basta con que el cliente olvide el token
pub async fn logout_handler(Extension(claims): Extension<Claims>) -> impl IntoResponse {
    tracing::debug!(user_id = claims.user_id, "Logout");
    StatusCode::NO_CONTENT
}

// POST /api/auth/password/change
pub async fn password_change_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<PasswordChangePayload>,
) -> impl IntoResponse {
    let user = match User::find_by_id(&state.pool, claims.user_id).await {
        Ok(Some(u)) => u,
        Ok(None) => return (StatusCode::NOT_FOUND, "Usuario no encontrado").into_response(),
        Err(e) => {
            tracing::error!("Error buscando usuario {}: {:?}", claims.user_id, e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if !verify_password(&payload.old_password, &user.password_hash) {
        return (StatusCode::BAD_REQUEST, "La contraseña actual no es correcta").into_response();
    }
    if let Err(errors) = payload.validate() {
        return errors.into_response();
    }

    set_password(&state, user.id, &payload.new_password).await
}

// POST /api/auth/password/reset
// Siempre 202, exista o no la cuenta, para no revelar qué emails están registrados
pub async fn password_reset_request_handler(
    State(state): State<AppState>,
    Json(payload): Json<PasswordResetRequestPayload>,
) -> impl IntoResponse {
    let accepted = (
        StatusCode::ACCEPTED,
        Json(json!({ "message": "Si la cuenta existe, te enviamos un enlace" })),
    );

    let user = match User::find_by_email(&state.pool, &normalize_email(&payload.email)).await {
        Ok(Some(u)) if u.is_active => u,
        Ok(_) => return accepted.into_response(),
        Err(e) => {
            tracing::error!("Error buscando usuario: {:?}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let token = match signing::sign(
        TokenPurpose::PasswordReset,
        user.id,
        Some(user.password_stamp()),
        &state.config.jwt_secret,
        Utc::now(),
        state.config.password_reset_timeout_seconds,
    ) {
        Ok(t) => t,
        Err(_) => return (StatusCode::INTERNAL_SERVER_ERROR, "Error generando token").into_response(),
    };
    let link = state.absolute_url(&format!("/api/auth/password/reset/{}", token));

    if let Err(e) = state
        .mailer
        .send(mail::password_reset_mail(&user.email, &user.name, &link))
        .await
    {
        tracing::error!("Error enviando correo de recuperación a {}: {}", user.email, e);
    }

    accepted.into_response()
}

// POST /api/auth/password/reset/:token
pub async fn password_reset_confirm_handler(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<PasswordResetConfirmPayload>,
) -> impl IntoResponse {
    if let Err(errors) = payload.validate() {
        return errors.into_response();
    }

    let verified = match signing::verify(
        &token,
        TokenPurpose::PasswordReset,
        &state.config.jwt_secret,
        state.config.password_reset_timeout_seconds,
        Utc::now(),
    ) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("Token de recuperación rechazado: {}", e);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let user = match User::find_by_id(&state.pool, verified.user_id).await {
        Ok(Some(u)) => u,
        Ok(None) => return StatusCode::BAD_REQUEST.into_response(),
        Err(e) => {
            tracing::error!("Error buscando usuario {}: {:?}", verified.user_id, e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    // El enlace deja de valer en cuanto la contraseña cambia
    if !user.is_active || verified.stamp != Some(user.password_stamp()) {
        return StatusCode::BAD_REQUEST.into_response();
    }

    set_password(&state, user.id, &payload.new_password).await
}

async fn set_password(state: &AppState, user_id: i64, new_password: &str) -> axum::response::Response {
    let hashed_password = match hash_password(new_password) {
        Ok(h) => h,
        Err(e) => {
            tracing::error!("Error hasheando contraseña: {:?}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error de seguridad").into_response();
        }
    };

    let result = sqlx::query(
        "UPDATE users SET password_hash = $1, password_changed_at = NOW() WHERE id = $2",
    )
    .bind(&hashed_password)
    .bind(user_id)
    .execute(&state.pool)
    .await;

    match result {
        Ok(res) if res.rows_affected() == 1 => {
            tracing::info!(user_id, "Contraseña actualizada");
            (
                StatusCode::OK,
                Json(json!({ "message": "Contraseña actualizada" })),
            )
                .into_response()
        }
        Ok(_) => (StatusCode::NOT_FOUND, "Usuario no encontrado").into_response(),
        Err(e) => {
            tracing::error!("Error actualizando contraseña: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::mail::fake::RecordingMailer;
    use crate::payment::fake::{Behaviour, RecordingGateway};
    use crate::routes::create_routes;
    use crate::test_support::{self, PASSWORD};
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use sqlx::PgPool;
    use std::sync::Arc;

    fn token_from_link(body: &str, prefix: &str) -> String {
        let start = body.find(prefix).expect("enlace en el correo") + prefix.len();
        body[start..]
            .split_whitespace()
            .next()
            .unwrap()
            .to_string()
    }

    async fn is_active(pool: &PgPool, email: &str) -> bool {
        sqlx::query_scalar("SELECT is_active FROM users WHERE email = $1")
            .bind(email)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "necesita Postgres en DATABASE_URL"]
    async fn register_activate_and_activate_again(pool: PgPool) {
        let mailer = Arc::new(RecordingMailer::default());
        let state = test_support::state_with(
            pool.clone(),
            Arc::new(RecordingGateway::new(Behaviour::Approve)),
            mailer.clone(),
        );
        let app = || create_routes(state.clone());

        let (status, _) = test_support::send(
            app(),
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "name": "A",
                "email": "a@example.com",
                "password": PASSWORD,
                "password_confirm": PASSWORD,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(!is_active(&pool, "a@example.com").await);

        // Sin activar no se puede entrar
        let login = json!({ "email": "a@example.com", "password": PASSWORD });
        let (status, _) =
            test_support::send(app(), Method::POST, "/api/auth/login", None, Some(login.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        let token = token_from_link(&sent[0].body, "/api/auth/activate/");
        let path = format!("/api/auth/activate/{token}");

        let (status, body) = test_support::send(app(), Method::GET, &path, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "activated");
        assert!(is_active(&pool, "a@example.com").await);

        let (status, body) = test_support::send(app(), Method::GET, &path, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "already_active");
        assert!(is_active(&pool, "a@example.com").await);

        let (status, body) =
            test_support::send(app(), Method::POST, "/api/auth/login", None, Some(login)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "Bearer");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "necesita Postgres en DATABASE_URL"]
    async fn activation_for_a_deleted_user_is_a_bad_request(pool: PgPool) {
        let id = test_support::seed_user(&pool, "a@example.com", false, false).await;
        let token = crate::utils::signing::sign(
            crate::utils::signing::TokenPurpose::Activation,
            id,
            None,
            test_support::JWT_SECRET,
            chrono::Utc::now(),
            86400,
        )
        .unwrap();
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&pool)
            .await
            .unwrap();

        let app = test_support::app(pool.clone(), Arc::new(RecordingGateway::new(Behaviour::Approve)));
        let (status, _) =
            test_support::send(app, Method::GET, &format!("/api/auth/activate/{token}"), None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "necesita Postgres en DATABASE_URL"]
    async fn reset_link_works_once(pool: PgPool) {
        test_support::seed_user(&pool, "a@example.com", true, false).await;
        let mailer = Arc::new(RecordingMailer::default());
        let state = test_support::state_with(
            pool.clone(),
            Arc::new(RecordingGateway::new(Behaviour::Approve)),
            mailer.clone(),
        );
        let app = || create_routes(state.clone());

        let (status, _) = test_support::send(
            app(),
            Method::POST,
            "/api/auth/password/reset",
            None,
            Some(json!({ "email": "a@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let token = token_from_link(&mailer.sent()[0].body, "/api/auth/password/reset/");
        let path = format!("/api/auth/password/reset/{token}");
        let body = json!({ "new_password": "nueva-clave-1", "new_password_confirm": "nueva-clave-1" });

        let (status, _) = test_support::send(app(), Method::POST, &path, None, Some(body.clone())).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = test_support::send(app(), Method::POST, &path, None, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "necesita Postgres en DATABASE_URL"]
    async fn first_user_becomes_superuser(pool: PgPool) {
        let app = test_support::app(pool.clone(), Arc::new(RecordingGateway::new(Behaviour::Approve)));
        let (status, body) = test_support::send(
            app,
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": "Admin@Example.com",
                "password": PASSWORD,
                "password_confirm": PASSWORD,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["email"], "admin@example.com");
        assert_eq!(body["user"]["is_superuser"], true);
        assert_eq!(body["user"]["is_active"], false);
    }
}
