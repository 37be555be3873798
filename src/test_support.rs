// Utilidades compartidas por los tests: estado con dobles, tokens y datos semilla

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

use crate::{
    config::Config,
    db::DbPool,
    mail::{fake::RecordingMailer, Mailer},
    models::user::Claims,
    payment::PaymentGateway,
    routes::create_routes,
    state::AppState,
    utils::security::hash_password,
};

pub const JWT_SECRET: &str = "secreto-de-prueba";
pub const PASSWORD: &str = "contraseña-123";

pub fn test_config() -> Config {
    let vars = HashMap::from([
        ("DATABASE_URL", "postgres://postgres@localhost/blog_test"),
        ("JWT_SECRET", JWT_SECRET),
        ("STRIPE_SECRET_KEY", "sk_test_123"),
        ("STRIPE_PUBLIC_KEY", "pk_test_123"),
        ("CONTACT_RECIPIENT", "contacto@example.com"),
        ("SITE_URL", "http://blog.test"),
    ]);
    Config::from_map(&vars).expect("configuración de test")
}

// Pool que nunca conecta mientras nadie lo use
pub fn lazy_pool() -> DbPool {
    PgPoolOptions::new()
        .connect_lazy(&test_config().database_url)
        .expect("URL de test válida")
}

pub fn state_with(
    pool: DbPool,
    payments: Arc<dyn PaymentGateway>,
    mailer: Arc<dyn Mailer>,
) -> AppState {
    AppState {
        pool,
        config: Arc::new(test_config()),
        payments,
        mailer,
    }
}

pub fn app(pool: DbPool, payments: Arc<dyn PaymentGateway>) -> Router {
    create_routes(state_with(pool, payments, Arc::new(RecordingMailer::default())))
}

pub fn bearer(user_id: i64, email: &str, is_superuser: bool) -> String {
    let now = Utc::now();
    let claims = Claims {
        sub: email.to_string(),
        exp: (now + Duration::hours(1)).timestamp() as usize,
        iat: now.timestamp() as usize,
        user_id,
        is_superuser,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

pub async fn seed_user(pool: &DbPool, email: &str, is_active: bool, is_superuser: bool) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO users (email, name, password_hash, is_active, is_staff, is_superuser)
         VALUES ($1, 'Test', $2, $3, $4, $4) RETURNING id",
    )
    .bind(email)
    .bind(hash_password(PASSWORD).unwrap())
    .bind(is_active)
    .bind(is_superuser)
    .fetch_one(pool)
    .await
    .unwrap()
}

// Crea autor, categoría y artículo; devuelve el id del artículo
pub async fn seed_article(pool: &DbPool, price: i32) -> i64 {
    let suffix = Uuid::new_v4().simple().to_string();
    let author = seed_user(pool, &format!("autor-{}@example.com", &suffix[..8]), true, true).await;
    let category: i64 = sqlx::query_scalar(
        "INSERT INTO categories (name, name_en) VALUES ('Tecnología', $1) RETURNING id",
    )
    .bind(format!("tech-{}", &suffix[..8]))
    .fetch_one(pool)
    .await
    .unwrap();

    sqlx::query_scalar(
        "INSERT INTO articles (author_id, category_id, title, price, content)
         VALUES ($1, $2, 'Artículo de prueba', $3, 'Contenido') RETURNING id",
    )
    .bind(author)
    .bind(category)
    .bind(price)
    .fetch_one(pool)
    .await
    .unwrap()
}
