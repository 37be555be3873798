use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use serde::Serialize;
use serde_json::json;

use crate::{
    db::DbPool,
    handlers::article::{find_article, load_article_detail},
    models::{
        article::{Article, ArticleDetail},
        entitlement::{CheckoutPayload, CheckoutSuccess, Entitlement, ENTITLEMENT_COLUMNS},
        user::Claims,
    },
    payment::{Charge, ChargeRequest, PaymentError, PaymentGateway},
    state::AppState,
};

pub const DECLINE_MESSAGE: &str = "No se pudo completar el pago: la tarjeta fue rechazada";

#[derive(Debug)]
pub enum CheckoutOutcome {
    Charged(Charge),
    Declined(String),
}

// Respuesta de un pago rechazado: la misma vista del artículo más el aviso
#[derive(Debug, Serialize)]
struct DeclinedView {
    #[serde(flatten)]
    detail: ArticleDetail,
    message: &'static str,
}

// El cargo queda etiquetado con el email del comprador y el título para auditoría
pub fn charge_request_for(article: &Article, user_email: &str, currency: &str, token: &str) -> ChargeRequest {
    ChargeRequest {
        amount: i64::from(article.price),
        currency: currency.to_string(),
        source: token.to_string(),
        description: format!("email: {} artículo: {}", user_email, article.title),
    }
}

// Un único intento; solo el rechazo de tarjeta es un resultado "normal"
pub async fn attempt_charge(
    gateway: &dyn PaymentGateway,
    request: &ChargeRequest,
) -> Result<CheckoutOutcome, PaymentError> {
    match gateway.create_charge(request).await {
        Ok(charge) => Ok(CheckoutOutcome::Charged(charge)),
        Err(PaymentError::CardDeclined(reason)) => Ok(CheckoutOutcome::Declined(reason)),
        Err(e) => Err(e),
    }
}

pub async fn record_entitlement(
    pool: &DbPool,
    article_id: i64,
    user_id: i64,
    charge_id: &str,
) -> Result<Entitlement, sqlx::Error> {
    sqlx::query_as::<_, Entitlement>(&format!(
        "INSERT INTO entitlements (article_id, user_id, charge_id) VALUES ($1, $2, $3) RETURNING {ENTITLEMENT_COLUMNS}"
    ))
    .bind(article_id)
    .bind(user_id)
    .bind(charge_id)
    .fetch_one(pool)
    .await
}

// POST /api/articles/:id/checkout
// Si el proceso muere entre el cobro y el INSERT, el cargo queda sin registro.
pub async fn checkout_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CheckoutPayload>,
) -> impl IntoResponse {
    let token = payload.token.trim();
    if token.is_empty() {
        return (StatusCode::BAD_REQUEST, "Falta el token de pago").into_response();
    }

    let article = match find_article(&state.pool, id).await {
        Ok(Some(a)) => a,
        Ok(None) => return (StatusCode::NOT_FOUND, "Artículo no encontrado").into_response(),
        Err(e) => {
            tracing::error!("Error buscando artículo {}: {:?}", id, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error interno").into_response();
        }
    };

    let request = charge_request_for(&article, &claims.sub, &state.config.payment_currency, token);

    match attempt_charge(state.payments.as_ref(), &request).await {
        Ok(CheckoutOutcome::Charged(charge)) => {
            match record_entitlement(&state.pool, article.id, claims.user_id, &charge.id).await {
                Ok(entitlement) => {
                    tracing::info!(
                        article_id = article.id,
                        user_id = claims.user_id,
                        charge_id = %charge.id,
                        "Pago completado"
                    );
                    (
                        StatusCode::CREATED,
                        Json(CheckoutSuccess {
                            message: "Pago completado".to_string(),
                            redirect_to: "/".to_string(),
                            entitlement,
                        }),
                    )
                        .into_response()
                }
                Err(e) => {
                    tracing::error!(
                        "Cargo {} cobrado pero no se pudo registrar (artículo {}, usuario {}): {:?}",
                        charge.id,
                        article.id,
                        claims.user_id,
                        e
                    );
                    (StatusCode::INTERNAL_SERVER_ERROR, "Error interno").into_response()
                }
            }
        }
        Ok(CheckoutOutcome::Declined(reason)) => {
            tracing::warn!(article_id = article.id, user_id = claims.user_id, "Tarjeta rechazada: {}", reason);
            match load_article_detail(&state.pool, id, state.config.stripe_public_key.clone()).await {
                Ok(Some(detail)) => (
                    StatusCode::PAYMENT_REQUIRED,
                    Json(DeclinedView {
                        detail,
                        message: DECLINE_MESSAGE,
                    }),
                )
                    .into_response(),
                Ok(None) => (StatusCode::NOT_FOUND, "Artículo no encontrado").into_response(),
                Err(e) => {
                    tracing::error!("Error cargando artículo {}: {:?}", id, e);
                    (StatusCode::INTERNAL_SERVER_ERROR, "Error interno").into_response()
                }
            }
        }
        Err(e) => {
            tracing::error!("Error del procesador de pagos: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error interno").into_response()
        }
    }
}

// GET /api/articles/:id/access - ¿el usuario ya desbloqueó este artículo?
pub async fn access_handler(
    Path(id): Path<i64>,
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    match find_article(&pool, id).await {
        Ok(Some(_)) => {}
        Ok(None) => return (StatusCode::NOT_FOUND, "Artículo no encontrado").into_response(),
        Err(e) => {
            tracing::error!("Error buscando artículo {}: {:?}", id, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error interno").into_response();
        }
    }

    let unlocked = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM entitlements WHERE article_id = $1 AND user_id = $2)",
    )
    .bind(id)
    .bind(claims.user_id)
    .fetch_one(&pool)
    .await;

    match unlocked {
        Ok(unlocked) => (StatusCode::OK, Json(json!({ "unlocked": unlocked }))).into_response(),
        Err(e) => {
            tracing::error!("Error consultando pagos: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error interno").into_response()
        }
    }
}
