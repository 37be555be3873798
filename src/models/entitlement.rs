use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Un pago exitoso: el usuario desbloqueó el artículo con ese cargo
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Entitlement {
    pub id: i64,
    pub article_id: i64,
    pub user_id: i64,
    pub charge_id: String,
    pub created_at: DateTime<Utc>,
}

pub const ENTITLEMENT_COLUMNS: &str = "id, article_id, user_id, charge_id, created_at";

// Token de un solo uso emitido por el procesador en el navegador
#[derive(Debug, Deserialize)]
pub struct CheckoutPayload {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutSuccess {
    pub message: String,
    pub redirect_to: String,
    pub entitlement: Entitlement,
}
