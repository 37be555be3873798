use std::sync::Arc;

use axum::extract::FromRef;

use crate::{config::Config, db::DbPool, mail::Mailer, payment::PaymentGateway};

// Estado compartido por todos los handlers; se construye una vez en main
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
    pub payments: Arc<dyn PaymentGateway>,
    pub mailer: Arc<dyn Mailer>,
}

// Los handlers que solo tocan la base de datos siguen pidiendo State<DbPool>
impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl AppState {
    // Enlace absoluto hacia una ruta de la API, para los correos
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{}", self.config.site_url, path)
    }
}
