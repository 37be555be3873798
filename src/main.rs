mod config;
mod db;
mod handlers;
mod mail;
mod models;
mod payment;
mod routes;
mod state;
mod utils;

#[cfg(test)]
mod test_support;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    config::Config,
    mail::{LogMailer, Mailer, SmtpMailer},
    payment::StripeGateway,
    state::AppState,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Configuración inválida: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match db::init_db(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Error al conectar a la Base de Datos. ¿Está corriendo Postgres? {:?}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("✅ Conexión a Postgres exitosa");

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => match SmtpMailer::new(smtp, &config.mail_from) {
            Ok(m) => Arc::new(m),
            Err(e) => {
                tracing::error!("Configuración SMTP inválida: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            tracing::warn!("SMTP_HOST no definido: los correos solo se escriben en el log");
            Arc::new(LogMailer)
        }
    };

    let payments = Arc::new(StripeGateway::new(
        config.stripe_api_base.clone(),
        config.stripe_secret_key.clone(),
    ));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    let state = AppState {
        pool,
        config: Arc::new(config),
        payments,
        mailer,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::create_routes(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    tracing::info!("🚀 Blog corriendo en http://{}", addr);

    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Fallo al enlazar el puerto {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("El servidor terminó con error: {}", e);
    }
}
