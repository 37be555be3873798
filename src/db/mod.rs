use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::config::Config;

// Alias para "Pool<Postgres>"
pub type DbPool = Pool<Postgres>;

pub async fn init_db(config: &Config) -> Result<DbPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;

    // Aplicamos las migraciones pendientes antes de aceptar tráfico
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
