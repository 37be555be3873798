use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} no está definido en .env")]
    Missing(&'static str),
    #[error("valor inválido para {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

// Toda la configuración sale de variables de entorno (.env en desarrollo)
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub port: u16,
    pub site_url: String,
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    pub activation_timeout_seconds: i64,
    pub password_reset_timeout_seconds: i64,
    pub stripe_secret_key: String,
    pub stripe_public_key: Option<String>,
    pub stripe_api_base: String,
    pub payment_currency: String,
    pub smtp: Option<SmtpConfig>,
    pub mail_from: String,
    pub contact_recipient: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_map(vars: &HashMap<&str, &str>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let mail_from = get("MAIL_FROM").unwrap_or_else(|| "no-reply@localhost".to_string());
        let smtp = get("SMTP_HOST").map(|host| SmtpConfig {
            host,
            username: get("SMTP_USERNAME"),
            password: get("SMTP_PASSWORD"),
        });

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            db_max_connections: parse_or(get("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", 5)?,
            port: parse_or(get("PORT"), "PORT", 3000)?,
            site_url: get("SITE_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            jwt_secret: required("JWT_SECRET")?,
            session_ttl_hours: parse_or(get("SESSION_TTL_HOURS"), "SESSION_TTL_HOURS", 24)?,
            activation_timeout_seconds: parse_or(
                get("ACTIVATION_TIMEOUT_SECONDS"),
                "ACTIVATION_TIMEOUT_SECONDS",
                60 * 60 * 24,
            )?,
            password_reset_timeout_seconds: parse_or(
                get("PASSWORD_RESET_TIMEOUT_SECONDS"),
                "PASSWORD_RESET_TIMEOUT_SECONDS",
                60 * 60 * 24 * 3,
            )?,
            stripe_secret_key: required("STRIPE_SECRET_KEY")?,
            stripe_public_key: get("STRIPE_PUBLIC_KEY"),
            stripe_api_base: get("STRIPE_API_BASE")
                .unwrap_or_else(|| "https://api.stripe.com".to_string())
                .trim_end_matches('/')
                .to_string(),
            payment_currency: get("PAYMENT_CURRENCY")
                .unwrap_or_else(|| "jpy".to_string())
                .to_lowercase(),
            smtp,
            contact_recipient: get("CONTACT_RECIPIENT").unwrap_or_else(|| mail_from.clone()),
            mail_from,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    raw: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
