//! Tokens firmados de un propósito concreto (activación de cuenta y
//! recuperación de contraseña). Son JWT HS256 con un claim `purpose`, así un
//! token de activación nunca sirve como sesión ni al revés.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("la firma del token expiró")]
    Expired,
    #[error("la firma del token no es válida")]
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    Activation,
    PasswordReset,
}

impl TokenPurpose {
    fn as_str(self) -> &'static str {
        match self {
            TokenPurpose::Activation => "activation",
            TokenPurpose::PasswordReset => "password_reset",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PurposeClaims {
    purpose: String,
    user_id: i64,
    iat: i64,
    exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stamp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub user_id: i64,
    pub issued_at: DateTime<Utc>,
    // Marca opcional que el emisor quiere ver intacta al canjear
    pub stamp: Option<i64>,
}

pub fn sign(
    purpose: TokenPurpose,
    user_id: i64,
    stamp: Option<i64>,
    secret: &str,
    issued_at: DateTime<Utc>,
    max_age_seconds: i64,
) -> Result<String, TokenError> {
    let iat = issued_at.timestamp();
    let claims = PurposeClaims {
        purpose: purpose.as_str().to_string(),
        user_id,
        iat,
        exp: iat + max_age_seconds,
        stamp,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!("Error firmando token: {:?}", e);
        TokenError::Invalid
    })
}

/// Verifica firma y propósito, y rechaza el token si desde su emisión han
/// pasado más de `max_age_seconds` en `now`.
pub fn verify(
    token: &str,
    purpose: TokenPurpose,
    secret: &str,
    max_age_seconds: i64,
    now: DateTime<Utc>,
) -> Result<VerifiedToken, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    // La antigüedad se mide abajo contra el timeout vigente, sin margen
    validation.validate_exp = false;
    validation.leeway = 0;

    let data = decode::<PurposeClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| TokenError::Invalid)?;
    let claims = data.claims;

    if claims.purpose != purpose.as_str() {
        return Err(TokenError::Invalid);
    }
    if now.timestamp() - claims.iat > max_age_seconds {
        return Err(TokenError::Expired);
    }

    let issued_at = Utc
        .timestamp_opt(claims.iat, 0)
        .single()
        .ok_or(TokenError::Invalid)?;

    Ok(VerifiedToken {
        user_id: claims.user_id,
        issued_at,
        stamp: claims.stamp,
    })
}
