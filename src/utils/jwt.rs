use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    models::user::{Claims, User},
    state::AppState,
};

// Emite el token de sesión (Bearer) tras un login correcto
pub fn issue_session_token(
    user: &User,
    secret: &str,
    now: DateTime<Utc>,
    ttl_hours: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: user.email.clone(),
        exp: (now + Duration::hours(ttl_hours)).timestamp() as usize,
        iat: now.timestamp() as usize,
        user_id: user.id,
        is_superuser: user.is_superuser,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn decode_session_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

// Se ejecuta ANTES de cualquier handler que necesite usuario autenticado
pub async fn auth_middleware(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let TypedHeader(auth) = auth.ok_or(StatusCode::UNAUTHORIZED)?;

    match decode_session_token(auth.token(), &state.config.jwt_secret) {
        Ok(claims) => {
            // Adjuntamos claims para que los handlers sepan quién es el usuario
            request.extensions_mut().insert(claims);
            Ok(next.run(request).await)
        }
        // Token falso, expirado o manipulado
        Err(_) => Err(StatusCode::UNAUTHORIZED),
    }
}

pub async fn superuser_middleware(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let TypedHeader(auth) = auth.ok_or(StatusCode::UNAUTHORIZED)?;

    match decode_session_token(auth.token(), &state.config.jwt_secret) {
        Ok(claims) if claims.is_superuser => {
            request.extensions_mut().insert(claims);
            Ok(next.run(request).await)
        }
        // Usuario normal: 403 (Prohibido)
        Ok(_) => Err(StatusCode::FORBIDDEN),
        Err(_) => Err(StatusCode::UNAUTHORIZED),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(is_superuser: bool) -> User {
        let now = Utc::now();
        User {
            id: 5,
            email: "a@example.com".into(),
            name: "Ana".into(),
            password_hash: String::new(),
            is_active: true,
            is_staff: is_superuser,
            is_superuser,
            date_joined: now,
            password_changed_at: now,
        }
    }

    #[test]
    fn session_token_carries_identity() {
        let token = issue_session_token(&user(true), "s", Utc::now(), 24).unwrap();
        let claims = decode_session_token(&token, "s").unwrap();
        assert_eq!(claims.user_id, 5);
        assert_eq!(claims.sub, "a@example.com");
        assert!(claims.is_superuser);
    }

    #[test]
    fn expired_session_is_rejected() {
        let issued = Utc::now() - Duration::hours(48);
        let token = issue_session_token(&user(false), "s", issued, 24).unwrap();
        assert!(decode_session_token(&token, "s").is_err());
    }
}
