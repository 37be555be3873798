use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use super::{is_valid_email, ValidationErrors};

// Lo que guardamos en la base de datos
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    #[serde(skip)] // ¡Jamás envíes el hash de la contraseña en el JSON!
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
    #[serde(skip)]
    pub password_changed_at: DateTime<Utc>,
}

pub const USER_COLUMNS: &str =
    "id, email, name, password_hash, is_active, is_staff, is_superuser, date_joined, password_changed_at";

pub const MIN_PASSWORD_LEN: usize = 8;

impl User {
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    // Marca que cambia con cada contraseña nueva; invalida enlaces de recuperación viejos
    pub fn password_stamp(&self) -> i64 {
        self.password_changed_at.timestamp_micros()
    }
}

// Lo que recibimos para hacer Login
#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

// Registro público: el usuario queda pendiente hasta activar por email
#[derive(Debug, Deserialize)]
pub struct RegisterPayload {
    #[serde(default)]
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

impl RegisterPayload {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if !is_valid_email(&self.email) {
            errors.add("email", "Email inválido");
        }
        if self.name.chars().count() > 100 {
            errors.add("name", "Máximo 100 caracteres");
        }
        check_new_password(&mut errors, "password", &self.password, &self.password_confirm);
        errors.into_result()
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserPayload {
    pub name: String,
}

impl UpdateUserPayload {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.name.chars().count() > 100 {
            errors.add("name", "Máximo 100 caracteres");
        }
        errors.into_result()
    }
}

#[derive(Debug, Deserialize)]
pub struct PasswordChangePayload {
    pub old_password: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

impl PasswordChangePayload {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        check_new_password(
            &mut errors,
            "new_password",
            &self.new_password,
            &self.new_password_confirm,
        );
        errors.into_result()
    }
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequestPayload {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetConfirmPayload {
    pub new_password: String,
    pub new_password_confirm: String,
}

impl PasswordResetConfirmPayload {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        check_new_password(
            &mut errors,
            "new_password",
            &self.new_password,
            &self.new_password_confirm,
        );
        errors.into_result()
    }
}

fn check_new_password(errors: &mut ValidationErrors, field: &str, password: &str, confirm: &str) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(field, "La contraseña debe tener al menos 8 caracteres");
    }
    if password != confirm {
        errors.add(field, "Las contraseñas no coinciden");
    }
}

// Lo que devolvemos cuando el login es exitoso
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub token_type: String,
}

// Lo que viaja DENTRO del token de sesión (Claims)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // email del usuario
    pub exp: usize,
    pub iat: usize,
    pub user_id: i64,
    pub is_superuser: bool,
}
