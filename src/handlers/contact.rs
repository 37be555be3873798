use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    mail::{self, MailError},
    models::{is_valid_email, ValidationErrors},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ContactPayload {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl ContactPayload {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let name_len = self.name.trim().chars().count();
        if name_len == 0 || name_len > 100 {
            errors.add("name", "El nombre debe tener entre 1 y 100 caracteres");
        }
        if !is_valid_email(&self.email) {
            errors.add("email", "Email inválido");
        }
        let subject_len = self.subject.trim().chars().count();
        if subject_len == 0 || subject_len > 100 {
            errors.add("subject", "El asunto debe tener entre 1 y 100 caracteres");
        }
        if self.message.trim().is_empty() {
            errors.add("message", "El mensaje es obligatorio");
        }
        errors.into_result()
    }
}

// POST /api/contact - formulario público de contacto
pub async fn contact_handler(
    State(state): State<AppState>,
    Json(body): Json<ContactPayload>,
) -> impl IntoResponse {
    if let Err(errors) = body.validate() {
        return errors.into_response();
    }

    let outgoing = mail::contact_mail(
        &state.config.contact_recipient,
        body.name.trim(),
        body.email.trim(),
        body.subject.trim(),
        &body.message,
    );

    match state.mailer.send(outgoing).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "Tu consulta se envió correctamente" })),
        )
            .into_response(),
        Err(MailError::InvalidHeader(_)) => {
            (StatusCode::BAD_REQUEST, "Cabecera inválida detectada").into_response()
        }
        Err(e) => {
            tracing::error!("Error enviando formulario de contacto: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "No se pudo enviar el mensaje").into_response()
        }
    }
}
