//! Cobros con tarjeta contra el procesador externo (API de cargos de Stripe).
//!
//! Un intento de cobro es exactamente una petición HTTP: no se envía clave de
//! idempotencia ni se reintenta. Si el cliente repite la petición tras un
//! error de red, puede producirse un cargo duplicado.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChargeRequest {
    pub amount: i64, // unidad mínima de la moneda
    pub currency: String,
    pub source: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Charge {
    pub id: String,
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("tarjeta rechazada: {0}")]
    CardDeclined(String),
    #[error("el procesador rechazó el cargo ({status}): {message}")]
    Processor { status: u16, message: String },
    #[error("fallo de comunicación con el procesador: {0}")]
    Transport(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_charge(&self, request: &ChargeRequest) -> Result<Charge, PaymentError>;
}

pub struct StripeGateway {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(api_base: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into(),
            secret_key: secret_key.into(),
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_charge(&self, request: &ChargeRequest) -> Result<Charge, PaymentError> {
        let url = format!("{}/v1/charges", self.api_base);
        let amount = request.amount.to_string();
        let params = [
            ("amount", amount.as_str()),
            ("currency", request.currency.as_str()),
            ("source", request.source.as_str()),
            ("description", request.description.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&params)
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        interpret_charge_response(status, &body)
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    #[serde(rename = "type")]
    kind: Option<String>,
    message: Option<String>,
}

// Traduce la respuesta HTTP del procesador a un cargo o a un error tipado
fn interpret_charge_response(status: u16, body: &str) -> Result<Charge, PaymentError> {
    if (200..300).contains(&status) {
        return serde_json::from_str::<Charge>(body).map_err(|e| PaymentError::Processor {
            status,
            message: format!("respuesta ilegible: {e}"),
        });
    }

    let parsed = serde_json::from_str::<StripeErrorEnvelope>(body).ok();
    let kind = parsed.as_ref().and_then(|p| p.error.kind.clone());
    let message = parsed
        .and_then(|p| p.error.message)
        .unwrap_or_else(|| format!("HTTP {status}"));

    if status == 402 || kind.as_deref() == Some("card_error") {
        Err(PaymentError::CardDeclined(message))
    } else {
        Err(PaymentError::Processor { status, message })
    }
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, Copy)]
    pub enum Behaviour {
        Approve,
        Decline,
        Fail,
    }

    // Procesador de mentira que guarda cada intento de cobro
    pub struct RecordingGateway {
        behaviour: Behaviour,
        pub attempts: Mutex<Vec<ChargeRequest>>,
    }

    impl RecordingGateway {
        pub fn new(behaviour: Behaviour) -> Self {
            Self {
                behaviour,
                attempts: Mutex::new(Vec::new()),
            }
        }

        pub fn attempts(&self) -> Vec<ChargeRequest> {
            self.attempts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PaymentGateway for RecordingGateway {
        async fn create_charge(&self, request: &ChargeRequest) -> Result<Charge, PaymentError> {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.push(request.clone());
            match self.behaviour {
                Behaviour::Approve => Ok(Charge {
                    id: format!("ch_test_{}", attempts.len()),
                }),
                Behaviour::Decline => Err(PaymentError::CardDeclined("Your card was declined.".into())),
                Behaviour::Fail => Err(PaymentError::Processor {
                    status: 500,
                    message: "api_error".into(),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_yields_charge_id() {
        let charge = interpret_charge_response(200, r#"{"id":"ch_123","object":"charge"}"#).unwrap();
        assert_eq!(charge.id, "ch_123");
    }

    #[test]
    fn card_error_is_a_decline() {
        let body = r#"{"error":{"type":"card_error","code":"card_declined","message":"Your card was declined."}}"#;
        match interpret_charge_response(402, body) {
            Err(PaymentError::CardDeclined(msg)) => assert_eq!(msg, "Your card was declined."),
            other => panic!("esperaba rechazo, llegó {other:?}"),
        }
    }

    #[test]
    fn other_failures_are_processor_errors() {
        let body = r#"{"error":{"type":"invalid_request_error","message":"No such token"}}"#;
        assert!(matches!(
            interpret_charge_response(400, body),
            Err(PaymentError::Processor { status: 400, .. })
        ));
        assert!(matches!(
            interpret_charge_response(500, "<html>"),
            Err(PaymentError::Processor { status: 500, .. })
        ));
    }

    #[test]
    fn garbage_success_body_is_not_a_charge() {
        assert!(interpret_charge_response(200, "{}").is_err());
    }
}
