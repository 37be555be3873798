//! Envío de correos transaccionales: activación, recuperación de contraseña,
//! aviso de respuestas y formulario de contacto.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;

use crate::config::SmtpConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub reply_to: Option<String>,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("cabecera inválida: {0}")]
    InvalidHeader(String),
    #[error("dirección inválida: {0}")]
    InvalidAddress(String),
    #[error("fallo enviando correo: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

// Un salto de línea en el asunto permitiría inyectar cabeceras
fn check_headers(mail: &OutgoingMail) -> Result<(), MailError> {
    let fields = [Some(&mail.to), Some(&mail.subject), mail.reply_to.as_ref()];
    for value in fields.into_iter().flatten() {
        if value.contains('\r') || value.contains('\n') {
            return Err(MailError::InvalidHeader(value.clone()));
        }
    }
    Ok(())
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(smtp: &SmtpConfig, from: &str) -> Result<Self, MailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
            .map_err(|e| MailError::Transport(e.to_string()))?;
        if let (Some(user), Some(password)) = (&smtp.username, &smtp.password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from: parse_mailbox(from)?,
        })
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| MailError::InvalidAddress(format!("{address}: {e}")))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        check_headers(&mail)?;

        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(&mail.to)?)
            .subject(mail.subject)
            .header(ContentType::TEXT_PLAIN);
        if let Some(reply_to) = &mail.reply_to {
            builder = builder.reply_to(parse_mailbox(reply_to)?);
        }
        let message = builder
            .body(mail.body)
            .map_err(|e| MailError::InvalidHeader(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(())
    }
}

// Sin SMTP configurado los correos solo se escriben en el log (desarrollo)
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        check_headers(&mail)?;
        tracing::info!(
            to = %mail.to,
            subject = %mail.subject,
            reply_to = ?mail.reply_to,
            "📧 Correo (sin SMTP):\n{}",
            mail.body
        );
        Ok(())
    }
}

pub fn activation_mail(to: &str, name: &str, link: &str, timeout_seconds: i64) -> OutgoingMail {
    OutgoingMail {
        to: to.to_string(),
        subject: "Confirma tu registro".to_string(),
        body: format!(
            "Hola {}:\n\nGracias por registrarte. Abre este enlace para activar tu cuenta:\n\n{}\n\nEl enlace caduca en {}.\n",
            display_name(name, to),
            link,
            describe_timeout(timeout_seconds)
        ),
        reply_to: None,
    }
}

// "24 horas", "30 minutos"... en la unidad más grande que lo divide exacto
fn describe_timeout(seconds: i64) -> String {
    let plural = |n: i64, one: &str, many: &str| {
        if n == 1 { format!("1 {one}") } else { format!("{n} {many}") }
    };
    match seconds {
        s if s > 0 && s % 86400 == 0 => plural(s / 86400, "día", "días"),
        s if s > 0 && s % 3600 == 0 => plural(s / 3600, "hora", "horas"),
        s if s > 0 && s % 60 == 0 => plural(s / 60, "minuto", "minutos"),
        s => plural(s, "segundo", "segundos"),
    }
}

pub fn password_reset_mail(to: &str, name: &str, link: &str) -> OutgoingMail {
    OutgoingMail {
        to: to.to_string(),
        subject: "Restablece tu contraseña".to_string(),
        body: format!(
            "Hola {}:\n\nPara elegir una nueva contraseña abre este enlace:\n\n{}\n\nSi no lo pediste, ignora este correo.\n",
            display_name(name, to),
            link
        ),
        reply_to: None,
    }
}

pub fn reply_notification_mail(to: &str, article_title: &str, reply_author: &str, link: &str) -> OutgoingMail {
    OutgoingMail {
        to: to.to_string(),
        subject: format!("Nueva respuesta en «{}»", single_line(article_title)),
        body: format!(
            "{} respondió a tu comentario en «{}».\n\n{}\n",
            reply_author, article_title, link
        ),
        reply_to: None,
    }
}

pub fn contact_mail(recipient: &str, name: &str, email: &str, subject: &str, message: &str) -> OutgoingMail {
    OutgoingMail {
        to: recipient.to_string(),
        subject: subject.to_string(),
        body: format!("De: {} <{}>\n\n{}\n", name, email, message),
        reply_to: Some(email.to_string()),
    }
}

fn display_name<'a>(name: &'a str, email: &'a str) -> &'a str {
    if name.trim().is_empty() {
        email
    } else {
        name
    }
}

fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<OutgoingMail>>,
    }

    impl RecordingMailer {
        pub fn sent(&self) -> Vec<OutgoingMail> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
            check_headers(&mail)?;
            self.sent.lock().unwrap().push(mail);
            Ok(())
        }
    }
}
