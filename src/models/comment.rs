use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{is_valid_email, ValidationErrors};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Comment {
    pub id: i64,
    pub article_id: i64,
    pub author: String,
    pub text: String,
    #[serde(skip)] // solo para avisar de respuestas, nunca se muestra
    pub notify_email: Option<String>,
    #[serde(skip)]
    pub useremail: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub const COMMENT_COLUMNS: &str = "id, article_id, author, text, notify_email, useremail, created_at";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Reply {
    pub id: i64,
    pub comment_id: i64,
    pub author: String,
    #[serde(skip)]
    pub authority: Option<String>,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

pub const REPLY_COLUMNS: &str = "id, comment_id, author, authority, text, created_at";

// Comentario con sus respuestas, tal como se muestra bajo el artículo
#[derive(Debug, Serialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<Reply>,
}

// Agrupa respuestas bajo su comentario conservando el orden de ambos listados
pub fn build_threads(comments: Vec<Comment>, replies: Vec<Reply>) -> Vec<CommentThread> {
    let mut threads: Vec<CommentThread> = comments
        .into_iter()
        .map(|comment| CommentThread { comment, replies: Vec::new() })
        .collect();

    for reply in replies {
        if let Some(thread) = threads.iter_mut().find(|t| t.comment.id == reply.comment_id) {
            thread.replies.push(reply);
        }
    }

    threads
}

// El dueño es quien tenga exactamente el mismo email que el marcador guardado
pub fn is_owner(marker: Option<&str>, requester_email: &str) -> bool {
    matches!(marker, Some(m) if m == requester_email)
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentSchema {
    pub author: String,
    pub text: String,
    pub notify_email: Option<String>,
}

impl CreateCommentSchema {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        check_author_and_text(&mut errors, &self.author, &self.text);
        if let Some(email) = self.notify_email.as_deref().filter(|e| !e.trim().is_empty()) {
            if !is_valid_email(email) {
                errors.add("notify_email", "Email inválido");
            }
        }
        errors.into_result()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateReplySchema {
    pub author: String,
    pub text: String,
}

impl CreateReplySchema {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        check_author_and_text(&mut errors, &self.author, &self.text);
        errors.into_result()
    }
}

fn check_author_and_text(errors: &mut ValidationErrors, author: &str, text: &str) {
    let len = author.trim().chars().count();
    if len == 0 || len > 50 {
        errors.add("author", "El nombre debe tener entre 1 y 50 caracteres");
    }
    if text.trim().is_empty() {
        errors.add("text", "El texto es obligatorio");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(id: i64) -> Comment {
        Comment {
            id,
            article_id: 1,
            author: "Ana".into(),
            text: format!("comentario {id}"),
            notify_email: None,
            useremail: Some("a@example.com".into()),
            created_at: Utc::now(),
        }
    }

    fn reply(id: i64, comment_id: i64) -> Reply {
        Reply {
            id,
            comment_id,
            author: "Bea".into(),
            authority: Some("b@example.com".into()),
            text: "respuesta".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn replies_are_attached_to_their_comment() {
        let threads = build_threads(
            vec![comment(2), comment(1)],
            vec![reply(10, 1), reply(11, 2), reply(12, 1), reply(13, 99)],
        );
        assert_eq!(threads[0].comment.id, 2);
        assert_eq!(threads[0].replies.len(), 1);
        let ids: Vec<i64> = threads[1].replies.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![10, 12]);
    }

    #[test]
    fn ownership_requires_exact_match() {
        assert!(is_owner(Some("a@example.com"), "a@example.com"));
        assert!(!is_owner(Some("a@example.com"), "b@example.com"));
        assert!(!is_owner(None, "a@example.com"));
    }

    #[test]
    fn comment_payload_checks_optional_email() {
        let ok = CreateCommentSchema {
            author: "Ana".into(),
            text: "hola".into(),
            notify_email: Some("".into()),
        };
        assert!(ok.validate().is_ok());

        let bad = CreateCommentSchema {
            author: "".into(),
            text: " ".into(),
            notify_email: Some("nope".into()),
        };
        assert_eq!(bad.validate().unwrap_err().fields.len(), 3);
    }
}
