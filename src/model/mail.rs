use serde::{Deserialize, Serialize};

/// A named message template; `subject` and `body_html` use Tera syntax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MailTemplate {
    pub template_key: String,
    pub subject: String,
    pub body_html: String,
}

/// One message handed to the outbound mail queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMail {
    pub email_from: String,
    pub email_to: String,
    pub subject: String,
    pub body_html: String,
}
