use async_trait::async_trait;
use sqlx::MySqlPool;

use super::{MailQueue, TemplateProvider};
use crate::model::mail::{MailTemplate, OutgoingMail};
use crate::repository::RepositoryError;

/// `mail_templates` and `mail_queue` tables.
#[derive(Clone)]
pub struct MySqlMailStore {
    pool: MySqlPool,
}

impl MySqlMailStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TemplateProvider for MySqlMailStore {
    async fn find_template(&self, key: &str) -> Result<Option<MailTemplate>, RepositoryError> {
        let template = sqlx::query_as::<_, MailTemplate>(
            "SELECT template_key, subject, body_html FROM mail_templates WHERE template_key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(template)
    }
}

#[async_trait]
impl MailQueue for MySqlMailStore {
    async fn enqueue(&self, mail: OutgoingMail) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r#"
            INSERT INTO mail_queue (email_from, email_to, subject, body_html, state)
            VALUES (?, ?, ?, ?, 'outgoing')
            "#,
        )
        .bind(&mail.email_from)
        .bind(&mail.email_to)
        .bind(&mail.subject)
        .bind(&mail.body_html)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_id())
    }
}
