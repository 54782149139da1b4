use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use super::{MailQueue, TemplateProvider};
use crate::model::mail::{MailTemplate, OutgoingMail};
use crate::repository::RepositoryError;

#[derive(Default)]
pub struct InMemoryMailStore {
    templates: RwLock<HashMap<String, MailTemplate>>,
    queue: RwLock<Vec<OutgoingMail>>,
    fail_enqueue: AtomicBool,
}

impl InMemoryMailStore {
    pub fn add_template(&self, key: &str, subject: &str, body_html: &str) {
        self.templates.write().expect("templates poisoned").insert(
            key.to_string(),
            MailTemplate {
                template_key: key.to_string(),
                subject: subject.to_string(),
                body_html: body_html.to_string(),
            },
        );
    }

    pub fn fail_enqueue(&self, fail: bool) {
        self.fail_enqueue.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.queue.read().expect("queue poisoned").clone()
    }

    pub fn take_sent(&self) -> Vec<OutgoingMail> {
        std::mem::take(&mut *self.queue.write().expect("queue poisoned"))
    }
}

#[async_trait]
impl TemplateProvider for InMemoryMailStore {
    async fn find_template(&self, key: &str) -> Result<Option<MailTemplate>, RepositoryError> {
        Ok(self.templates.read().expect("templates poisoned").get(key).cloned())
    }
}

#[async_trait]
impl MailQueue for InMemoryMailStore {
    async fn enqueue(&self, mail: OutgoingMail) -> Result<u64, RepositoryError> {
        if self.fail_enqueue.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut queue = self.queue.write().expect("queue poisoned");
        queue.push(mail);
        Ok(queue.len() as u64)
    }
}
