//! Outbound mail seams: named templates and the mail queue.

use async_trait::async_trait;

use crate::model::mail::{MailTemplate, OutgoingMail};
use crate::repository::RepositoryError;

#[cfg(test)]
pub mod memory;
pub mod mysql;
pub mod template_cache;

pub use mysql::MySqlMailStore;
pub use template_cache::CachedTemplateProvider;

#[async_trait]
pub trait TemplateProvider: Send + Sync {
    /// `Ok(None)` when no template is registered under `key`.
    async fn find_template(&self, key: &str) -> Result<Option<MailTemplate>, RepositoryError>;
}

#[async_trait]
pub trait MailQueue: Send + Sync {
    /// Queues a message for delivery and returns its queue id.
    async fn enqueue(&self, mail: OutgoingMail) -> Result<u64, RepositoryError>;
}
