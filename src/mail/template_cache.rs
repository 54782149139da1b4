use anyhow::Result;
use async_trait::async_trait;
use futures_util::StreamExt;
use moka::future::Cache;
use sqlx::MySqlPool;
use std::sync::Arc;
use std::time::Duration;

use super::TemplateProvider;
use crate::model::mail::MailTemplate;
use crate::repository::RepositoryError;

/// Memoizes template lookups, misses included, for the configured TTL.
/// Lookup errors are never cached.
pub struct CachedTemplateProvider {
    inner: Arc<dyn TemplateProvider>,
    cache: Cache<String, Option<MailTemplate>>,
}

impl CachedTemplateProvider {
    pub fn new(inner: Arc<dyn TemplateProvider>, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Cache::builder()
                .max_capacity(1_000)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Batch insert already-loaded templates
    async fn batch_insert(&self, templates: &[MailTemplate]) {
        let futures: Vec<_> = templates
            .iter()
            .map(|t| self.cache.insert(t.template_key.clone(), Some(t.clone())))
            .collect();

        futures::future::join_all(futures).await;
    }
}

#[async_trait]
impl TemplateProvider for CachedTemplateProvider {
    async fn find_template(&self, key: &str) -> Result<Option<MailTemplate>, RepositoryError> {
        if let Some(hit) = self.cache.get(key).await {
            return Ok(hit);
        }

        let found = self.inner.find_template(key).await?;
        self.cache.insert(key.to_string(), found.clone()).await;
        Ok(found)
    }
}

/// Load every stored template into the cache (streamed, batched)
pub async fn warmup_template_cache(
    pool: &MySqlPool,
    cache: &CachedTemplateProvider,
    batch_size: usize,
) -> Result<()> {
    let mut stream = sqlx::query_as::<_, MailTemplate>(
        "SELECT template_key, subject, body_html FROM mail_templates",
    )
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total_count = 0usize;

    while let Some(row) = stream.next().await {
        batch.push(row?);
        total_count += 1;

        if batch.len() >= batch_size {
            cache.batch_insert(&batch).await;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        cache.batch_insert(&batch).await;
    }

    log::info!("Template cache warmup complete: {} templates", total_count);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::memory::InMemoryMailStore;

    #[actix_web::test]
    async fn serves_cached_template_until_reloaded() {
        let store = Arc::new(InMemoryMailStore::default());
        store.add_template("leave_refusal", "Refused v1", "<p>v1</p>");
        let cached = CachedTemplateProvider::new(store.clone(), Duration::from_secs(60));

        let first = cached.find_template("leave_refusal").await.unwrap().unwrap();
        assert_eq!(first.subject, "Refused v1");

        store.add_template("leave_refusal", "Refused v2", "<p>v2</p>");
        let again = cached.find_template("leave_refusal").await.unwrap().unwrap();
        assert_eq!(again.subject, "Refused v1");

        let reloaded = CachedTemplateProvider::new(store.clone(), Duration::from_secs(60));
        let fresh = reloaded.find_template("leave_refusal").await.unwrap().unwrap();
        assert_eq!(fresh.subject, "Refused v2");
    }

    #[actix_web::test]
    async fn remembers_missing_templates() {
        let store = Arc::new(InMemoryMailStore::default());
        let cached = CachedTemplateProvider::new(store.clone(), Duration::from_secs(60));

        assert!(cached.find_template("leave_cancelled").await.unwrap().is_none());
        store.add_template("leave_cancelled", "Cancelled", "<p>x</p>");
        assert!(cached.find_template("leave_cancelled").await.unwrap().is_none());
    }
}
