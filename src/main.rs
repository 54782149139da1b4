use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod mail;
mod model;
mod models;
mod report;
mod repository;
mod routes;
#[cfg(test)]
mod testing;
mod utils;
mod workflow;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::mail::template_cache::warmup_template_cache;
use crate::mail::{CachedTemplateProvider, MySqlMailStore};
use crate::repository::MySqlRepository;
use crate::utils::token::TokenSigner;
use crate::workflow::LeaveService;
use crate::workflow::notifier::Notifier;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    if config.approval_secret == "default-secret-key" {
        warn!("APPROVAL_SECRET is not set, view links are signed with the default key");
    }

    let pool = init_db(&config.database_url).await?;

    let repository = Arc::new(MySqlRepository::new(pool.clone()));
    let mail_store = Arc::new(MySqlMailStore::new(pool.clone()));
    let templates = Arc::new(CachedTemplateProvider::new(
        mail_store.clone(),
        Duration::from_secs(config.template_cache_ttl_secs),
    ));
    let signer = TokenSigner::new(&config.approval_secret);

    let notifier = Notifier::new(
        repository.clone(),
        templates.clone(),
        mail_store,
        signer.clone(),
        config.mail_from.clone(),
        config.public_base_url.clone(),
    );
    let service = Data::new(LeaveService::new(
        repository.clone(),
        repository,
        notifier,
        signer,
    ));

    let pool_for_cache_warmup = pool.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = warmup_template_cache(&pool_for_cache_warmup, &templates, 50).await {
            error!(error = ?e, "Failed to warmup template cache");
        }
    });

    // Clone values for the closure (avoid move issues)
    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config.clone()))
            .app_data(service.clone())
            // View page + protected API with rate limiting
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
