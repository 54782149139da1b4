use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub api_prefix: String,

    // Rate limiting
    pub rate_protected_per_min: u32,
    pub rate_view_per_min: u32,

    // Notifications
    pub mail_from: String,
    /// Key of the HMAC view and approval tokens
    pub approval_secret: String,
    /// Base of the links embedded in approver emails
    pub public_base_url: String,
    pub template_cache_ttl_secs: u64,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn or_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            api_prefix: or_default("API_PREFIX", "/api".to_string())?,

            rate_protected_per_min: or_default("RATE_PROTECTED_PER_MIN", 1000)?,
            rate_view_per_min: or_default("RATE_VIEW_PER_MIN", 120)?,

            mail_from: or_default("MAIL_FROM", "noreply@company.com".to_string())?,
            approval_secret: or_default("APPROVAL_SECRET", "default-secret-key".to_string())?,
            public_base_url: or_default(
                "PUBLIC_BASE_URL",
                "http://localhost:8080".to_string(),
            )?,
            template_cache_ttl_secs: or_default("TEMPLATE_CACHE_TTL_SECS", 300)?,
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: "mysql://unused".into(),
            jwt_secret: "test-jwt-secret".into(),
            server_addr: "127.0.0.1:0".into(),
            api_prefix: "/api".into(),
            rate_protected_per_min: 1000,
            rate_view_per_min: 1000,
            mail_from: "noreply@company.com".into(),
            approval_secret: "test-secret".into(),
            public_base_url: "http://hr.test".into(),
            template_cache_ttl_secs: 60,
        }
    }
}
