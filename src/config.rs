use serde::Deserialize;

use crate::items::repo::FailurePolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Connection details for the hosted catalog table. URL and key are optional
/// on purpose: when either is missing the repository runs fallback-only.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub table: String,
    pub failure_policy: FailurePolicy,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub catalog: CatalogConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "curio".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "curio-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            refresh_ttl_minutes: std::env::var("JWT_REFRESH_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
        };
        let catalog = CatalogConfig {
            api_url: std::env::var("CATALOG_API_URL").ok(),
            api_key: std::env::var("CATALOG_API_KEY").ok(),
            table: std::env::var("CATALOG_TABLE").unwrap_or_else(|_| "items".into()),
            failure_policy: std::env::var("CATALOG_FAILURE_POLICY")
                .map(|v| FailurePolicy::from_env_value(&v))
                .unwrap_or_default(),
        };
        Ok(Self {
            database_url,
            jwt,
            catalog,
        })
    }
}
