use std::env;

use anyhow::Context;

/// One year.
const MAX_TOKEN_LIFETIME_SECS: i64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub allow_admin_signup: bool,
    pub max_body_bytes: usize,
    pub concurrency_limit: usize,
}

/// Token signing settings shared by the login service and the auth extractor.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub expiry_seconds: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_var("APP_PORT", 3000u16)?;

        let jwt = JwtConfig {
            secret: env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "smart-canteen".to_string()),
            audience: env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "smart-canteen-clients".to_string()),
            expiry_seconds: parse_var("JWT_EXPIRY_SECONDS", 3600i64)?,
        };
        if !(1..=MAX_TOKEN_LIFETIME_SECS).contains(&jwt.expiry_seconds) {
            anyhow::bail!("JWT_EXPIRY_SECONDS must be between 1 and {MAX_TOKEN_LIFETIME_SECS}");
        }

        Ok(Self {
            database_url,
            host,
            port,
            jwt,
            allow_admin_signup: parse_var("ALLOW_ADMIN_SIGNUP", false)?,
            max_body_bytes: parse_var("MAX_BODY_BYTES", 1024 * 1024)?,
            concurrency_limit: parse_var("CONCURRENCY_LIMIT", 100)?,
        })
    }
}

fn parse_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid value for {key}: {e}")),
        Err(_) => Ok(default),
    }
}
