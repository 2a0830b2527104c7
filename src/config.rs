use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Outbound mail settings. `secure` selects implicit TLS on 465 and STARTTLS elsewhere.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub secure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    /// Public base URL of the web client; verification links point here.
    pub app_url: String,
    pub jwt: JwtConfig,
    pub smtp: SmtpConfig,
    pub google: Option<GoogleConfig>,
    pub verify_token_ttl_hours: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
        let app_url = std::env::var("APP_URL")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .trim_end_matches('/')
            .to_string();

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "ainote".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "ainote-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(60),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES").unwrap_or(60 * 24 * 14),
        };

        let smtp = SmtpConfig {
            host: std::env::var("SMTP_HOST").context("SMTP_HOST not set")?,
            port: env_parse("SMTP_PORT").unwrap_or(465),
            username: std::env::var("SMTP_USER").ok(),
            password: std::env::var("SMTP_PASS").ok(),
            from: std::env::var("SMTP_FROM").context("SMTP_FROM not set")?,
            secure: std::env::var("SMTP_SECURE")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
        };

        // Google sign-in is optional; both credentials must be present to enable it.
        let google = match (
            std::env::var("GOOGLE_CLIENT_ID"),
            std::env::var("GOOGLE_CLIENT_SECRET"),
        ) {
            (Ok(client_id), Ok(client_secret)) => Some(GoogleConfig {
                client_id,
                client_secret,
                redirect_url: std::env::var("GOOGLE_REDIRECT_URL")
                    .unwrap_or_else(|_| format!("{}/api/auth/google/callback", app_url)),
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            app_url,
            jwt,
            smtp,
            google,
            verify_token_ttl_hours: env_parse("VERIFY_TOKEN_TTL_HOURS").unwrap_or(24),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
