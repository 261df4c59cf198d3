use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// SMTP credentials and the frontend base used to build reset links.
/// `smtp_host = None` selects the logging transport.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub smtp_host: Option<String>,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from: String,
    pub frontend_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub public_prefix: String,
    pub max_file_bytes: usize,
    pub max_property_photos: usize,
}

impl UploadConfig {
    /// Upper bound for a whole multipart body carrying `files` uploads.
    pub fn body_limit(&self, files: usize) -> usize {
        self.max_file_bytes * files + 1024 * 1024
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
    pub uploads: UploadConfig,
    pub reset_ttl_minutes: i64,
    pub allow_anonymous_likes: bool,
    pub cors_allowed_origins: Vec<String>,
}

const DEFAULT_SESSION_TTL_MINUTES: i64 = 7 * 24 * 60;
const DEFAULT_RESET_TTL_MINUTES: i64 = 60;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "tolet".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "tolet-users".into()),
            ttl_minutes: parsed_var("JWT_TTL_MINUTES").unwrap_or(DEFAULT_SESSION_TTL_MINUTES),
        };
        let mail = MailConfig {
            smtp_host: std::env::var("SMTP_HOST").ok().filter(|h| !h.trim().is_empty()),
            smtp_username: std::env::var("SMTP_USERNAME").unwrap_or_default(),
            smtp_password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
            from: std::env::var("MAIL_FROM")
                .or_else(|_| std::env::var("SMTP_USERNAME"))
                .unwrap_or_else(|_| "no-reply@localhost".into()),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
        };
        let uploads = UploadConfig {
            dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            public_prefix: "/uploads".into(),
            max_file_bytes: parsed_var("MAX_UPLOAD_BYTES").unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            max_property_photos: 10,
        };
        Ok(Self {
            database_url,
            jwt,
            mail,
            uploads,
            reset_ttl_minutes: parsed_var("RESET_TOKEN_TTL_MINUTES")
                .unwrap_or(DEFAULT_RESET_TTL_MINUTES),
            allow_anonymous_likes: std::env::var("ALLOW_ANONYMOUS_LIKES")
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(true),
            cors_allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
        })
    }
}

fn parsed_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_common_spellings() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" off "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn origin_list_drops_blanks() {
        assert_eq!(
            split_list("http://localhost:5173, ,https://tolet.example"),
            vec!["http://localhost:5173", "https://tolet.example"]
        );
        assert!(split_list("").is_empty());
    }

    #[test]
    fn body_limit_covers_all_files() {
        let uploads = UploadConfig {
            dir: PathBuf::from("uploads"),
            public_prefix: "/uploads".into(),
            max_file_bytes: 10,
            max_property_photos: 3,
        };
        assert_eq!(uploads.body_limit(3), 30 + 1024 * 1024);
    }
}
