use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use crate::auth::repo::{PgUserRepository, UserRepository};
use crate::blogs::repo::{BlogRepository, PgBlogRepository};
use crate::config::AppConfig;
use crate::mail::{LogMailer, Mailer, SmtpMailer};
use crate::properties::repo::{PgPropertyRepository, PropertyRepository};
use crate::storage::{LocalStorage, StorageClient};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepository>,
    pub properties: Arc<dyn PropertyRepository>,
    pub blogs: Arc<dyn BlogRepository>,
    pub storage: Arc<dyn StorageClient>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await?;

        if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
            tracing::warn!(error = %e, "migrations folder not found or migration failed; continuing");
        }

        let storage = Arc::new(LocalStorage::new(config.uploads.dir.clone()).await?) as Arc<dyn StorageClient>;

        let mailer: Arc<dyn Mailer> = match &config.mail.smtp_host {
            Some(host) => Arc::new(SmtpMailer::new(host, &config.mail)?),
            None => {
                tracing::warn!("SMTP_HOST not set; password reset mails will only be logged");
                Arc::new(LogMailer)
            }
        };

        Ok(Self {
            users: Arc::new(PgUserRepository::new(db.clone())),
            properties: Arc::new(PgPropertyRepository::new(db.clone())),
            blogs: Arc::new(PgBlogRepository::new(db)),
            config,
            storage,
            mailer,
        })
    }
}
