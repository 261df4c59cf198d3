use axum::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User, UserRow};
use crate::error::AppResult;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `DuplicateIdentity` when the email is taken.
    async fn create(&self, new: NewUser) -> AppResult<User>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    /// Returns the holder of `token` regardless of its expiry.
    async fn find_by_reset_token(&self, token: &str) -> AppResult<Option<User>>;
    async fn set_reset_token(
        &self,
        id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> AppResult<()>;
    async fn clear_reset_token(&self, id: Uuid) -> AppResult<()>;
    /// Stores a new hash and drops any outstanding reset token.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> AppResult<()>;
    /// Clears `token` if it is still live and returns its holder. Only one
    /// caller can take a given token; `None` when it was spent or has expired.
    async fn take_reset_token(&self, token: &str, now: OffsetDateTime) -> AppResult<Option<Uuid>>;
}

const USER_COLUMNS: &str = "id, first_name, last_name, email, password_hash, phone, role, \
     answer_hash, reset_token, reset_token_expires_at, created_at";

pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn fetch_one_where(&self, clause: &str, value: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {clause}"
        ))
        .bind(value)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(User::try_from).transpose()?)
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, new: NewUser) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (id, first_name, last_name, email, password_hash, phone, role, answer_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.phone)
        .bind(new.role.as_str())
        .bind(&new.answer_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(User::try_from(row)?)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(User::try_from).transpose()?)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.fetch_one_where("email = $1", email).await
    }

    async fn find_by_reset_token(&self, token: &str) -> AppResult<Option<User>> {
        self.fetch_one_where("reset_token = $1", token).await
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET reset_token = $2, reset_token_expires_at = $3
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token)
        .bind(expires_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn clear_reset_token(&self, id: Uuid) -> AppResult<()> {
        sqlx::query(
            "UPDATE users SET reset_token = NULL, reset_token_expires_at = NULL WHERE id = $1",
        )
        .bind(id)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET password_hash = $2, reset_token = NULL, reset_token_expires_at = NULL
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn take_reset_token(&self, token: &str, now: OffsetDateTime) -> AppResult<Option<Uuid>> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE users
               SET reset_token = NULL, reset_token_expires_at = NULL
             WHERE reset_token = $1 AND reset_token_expires_at > $2
            RETURNING id
            "#,
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.db)
        .await?;
        Ok(id)
    }
}
