use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{NewUser, StoreError, TokenRedemption, User};
use crate::verification::token::VerificationToken;

const USER_COLUMNS: &str = "id, email, name, password_hash, google_id, email_verified, \
     verify_token, verify_token_expiry, created_at, updated_at";

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_google_id(&self, google_id: &str) -> anyhow::Result<Option<User>>;
    async fn create(&self, new: NewUser) -> Result<User, StoreError>;

    /// Store the Google subject, backfill `email_verified` when unset and drop any pending token.
    async fn link_google(
        &self,
        id: Uuid,
        google_id: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<User>;

    /// Replace the email with an unverified one awaiting `token`.
    async fn set_pending_email(
        &self,
        id: Uuid,
        email: &str,
        token: &VerificationToken,
    ) -> Result<(), StoreError>;

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()>;

    /// Atomically consume a verification token. At most one caller observes
    /// `Verified` for a given token.
    async fn redeem_verify_token(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<TokenRedemption>;

    async fn save_oauth_state(
        &self,
        state: &str,
        pkce_verifier: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()>;

    /// Delete the state row and return its PKCE verifier if it had not expired.
    async fn take_oauth_state(
        &self,
        state: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<String>>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn find_one(&self, column: &str, value: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await
            .with_context(|| format!("find user by {column}"))?;
        Ok(user)
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find user by id")?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        self.find_one("email", email).await
    }

    async fn find_by_google_id(&self, google_id: &str) -> anyhow::Result<Option<User>> {
        self.find_one("google_id", google_id).await
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let (token, expiry) = match new.verify_token {
            Some(t) => (Some(t.value), Some(t.expires_at)),
            None => (None, None),
        };
        let sql = format!(
            r#"
            INSERT INTO users (email, name, password_hash, google_id, email_verified,
                               verify_token, verify_token_expiry)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&new.email)
            .bind(&new.name)
            .bind(&new.password_hash)
            .bind(&new.google_id)
            .bind(new.email_verified)
            .bind(token)
            .bind(expiry)
            .fetch_one(&self.db)
            .await?;
        Ok(user)
    }

    async fn link_google(
        &self,
        id: Uuid,
        google_id: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<User> {
        let sql = format!(
            r#"
            UPDATE users
            SET google_id = $2,
                email_verified = COALESCE(email_verified, $3),
                verify_token = NULL,
                verify_token_expiry = NULL,
                updated_at = $3
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(google_id)
            .bind(now)
            .fetch_one(&self.db)
            .await
            .context("link google account")?;
        Ok(user)
    }

    async fn set_pending_email(
        &self,
        id: Uuid,
        email: &str,
        token: &VerificationToken,
    ) -> Result<(), StoreError> {
        let res = sqlx::query(
            r#"
            UPDATE users
            SET email = $2,
                email_verified = NULL,
                verify_token = $3,
                verify_token_expiry = $4,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(&token.value)
        .bind(token.expires_at)
        .execute(&self.db)
        .await?;
        if res.rows_affected() == 0 {
            return Err(anyhow::anyhow!("user {id} not found").into());
        }
        Ok(())
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        let res =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(&self.db)
                .await
                .context("set password hash")?;
        if res.rows_affected() == 0 {
            anyhow::bail!("user {id} not found");
        }
        Ok(())
    }

    async fn redeem_verify_token(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<TokenRedemption> {
        // Conditional update is the single-use guard: a second caller matches no row.
        let verified: Option<(Uuid,)> = sqlx::query_as(
            r#"
            UPDATE users
            SET email_verified = $2,
                verify_token = NULL,
                verify_token_expiry = NULL,
                updated_at = $2
            WHERE verify_token = $1
              AND (verify_token_expiry IS NULL OR verify_token_expiry >= $2)
            RETURNING id
            "#,
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.db)
        .await
        .context("redeem verify token")?;

        if let Some((id,)) = verified {
            return Ok(TokenRedemption::Verified(id));
        }

        let pending: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM users WHERE verify_token = $1")
                .bind(token)
                .fetch_optional(&self.db)
                .await
                .context("lookup verify token")?;

        Ok(match pending {
            Some(_) => TokenRedemption::Expired,
            None => TokenRedemption::Unknown,
        })
    }

    async fn save_oauth_state(
        &self,
        state: &str,
        pkce_verifier: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO oauth_states (state, pkce_verifier, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(state)
        .bind(pkce_verifier)
        .bind(expires_at)
        .execute(&self.db)
        .await
        .context("save oauth state")?;
        Ok(())
    }

    async fn take_oauth_state(
        &self,
        state: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<String>> {
        sqlx::query("DELETE FROM oauth_states WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.db)
            .await
            .context("sweep expired oauth states")?;

        let row: Option<(String,)> = sqlx::query_as(
            r#"
            DELETE FROM oauth_states
            WHERE state = $1 AND expires_at > $2
            RETURNING pkce_verifier
            "#,
        )
        .bind(state)
        .bind(now)
        .fetch_optional(&self.db)
        .await
        .context("take oauth state")?;
        Ok(row.map(|(verifier,)| verifier))
    }
}
