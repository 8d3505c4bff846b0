use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::auth::repo_types::{InsertOutcome, NewUser, User};

const USER_COLUMNS: &str = "id, email, password_hash, display_name, created_at, \
     email_verified, verification_token, verification_token_expires_at";

/// Persistence for user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn exists_by_email(&self, email: &str) -> anyhow::Result<bool>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>>;
    async fn find_by_verification_token(&self, token: &str) -> anyhow::Result<Option<User>>;
    /// Insert a new unverified user. A taken email yields `InsertOutcome::Conflict`.
    async fn insert(&self, user: NewUser) -> anyhow::Result<InsertOutcome>;
    /// Flip the verified flag and clear the token pair. Returns false if no row matched.
    async fn mark_verified(&self, id: i64) -> anyhow::Result<bool>;
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
            .with_context(|| format!("lookup user by {column}"))?;
        Ok(user)
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn exists_by_email(&self, email: &str) -> anyhow::Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.db)
                .await
                .context("check email exists")?;
        Ok(exists)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        self.find_one("email", email).await
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("lookup user by id")?;
        Ok(user)
    }

    async fn find_by_verification_token(&self, token: &str) -> anyhow::Result<Option<User>> {
        self.find_one("verification_token", token).await
    }

    async fn insert(&self, user: NewUser) -> anyhow::Result<InsertOutcome> {
        let sql = format!(
            r#"
            INSERT INTO users
                (email, password_hash, display_name, email_verified,
                 verification_token, verification_token_expires_at)
            VALUES ($1, $2, $3, false, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, User>(&sql)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.display_name)
            .bind(&user.verification_token)
            .bind(user.verification_token_expires_at)
            .fetch_one(&self.db)
            .await;

        match row {
            Ok(created) => Ok(InsertOutcome::Created(created)),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Conflict),
            Err(err) => Err(err).context("insert user"),
        }
    }

    async fn mark_verified(&self, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email_verified = true,
                verification_token = NULL,
                verification_token_expires_at = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await
        .context("mark user verified")?;
        Ok(result.rows_affected() == 1)
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}
