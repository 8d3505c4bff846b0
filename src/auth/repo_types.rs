use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub display_name: Option<String>,
    pub created_at: OffsetDateTime,
    pub email_verified: bool,
    #[serde(skip_serializing)]
    pub verification_token: Option<String>,
    #[serde(skip_serializing)]
    pub verification_token_expires_at: Option<OffsetDateTime>,
}

/// Fields supplied when a user registers. New users are always unverified.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub verification_token: String,
    pub verification_token_expires_at: OffsetDateTime,
}

/// Result of inserting a user; `Conflict` means the email is taken.
#[derive(Debug)]
pub enum InsertOutcome {
    Created(User),
    Conflict,
}
