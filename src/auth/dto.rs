use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::auth::repo_types::User;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response returned after a successful login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i64,
    pub email: String,
    pub display_name: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub email_verified: bool,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            created_at: user.created_at,
            email_verified: user.email_verified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 7,
            email: "test@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            display_name: Some("Ann".into()),
            created_at: OffsetDateTime::UNIX_EPOCH,
            email_verified: false,
            verification_token: Some("deadbeef".into()),
            verification_token_expires_at: Some(OffsetDateTime::UNIX_EPOCH),
        }
    }

    #[test]
    fn public_user_never_leaks_secrets() {
        let json = serde_json::to_string(&PublicUser::from(user())).unwrap();
        assert!(json.contains("\"email\":\"test@example.com\""));
        assert!(json.contains("\"displayName\":\"Ann\""));
        assert!(json.contains("\"emailVerified\":false"));
        assert!(json.contains("\"createdAt\":\"1970-01-01T00:00:00Z\""));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("deadbeef"));
    }

    #[test]
    fn register_request_accepts_camel_case_and_missing_name() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"email":"a@x.com","password":"pw1","displayName":"Ann"}"#,
        )
        .unwrap();
        assert_eq!(req.display_name.as_deref(), Some("Ann"));

        let req: RegisterRequest =
            serde_json::from_str(r#"{"email":"a@x.com","password":"pw1"}"#).unwrap();
        assert!(req.display_name.is_none());
    }
}
