use std::sync::Arc;

use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{AuthResponse, MessageResponse, PublicUser},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::UserStore,
        repo_types::{InsertOutcome, NewUser},
    },
    config::VerificationConfig,
    error::AuthError,
    mail::Mailer,
    state::AppState,
};

pub const REGISTERED_MESSAGE: &str =
    "Account created. Please check your email to verify before logging in.";
pub const VERIFIED_MESSAGE: &str = "Email verified successfully. You can now log in.";
pub const ALREADY_VERIFIED_MESSAGE: &str = "Email already verified. You can log in.";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

lazy_static! {
    /// Verified against when the email is unknown so both login failures cost one argon2 run.
    static ref DUMMY_HASH: String =
        hash_password("dummy-password-for-unknown-users").unwrap_or_default();
}

#[cfg(test)]
thread_local! {
    pub(crate) static DUMMY_CHECKS: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

fn verify_against_dummy(password: &str) {
    #[cfg(test)]
    DUMMY_CHECKS.with(|c| c.set(c.get() + 1));
    // the outcome is irrelevant, only the work matters
    let _ = verify_password(password, &DUMMY_HASH);
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// 128 random bits as 32 hex chars.
pub fn generate_verification_token() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn build_verification_link(frontend_base_url: &str, token: &str) -> String {
    let base = frontend_base_url.trim_end_matches('/');
    format!("{base}/verify-email?token={token}")
}

/// Registration, verification and login over the user store, mailer and token issuer.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    mailer: Arc<dyn Mailer>,
    keys: JwtKeys,
    verification: VerificationConfig,
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            state.users.clone(),
            state.mailer.clone(),
            JwtKeys::from_ref(state),
            state.config.verification.clone(),
        )
    }
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
        keys: JwtKeys,
        verification: VerificationConfig,
    ) -> Self {
        Self {
            users,
            mailer,
            keys,
            verification,
        }
    }

    /// Create an unverified account and mail its verification link.
    ///
    /// A mail failure is returned to the caller but the account stays persisted.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<MessageResponse, AuthError> {
        if self.users.exists_by_email(email).await? {
            warn!(email = %email, "email already registered");
            return Err(AuthError::DuplicateIdentity);
        }

        let password_hash = hash_password(password)?;
        let token = generate_verification_token();
        let ttl_hours = self.verification.token_ttl_hours;
        let expires_at = ttl_hours
            .checked_mul(3600)
            .map(TimeDuration::seconds)
            .and_then(|ttl| OffsetDateTime::now_utc().checked_add(ttl))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "verification token ttl of {ttl_hours} hours is out of range"
                )
            })?;

        let new_user = NewUser {
            email: email.to_string(),
            password_hash,
            display_name: display_name
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            verification_token: token.clone(),
            verification_token_expires_at: expires_at,
        };

        // The pre-check above can race; the unique index has the final word.
        let user = match self.users.insert(new_user).await? {
            InsertOutcome::Created(user) => user,
            InsertOutcome::Conflict => {
                warn!(email = %email, "email registered concurrently");
                return Err(AuthError::DuplicateIdentity);
            }
        };
        info!(user_id = user.id, email = %user.email, "user registered");

        let link = build_verification_link(&self.verification.frontend_base_url, &token);
        self.mailer
            .send_verification(&user.email, user.display_name.as_deref(), &link)
            .await?;

        Ok(MessageResponse::new(REGISTERED_MESSAGE))
    }

    /// Check an email/password pair. Unknown email and wrong password fail the same way.
    async fn authenticate(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            warn!(email = %email, "login unknown email");
            verify_against_dummy(password);
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(password, &user.password_hash)? {
            warn!(email = %email, user_id = user.id, "login invalid password");
            return Err(AuthError::InvalidCredentials);
        }
        Ok(())
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError> {
        self.authenticate(email, password).await?;

        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AuthError::IdentityNotFound)?;

        if !user.email_verified {
            warn!(user_id = user.id, "login blocked until email is verified");
            return Err(AuthError::EmailNotVerified);
        }

        let token = self.keys.sign(&user.email, user.id)?;
        info!(user_id = user.id, email = %user.email, "user logged in");
        Ok(AuthResponse {
            token,
            user: PublicUser::from(user),
        })
    }

    #[instrument(skip(self, token))]
    pub async fn verify_email(&self, token: &str) -> Result<MessageResponse, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::invalid_argument("Verification token is required"));
        }

        let user = self
            .users
            .find_by_verification_token(token)
            .await?
            .ok_or_else(|| AuthError::invalid_argument("Invalid or expired verification link."))?;

        if user.email_verified {
            return Ok(MessageResponse::new(ALREADY_VERIFIED_MESSAGE));
        }

        if let Some(expires_at) = user.verification_token_expires_at {
            if expires_at < OffsetDateTime::now_utc() {
                warn!(user_id = user.id, %expires_at, "verification link expired");
                return Err(AuthError::invalid_argument(
                    "Verification link has expired. Please register again.",
                ));
            }
        }

        if !self.users.mark_verified(user.id).await? {
            return Err(AuthError::IdentityNotFound);
        }
        info!(user_id = user.id, "email verified");
        Ok(MessageResponse::new(VERIFIED_MESSAGE))
    }
}
