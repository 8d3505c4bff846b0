use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    auth::{dto::PublicUser, repo::UserStore},
    error::AuthError,
    state::AppState,
};

/// Read-only projection of user records into their public view.
#[derive(Clone)]
pub struct UserLookup {
    users: Arc<dyn UserStore>,
}

impl FromRef<AppState> for UserLookup {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.users.clone())
    }
}

impl UserLookup {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    pub async fn by_email(&self, email: &str) -> Result<PublicUser, AuthError> {
        self.users
            .find_by_email(email)
            .await?
            .map(PublicUser::from)
            .ok_or(AuthError::IdentityNotFound)
    }

    pub async fn by_id(&self, id: i64) -> Result<PublicUser, AuthError> {
        self.users
            .find_by_id(id)
            .await?
            .map(PublicUser::from)
            .ok_or(AuthError::IdentityNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        repo::memory::InMemoryUserStore,
        repo_types::{InsertOutcome, NewUser},
    };
    use time::OffsetDateTime;

    async fn seeded() -> (UserLookup, i64) {
        let store = Arc::new(InMemoryUserStore::default());
        let outcome = store
            .insert(NewUser {
                email: "a@x.com".into(),
                password_hash: "hash".into(),
                display_name: Some("Ann".into()),
                verification_token: "tok".into(),
                verification_token_expires_at: OffsetDateTime::now_utc(),
            })
            .await
            .unwrap();
        let InsertOutcome::Created(user) = outcome else {
            panic!("insert failed");
        };
        (UserLookup::new(store), user.id)
    }

    #[tokio::test]
    async fn finds_by_email_and_id() {
        let (lookup, id) = seeded().await;
        let by_email = lookup.by_email("a@x.com").await.expect("by email");
        let by_id = lookup.by_id(id).await.expect("by id");
        assert_eq!(by_email, by_id);
        assert_eq!(by_id.display_name.as_deref(), Some("Ann"));
        assert!(!by_id.email_verified);
    }

    #[tokio::test]
    async fn missing_user_is_not_found() {
        let (lookup, id) = seeded().await;
        assert!(matches!(
            lookup.by_email("nobody@x.com").await,
            Err(AuthError::IdentityNotFound)
        ));
        assert!(matches!(
            lookup.by_id(id + 100).await,
            Err(AuthError::IdentityNotFound)
        ));
    }
}
