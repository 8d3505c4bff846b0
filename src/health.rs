use std::time::Duration;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use sqlx::Connection;
use tracing::{debug, error};

use crate::state::AppState;

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DatabaseHealth {
    fn failed(message: &str, err: impl std::fmt::Display) -> Self {
        Self {
            status: "error",
            message: message.to_string(),
            database: None,
            version: None,
            url: None,
            error: Some(err.to_string()),
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health/database", get(database_health))
}

/// Mask credentials in a connection string.
pub fn redact_database_url(url: &str) -> String {
    lazy_static! {
        static ref USERINFO_RE: Regex = Regex::new(r"://([^:/@]+):[^@]*@").unwrap();
        static ref PARAM_RE: Regex = Regex::new(r"password=[^&]*").unwrap();
    }
    let url = USERINFO_RE.replace(url, "://$1:***@");
    PARAM_RE.replace_all(&url, "password=***").into_owned()
}

async fn probe(state: &AppState) -> anyhow::Result<(String, String)> {
    let mut conn = state.db.acquire().await?;
    conn.ping().await?;
    let banner: String = sqlx::query_scalar("SELECT version()")
        .fetch_one(&mut *conn)
        .await?;
    let version: String = sqlx::query_scalar("SHOW server_version")
        .fetch_one(&mut *conn)
        .await?;
    let product = banner
        .split_whitespace()
        .next()
        .unwrap_or("PostgreSQL")
        .to_string();
    Ok((product, version))
}

pub async fn database_health(
    State(state): State<AppState>,
) -> (StatusCode, Json<DatabaseHealth>) {
    let result = tokio::time::timeout(CHECK_TIMEOUT, probe(&state)).await;
    match result {
        Ok(Ok((database, version))) => {
            debug!(%database, %version, "database connection is healthy");
            (
                StatusCode::OK,
                Json(DatabaseHealth {
                    status: "connected",
                    message: "Successfully connected to database".into(),
                    database: Some(database),
                    version: Some(version),
                    url: Some(redact_database_url(&state.config.database_url)),
                    error: None,
                }),
            )
        }
        Ok(Err(e)) => {
            error!(error = %e, "database health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(DatabaseHealth::failed("Failed to connect to database", e)),
            )
        }
        Err(elapsed) => {
            error!("database health check timed out");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(DatabaseHealth::failed("Connection is not valid", elapsed)),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{auth::repo::memory::InMemoryUserStore, mail::testing::RecordingMailer};

    #[test]
    fn redacts_userinfo_password() {
        assert_eq!(
            redact_database_url("postgres://app:s3cret@db:5432/travel"),
            "postgres://app:***@db:5432/travel"
        );
    }

    #[test]
    fn redacts_query_password() {
        assert_eq!(
            redact_database_url("postgres://db/travel?user=app&password=s3cret&sslmode=require"),
            "postgres://db/travel?user=app&password=***&sslmode=require"
        );
    }

    #[test]
    fn leaves_passwordless_url_alone() {
        assert_eq!(
            redact_database_url("postgres://app@db/travel"),
            "postgres://app@db/travel"
        );
    }

    #[tokio::test]
    async fn unreachable_database_reports_error() {
        let state = AppState::fake(
            Arc::new(InMemoryUserStore::default()),
            Arc::new(RecordingMailer::default()),
        );
        let (status, Json(body)) = database_health(State(state)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.status, "error");
        assert!(body.error.is_some());
        assert!(body.version.is_none());
    }
}
