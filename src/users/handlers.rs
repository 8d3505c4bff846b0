use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{dto::PublicUser, jwt::AuthUser},
    error::AuthError,
    state::AppState,
    users::services::UserLookup,
};

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/users/:id", get(get_user))
}

#[instrument(skip(lookup, caller), fields(caller_id = caller.id))]
pub async fn get_user(
    State(lookup): State<UserLookup>,
    caller: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<PublicUser>, AuthError> {
    lookup.by_id(id).await.map(Json)
}
