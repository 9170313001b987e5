use crate::api::AppState;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use gigboard_market::{MarketStore, User};
use gigboard_types::UserId;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Caller-identifying headers supplied by the host platform shell.
pub const USER_ID_HEADER: &str = "x-host-user-id";
pub const USER_TOKEN_HEADER: &str = "x-host-token";

/// The resolved current user. Handlers never see raw headers.
pub struct CurrentUser(pub User);

#[derive(Debug)]
pub enum AuthError {
    MissingCredentials,
    IdentityLookupFailed,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            Self::MissingCredentials => "authentication required",
            Self::IdentityLookupFailed => "authentication failed",
        };
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "error": message })),
        )
            .into_response()
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user_id = header(parts, USER_ID_HEADER).ok_or(AuthError::MissingCredentials)?;
        // The token is only checked for presence here; validation belongs to
        // the host platform, which minted it.
        header(parts, USER_TOKEN_HEADER).ok_or(AuthError::MissingCredentials)?;
        let user_id = UserId::new(user_id);

        let existing = state
            .market
            .store
            .get_user(&user_id)
            .await
            .map_err(|_| AuthError::IdentityLookupFailed)?;
        if let Some(user) = existing {
            return Ok(CurrentUser(user));
        }

        // First authenticated contact: resolve the profile through the
        // bridge and create the user.
        let profile = state.bridge.fetch_profile(&user_id).await.map_err(|e| {
            warn!(user_id = %user_id, error = %e, "❌ Identity lookup failed");
            AuthError::IdentityLookupFailed
        })?;
        let user = User::new(
            user_id.clone(),
            profile.first_name,
            profile.last_name,
            profile.photo,
        );
        state
            .market
            .store
            .put_user(user.clone())
            .await
            .map_err(|_| AuthError::IdentityLookupFailed)?;
        state.metrics.users_created.inc();

        info!(user_id = %user_id, "👤 User created on first contact");
        Ok(CurrentUser(user))
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}
