use axum::extract::rejection::JsonRejection;
use axum::{Extension, Json};
use std::sync::Arc;
use tracing::error;

use crate::http_error::follow_status;
use crate::plugins::auth::AuthUser;
use crate::plugins::communication::follows::error::FollowError;
use crate::plugins::communication::follows::models::{FollowStatusPayload, FollowToggleRequest, FollowingPayload};
use crate::plugins::communication::follows::service::FollowService;
use crate::plugins::communication::shared::Envelope;

fn error_envelope<T: Default>(e: FollowError) -> Envelope<T> {
    if let FollowError::Persistence(msg) = &e {
        error!("follow operation failed: {}", msg);
    }
    Envelope::failure(follow_status(&e), e.code(), e.to_string(), T::default())
}

pub async fn toggle_follow(
    Extension(service): Extension<Arc<FollowService>>,
    auth: AuthUser,
    payload: Result<Json<FollowToggleRequest>, JsonRejection>,
) -> Envelope<FollowStatusPayload> {
    let Json(payload) = match payload {
        Ok(body) => body,
        Err(rejection) => return error_envelope(FollowError::InvalidInput(rejection.body_text())),
    };
    match service.toggle(auth.user_id, payload.target_user_id, payload.action.as_deref()).await {
        Ok(outcome) => Envelope::ok(outcome.message, FollowStatusPayload { is_following: outcome.is_following }),
        Err(e) => error_envelope(e),
    }
}

pub async fn following(Extension(service): Extension<Arc<FollowService>>, auth: AuthUser) -> Envelope<FollowingPayload> {
    match service.following(auth.user_id).await {
        Ok(following) => Envelope::ok(format!("following {} user(s)", following.len()), FollowingPayload { following }),
        Err(e) => error_envelope(e),
    }
}
