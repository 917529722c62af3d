// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscription routes.

use axum::{
    extract::{Path, State},
    routing::post,
    Extension, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::AppState;

/// Routes that require authentication.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/subscriptions/c/{channel_id}", post(toggle_subscription))
}

#[derive(Serialize)]
pub struct SubscriptionState {
    pub subscribed: bool,
}

/// Subscribe to a channel, or unsubscribe if already subscribed.
async fn toggle_subscription(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(channel_id): Path<String>,
) -> Result<ApiResponse<SubscriptionState>> {
    let subscribed = state
        .channels
        .toggle_subscription(&user.user_id, &channel_id)
        .await?;

    let message = if subscribed {
        "Subscribed successfully"
    } else {
        "Unsubscribed successfully"
    };

    Ok(ApiResponse::ok(SubscriptionState { subscribed }, message))
}
