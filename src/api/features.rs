// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::collections::BTreeMap;

use axum::{
    extract::{OriginalUri, State},
    http::{HeaderMap, Method},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    audit::{RequestMeta, SecurityEvent, SecurityEventType},
    auth::Auth,
    error::{ApiError, ApiJson, ErrorBody},
    features::Features,
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct FeaturesResponse {
    pub success: bool,
    /// Every known flag with its value, e.g. `{"menu":true,"orders":false,"loyalty":false}`.
    #[schema(value_type = Object)]
    pub data: Features,
}

#[utoipa::path(
    get,
    path = "/api/features",
    tag = "Features",
    security(("bearer" = [])),
    responses(
        (status = 200, body = FeaturesResponse),
        (status = 401, body = ErrorBody),
        (status = 403, body = ErrorBody)
    )
)]
pub async fn get_features(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<FeaturesResponse>, ApiError> {
    let data = state.features.get_tenant_features(user.tenant_id).await?;
    Ok(Json(FeaturesResponse {
        success: true,
        data,
    }))
}

#[utoipa::path(
    put,
    path = "/api/features",
    tag = "Features",
    security(("bearer" = [])),
    request_body(content = BTreeMap<String, bool>, description = "Flags to change; omitted flags keep their value"),
    responses(
        (status = 200, body = FeaturesResponse),
        (status = 400, description = "Unknown flag or non-boolean value", body = ErrorBody),
        (status = 401, body = ErrorBody),
        (status = 403, body = ErrorBody)
    )
)]
pub async fn update_features(
    State(state): State<AppState>,
    Auth(user): Auth,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    ApiJson(changes): ApiJson<BTreeMap<String, bool>>,
) -> Result<Json<FeaturesResponse>, ApiError> {
    let data = state
        .features
        .update_tenant_features(user.tenant_id, &changes)
        .await?;

    SecurityEvent::new(SecurityEventType::FeaturesUpdated)
        .with_tenant(user.tenant_id)
        .with_user(user.id)
        .with_request(RequestMeta::new(&method, uri.path(), &headers))
        .emit();
    Ok(Json(FeaturesResponse {
        success: true,
        data,
    }))
}
