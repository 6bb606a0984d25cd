// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{OriginalUri, State},
    http::{HeaderMap, Method, StatusCode},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    audit::RequestMeta,
    auth::{bearer_token, Auth, AuthError, UserContext},
    error::{ApiJson, ErrorBody},
    models::{AuthResponse, LoginRequest, RefreshResponse, RegisterRequest},
    state::AppState,
    tenant::CurrentTenant,
};

/// Body of `GET /api/auth/me`.
#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub user: UserContext,
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    tag = "Auth",
    responses(
        (status = 200, body = AuthResponse),
        (status = 400, description = "Missing or malformed fields", body = ErrorBody),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
        (status = 404, description = "Tenant not found", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    let meta = RequestMeta::new(&method, uri.path(), &headers);
    let response = state.auth.login(tenant.id, request, &meta).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    tag = "Auth",
    responses(
        (status = 201, body = AuthResponse),
        (status = 400, description = "Validation failed, weak password or email taken", body = ErrorBody),
        (status = 404, description = "Tenant not found", body = ErrorBody)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AuthError> {
    let meta = RequestMeta::new(&method, uri.path(), &headers);
    let response = state.auth.register(&tenant, request, &meta).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, body = RefreshResponse),
        (status = 401, description = "Missing, invalid or too old token", body = ErrorBody),
        (status = 403, description = "Token issued for another tenant", body = ErrorBody)
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<Json<RefreshResponse>, AuthError> {
    let meta = RequestMeta::new(&method, uri.path(), &headers);
    let token = bearer_token(&headers)?;
    let response = state.auth.refresh(token, tenant.id, &meta).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, body = MeResponse),
        (status = 401, body = ErrorBody),
        (status = 403, body = ErrorBody)
    )
)]
pub async fn me(Auth(user): Auth) -> Json<MeResponse> {
    Json(MeResponse { user })
}
