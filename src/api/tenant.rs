// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{error::ErrorBody, models::Tenant, tenant::CurrentTenant};

/// Public view of the resolved tenant.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantSummary {
    pub id: Uuid,
    pub name: String,
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<String>,
    pub enabled_features: Vec<String>,
}

impl From<Tenant> for TenantSummary {
    fn from(tenant: Tenant) -> Self {
        Self {
            id: tenant.id,
            name: tenant.name,
            domain: tenant.domain,
            subdomain: tenant.subdomain,
            enabled_features: tenant.enabled_features,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TenantResponse {
    pub success: bool,
    pub data: TenantSummary,
}

#[utoipa::path(
    get,
    path = "/api/tenant",
    tag = "Tenant",
    security(("bearer" = [])),
    responses(
        (status = 200, body = TenantResponse),
        (status = 401, body = ErrorBody),
        (status = 403, description = "Requires read access to settings", body = ErrorBody)
    )
)]
pub async fn get_tenant(CurrentTenant(tenant): CurrentTenant) -> Json<TenantResponse> {
    Json(TenantResponse {
        success: true,
        data: tenant.into(),
    })
}
