// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Tenant Resolution
//!
//! Every inbound request is mapped to a tenant from its hostname:
//!
//! 1. `X-Forwarded-Host` (first entry) or `Host` is parsed into a
//!    [`DomainInfo`] relative to the platform domain
//! 2. the tenant cache is consulted (`tenant:subdomain:{label}` or
//!    `tenant:domain:{domain}`)
//! 3. on a miss the tenant store is queried by domain, then by subdomain,
//!    and the cache is populated
//! 4. the result is bound to the request as a [`RequestIdentity`]
//!
//! Failures are values ([`TenantResolutionError`]); whether a request may
//! continue without a tenant is decided per path.

pub mod context;
pub mod domain;
pub mod error;
pub mod resolver;

pub use context::{resolve_tenant, CurrentTenant, Identity, RequestIdentity};
pub use domain::{DomainInfo, DomainResolver};
pub use error::{TenantResolutionError, TenantResolutionErrorCode};
pub use resolver::{
    ResolutionConfig, ResolutionSource, ResolveOptions, TenantResolutionResult,
    TenantResolutionService,
};
