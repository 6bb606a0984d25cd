// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tenant Identity - multi-tenant identity layer
//!
//! Every request is bound to exactly one tenant, resolved from its hostname,
//! and carries a typed [`tenant::RequestIdentity`] instead of ambient state.
//! Bearer tokens are signed per tenant and never accepted across tenants.
//!
//! ## Modules
//!
//! - `tenant` - hostname parsing, cache-aside tenant resolution, request identity
//! - `auth` - tokens, password hashing, login/register/refresh, RBAC
//! - `features` - per-tenant feature flags
//! - `api` - HTTP handlers and router (Axum)
//! - `storage` - store and cache seams with in-memory implementations

pub mod api;
pub mod audit;
pub mod auth;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod features;
pub mod models;
pub mod state;
pub mod storage;
pub mod tenant;
