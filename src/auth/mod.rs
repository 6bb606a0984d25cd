// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Tenant-scoped bearer-token authentication and role-based authorization.
//!
//! ## Auth Flow
//!
//! 1. The tenant is resolved from the request host
//!    (see [`crate::tenant`])
//! 2. `POST /api/auth/login` verifies email + password within that tenant
//!    and returns an HS256 token carrying
//!    `{userId, tenantId, email, role, iat, exp, iss, aud}`
//! 3. Protected routes send `Authorization: Bearer <token>`; the gate:
//!    - verifies signature, issuer, audience and expiry
//!    - loads the user (`user_not_found` is a 401)
//!    - requires `tenantId` to equal the resolved tenant (`tenant_mismatch`)
//!    - evaluates the role × action × resource matrix
//!
//! ## Security
//!
//! - Passwords are hashed with Argon2id; unknown emails still pay for one
//!   verification
//! - Tokens are stateless; refresh does not revoke the presented token
//! - Denials are written to the `security` tracing target

pub mod claims;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod password;
pub mod roles;
pub mod service;
pub mod throttle;
pub mod token;
pub mod validation;

pub use claims::{TokenClaims, UserContext};
pub use error::{AuthError, AuthErrorCode, FieldError};
pub use extractor::{Auth, OptionalAuth};
pub use middleware::{bearer_token, optional_auth, require_auth, AuthGate};
pub use password::{password_strength, PasswordHasher, PasswordStrength};
pub use roles::{Action, Permission, Resource, Role};
pub use service::AuthService;
pub use throttle::{AllowAll, LoginThrottle};
pub use token::{TokenCodec, TokenConfig, TokenError};
