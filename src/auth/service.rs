// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login, registration, refresh and per-request authentication.
//!
//! Store and worker failures are converted to [`AuthError::Internal`] here
//! and never leave this module with driver text attached.

use std::sync::Arc;

use uuid::Uuid;

use super::claims::UserContext;
use super::error::{AuthError, FieldError};
use super::password::{password_strength, PasswordHasher, MIN_PASSWORD_LEN};
use super::throttle::{AllowAll, AttemptKind, LoginThrottle};
use super::token::{check_times, TokenCodec, TokenError};
use super::validation::{
    normalize_email, validate_email, validate_name, validate_phone, MAX_PASSWORD_LEN,
};
use super::Role;
use crate::audit::{RequestMeta, SecurityEvent, SecurityEventType};
use crate::models::{
    AuthResponse, LoginRequest, NewUser, RefreshResponse, RegisterRequest, StoredUser, Tenant,
};
use crate::storage::{StoreError, UserStore};

/// Expired tokens stay refreshable for this long after `exp` (5 minutes).
pub const REFRESH_GRACE_SECS: i64 = 5 * 60;

/// Tokens issued longer ago than this are never refreshed (7 days).
pub const MAX_REFRESH_AGE_SECS: i64 = 7 * 24 * 60 * 60;

/// Authentication orchestration for one deployment.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    hasher: Arc<PasswordHasher>,
    tokens: TokenCodec,
    throttle: Arc<dyn LoginThrottle>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, hasher: PasswordHasher, tokens: TokenCodec) -> Self {
        Self {
            users,
            hasher: Arc::new(hasher),
            tokens,
            throttle: Arc::new(AllowAll),
        }
    }

    /// Replace the attempt throttle.
    pub fn with_throttle(mut self, throttle: Arc<dyn LoginThrottle>) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn tokens(&self) -> &TokenCodec {
        &self.tokens
    }

    /// Authenticate with email and password within `tenant_id`.
    ///
    /// Unknown emails and wrong passwords are indistinguishable, including
    /// in timing: a dummy hash is verified when no user matches.
    pub async fn login(
        &self,
        tenant_id: Uuid,
        request: LoginRequest,
        meta: &RequestMeta,
    ) -> Result<AuthResponse, AuthError> {
        let email = normalize_email(&request.email);
        let mut fields = Vec::new();
        if email.is_empty() {
            fields.push(FieldError::new("email", "Email is required"));
        }
        if request.password.is_empty() {
            fields.push(FieldError::new("password", "Password is required"));
        }
        if !fields.is_empty() {
            return Err(AuthError::Validation(fields));
        }

        if !self.throttle.allow(AttemptKind::Login, tenant_id, &email).await {
            return Err(self.reject(
                SecurityEventType::LoginFailed,
                tenant_id,
                meta,
                AuthError::RateLimited,
            ));
        }

        let user = self
            .users
            .find_user_by_email(tenant_id, &email)
            .await
            .map_err(store_failure)?;

        let password_ok = self
            .check_password(request.password, user.as_ref().map(|u| u.password_hash.clone()))
            .await?;

        match user {
            Some(user) if password_ok => {
                let response = self.issue(&user)?;
                SecurityEvent::new(SecurityEventType::LoginSucceeded)
                    .with_tenant(tenant_id)
                    .with_user(user.id)
                    .with_request(meta.clone())
                    .emit();
                Ok(response)
            }
            _ => Err(self.reject(
                SecurityEventType::LoginFailed,
                tenant_id,
                meta,
                AuthError::InvalidCredentials,
            )),
        }
    }

    /// Create a user in `tenant` and sign them in.
    pub async fn register(
        &self,
        tenant: &Tenant,
        request: RegisterRequest,
        meta: &RequestMeta,
    ) -> Result<AuthResponse, AuthError> {
        let email = normalize_email(&request.email);
        let role = validate_registration(tenant, &email, &request)?;

        if !self
            .throttle
            .allow(AttemptKind::Register, tenant.id, &email)
            .await
        {
            return Err(self.reject(
                SecurityEventType::RegistrationFailed,
                tenant.id,
                meta,
                AuthError::RateLimited,
            ));
        }

        let existing = self
            .users
            .find_user_by_email(tenant.id, &email)
            .await
            .map_err(store_failure)?;
        if existing.is_some() {
            return Err(self.reject(
                SecurityEventType::RegistrationFailed,
                tenant.id,
                meta,
                AuthError::EmailAlreadyExists,
            ));
        }

        let password_hash = self.hash_password(request.password).await?;
        let phone = request
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        let created = self
            .users
            .create_user(NewUser {
                tenant_id: tenant.id,
                email,
                password_hash,
                role,
                first_name: Some(request.first_name.trim().to_string()),
                last_name: Some(request.last_name.trim().to_string()),
                phone,
            })
            .await;

        let user = match created {
            Ok(user) => user,
            // Lost a race with a concurrent registration for the same email.
            Err(StoreError::Conflict(_)) => {
                return Err(self.reject(
                    SecurityEventType::RegistrationFailed,
                    tenant.id,
                    meta,
                    AuthError::EmailAlreadyExists,
                ))
            }
            Err(e) => return Err(store_failure(e)),
        };

        let response = self.issue(&user)?;
        SecurityEvent::new(SecurityEventType::Registered)
            .with_tenant(tenant.id)
            .with_user(user.id)
            .with_request(meta.clone())
            .emit();
        Ok(response)
    }

    /// Exchange a token for a fresh one.
    ///
    /// The signature must verify even when the token has expired. Tokens for
    /// another tenant are rejected before any window is evaluated; expired
    /// tokens are accepted for [`REFRESH_GRACE_SECS`] after `exp`, and never
    /// once `iat` is older than [`MAX_REFRESH_AGE_SECS`]. The presented token
    /// is not revoked.
    pub async fn refresh(
        &self,
        token: &str,
        tenant_id: Uuid,
        meta: &RequestMeta,
    ) -> Result<RefreshResponse, AuthError> {
        let claims = self.tokens.verify_signature(token).map_err(|e| {
            self.reject(
                SecurityEventType::RefreshRejected,
                tenant_id,
                meta,
                refresh_failure(e),
            )
        })?;

        if claims.tenant_id != tenant_id {
            SecurityEvent::new(SecurityEventType::TenantMismatch)
                .with_tenant(tenant_id)
                .with_token_tenant(claims.tenant_id)
                .with_user(claims.user_id)
                .with_request(meta.clone())
                .failed(AuthError::TenantMismatch.error_code())
                .emit();
            return Err(AuthError::TenantMismatch);
        }

        let now = self.tokens.now();
        if let Err(e) = check_times(&claims, now, REFRESH_GRACE_SECS) {
            return Err(self.reject(
                SecurityEventType::RefreshRejected,
                tenant_id,
                meta,
                refresh_failure(e),
            ));
        }
        if now.saturating_sub(claims.iat) > MAX_REFRESH_AGE_SECS {
            return Err(self.reject(
                SecurityEventType::RefreshRejected,
                tenant_id,
                meta,
                AuthError::TokenNotRefreshable,
            ));
        }

        let user = self
            .users
            .find_user_by_id(claims.tenant_id, claims.user_id)
            .await
            .map_err(store_failure)?
            .ok_or_else(|| {
                self.reject(
                    SecurityEventType::RefreshRejected,
                    tenant_id,
                    meta,
                    AuthError::UserNotFound,
                )
            })?;

        // Identity and role come from the presented token.
        let subject = UserContext {
            id: claims.user_id,
            tenant_id: claims.tenant_id,
            email: claims.email,
            role: claims.role,
            first_name: user.first_name,
            last_name: user.last_name,
        };
        let issued = self.tokens.sign(&subject)?;

        SecurityEvent::new(SecurityEventType::TokenRefreshed)
            .with_tenant(tenant_id)
            .with_user(subject.id)
            .with_request(meta.clone())
            .emit();

        Ok(RefreshResponse {
            token: issued.token,
            expires_at: issued.expires_at,
        })
    }

    /// Verify a bearer token for a protected request and load its user.
    ///
    /// Order: token verification, user lookup, then the tenant check against
    /// `tenant_id` (the tenant resolved for the request, if any).
    pub async fn authenticate(
        &self,
        token: &str,
        tenant_id: Option<Uuid>,
    ) -> Result<UserContext, AuthError> {
        let claims = self.tokens.verify(token)?;

        let user = self
            .users
            .find_user_by_id(claims.tenant_id, claims.user_id)
            .await
            .map_err(store_failure)?
            .ok_or(AuthError::UserNotFound)?;

        match tenant_id {
            Some(id) if id == claims.tenant_id => {}
            _ => return Err(AuthError::TenantMismatch),
        }

        Ok(user.to_context())
    }

    fn issue(&self, user: &StoredUser) -> Result<AuthResponse, AuthError> {
        let context = user.to_context();
        let issued = self.tokens.sign(&context)?;
        Ok(AuthResponse {
            token: issued.token,
            user: context,
            expires_at: issued.expires_at,
        })
    }

    async fn check_password(
        &self,
        password: String,
        hash: Option<String>,
    ) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || match hash {
            Some(hash) => hasher.verify(&password, &hash).unwrap_or_else(|e| {
                tracing::error!(error = %e, "Stored password hash is unreadable");
                false
            }),
            None => hasher.verify_dummy(&password),
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Password verification task failed");
            AuthError::Internal
        })
    }

    async fn hash_password(&self, password: String) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Password hashing task failed");
                AuthError::Internal
            })?
            .map_err(|e| {
                tracing::error!(error = %e, "Password hashing failed");
                AuthError::Internal
            })
    }

    fn reject(
        &self,
        event: SecurityEventType,
        tenant_id: Uuid,
        meta: &RequestMeta,
        error: AuthError,
    ) -> AuthError {
        SecurityEvent::new(event)
            .with_tenant(tenant_id)
            .with_request(meta.clone())
            .failed(error.error_code())
            .emit();
        error
    }
}

/// Field checks, password minimum and role policy for self-registration.
fn validate_registration(
    tenant: &Tenant,
    email: &str,
    request: &RegisterRequest,
) -> Result<Role, AuthError> {
    let mut fields = Vec::new();
    if let Err(e) = validate_email(email) {
        fields.push(e);
    }
    if let Err(e) = validate_name("firstName", &request.first_name) {
        fields.push(e);
    }
    if let Err(e) = validate_name("lastName", &request.last_name) {
        fields.push(e);
    }
    if let Some(phone) = request.phone.as_deref().filter(|p| !p.trim().is_empty()) {
        if let Err(e) = validate_phone(phone) {
            fields.push(e);
        }
    }
    if request.password.chars().count() > MAX_PASSWORD_LEN {
        fields.push(FieldError::new("password", "Password is too long"));
    }

    let settings = &tenant.settings;
    let role = match request.role {
        Some(role) if role != Role::Owner && settings.allowed_registration_roles.contains(&role) => {
            role
        }
        Some(_) => {
            fields.push(FieldError::new("role", "Role is not available for registration"));
            Role::Customer
        }
        None if settings.default_role != Role::Owner => settings.default_role,
        None => Role::Customer,
    };

    if !fields.is_empty() {
        return Err(AuthError::Validation(fields));
    }

    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword(password_strength(&request.password)));
    }
    Ok(role)
}

fn refresh_failure(error: TokenError) -> AuthError {
    match error {
        TokenError::WeakSecret | TokenError::Encoding(_) => AuthError::from(error),
        _ => AuthError::TokenInvalid,
    }
}

fn store_failure(error: StoreError) -> AuthError {
    tracing::error!(error = %error, "User store operation failed");
    AuthError::Internal
}
