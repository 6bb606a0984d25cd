// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login/registration attempt throttling hook.

use async_trait::async_trait;
use uuid::Uuid;

/// Which flow is being attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptKind {
    Login,
    Register,
}

/// Decides whether an attempt may proceed. Implementations back onto a
/// shared counter store; the default allows everything.
#[async_trait]
pub trait LoginThrottle: Send + Sync {
    async fn allow(&self, kind: AttemptKind, tenant_id: Uuid, email: &str) -> bool;
}

/// Never throttles.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl LoginThrottle for AllowAll {
    async fn allow(&self, _kind: AttemptKind, _tenant_id: Uuid, _email: &str) -> bool {
        true
    }
}
