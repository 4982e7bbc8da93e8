// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request extractors for the caller identity and idempotency keys.
//!
//! The gateway sits behind a trusted front end that has already
//! authenticated the user; it forwards the identity in headers.

use std::str::FromStr;

use attend_core::{AttendError, Role, TenantContext};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const USER_HEADER: &str = "x-user-id";
pub const ROLE_HEADER: &str = "x-user-role";
pub const IDEMPOTENCY_HEADER: &str = "idempotency-key";

const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// The tenant context of the caller.
#[derive(Debug, Clone)]
pub struct Caller(pub TenantContext);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let tenant_id = header(parts, TENANT_HEADER).ok_or_else(|| {
            AttendError::InvalidArgument(format!("missing {TENANT_HEADER} header"))
        })?;
        let user_id = header(parts, USER_HEADER)
            .ok_or_else(|| AttendError::InvalidArgument(format!("missing {USER_HEADER} header")))?;
        let role = match header(parts, ROLE_HEADER) {
            None => Role::Agent,
            Some(raw) => Role::from_str(raw).map_err(|_| {
                AttendError::InvalidArgument(format!("unknown role `{raw}`"))
            })?,
        };
        Ok(Caller(TenantContext::new(tenant_id, user_id, role)))
    }
}

/// Optional `Idempotency-Key` header.
#[derive(Debug, Clone, Default)]
pub struct IdempotencyKey(pub Option<String>);

impl IdempotencyKey {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for IdempotencyKey {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match header(parts, IDEMPOTENCY_HEADER) {
            Some(key) if key.len() > MAX_IDEMPOTENCY_KEY_LEN => Err(AttendError::InvalidArgument(
                format!("idempotency key longer than {MAX_IDEMPOTENCY_KEY_LEN} bytes"),
            )
            .into()),
            key => Ok(IdempotencyKey(key.map(str::to_string))),
        }
    }
}
