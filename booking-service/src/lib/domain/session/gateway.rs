use std::collections::BTreeSet;
use std::sync::Arc;

use auth::AccessClaims;
use auth::JwtCodec;
use auth::JwtError;

use crate::domain::session::models::AuthOutcome;
use crate::domain::session::models::Principal;
use crate::domain::session::models::RejectReason;
use crate::domain::user::models::Role;
use crate::domain::user::models::UserId;

const BEARER_PREFIX: &str = "Bearer ";

/// Per-request authentication from the `Authorization` header.
///
/// Never fails: a missing header yields `Anonymous`, anything unacceptable
/// yields `Rejected`. No storage is consulted; the principal comes entirely
/// from the verified claims.
pub struct AuthenticationGateway {
    codec: Arc<JwtCodec>,
}

impl AuthenticationGateway {
    pub fn new(codec: Arc<JwtCodec>) -> Self {
        Self { codec }
    }

    /// Resolve the request identity from the raw `Authorization` header value.
    pub fn authenticate(&self, authorization: Option<&str>) -> AuthOutcome {
        let Some(header) = authorization else {
            return AuthOutcome::Anonymous;
        };

        let token = match header.strip_prefix(BEARER_PREFIX) {
            Some(token) if !token.trim().is_empty() => token.trim(),
            _ => {
                tracing::debug!("Authorization header is not a bearer credential");
                return AuthOutcome::Rejected(RejectReason::Malformed);
            }
        };

        let claims = match self.codec.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "Access token rejected");
                return AuthOutcome::Rejected(reject_reason(&e));
            }
        };

        match principal_from_claims(&claims) {
            Some(principal) => AuthOutcome::Authenticated(principal),
            None => {
                tracing::debug!(sub = %claims.sub, "Access token subject is not a user id");
                AuthOutcome::Rejected(RejectReason::InvalidSubject)
            }
        }
    }
}

fn reject_reason(error: &JwtError) -> RejectReason {
    match error {
        JwtError::Expired => RejectReason::Expired,
        JwtError::InvalidSignature => RejectReason::InvalidSignature,
        _ => RejectReason::Malformed,
    }
}

fn principal_from_claims(claims: &AccessClaims) -> Option<Principal> {
    let user_id = UserId::from_string(&claims.sub).ok()?;

    let roles: BTreeSet<Role> = claims
        .roles
        .iter()
        .filter_map(|role| match role.parse::<Role>() {
            Ok(role) => Some(role),
            Err(_) => {
                tracing::debug!(role = %role, "Ignoring unknown role claim");
                None
            }
        })
        .collect();

    Some(Principal {
        user_id,
        roles,
        guest: claims.guest,
    })
}
