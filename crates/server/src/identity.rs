//! Caller identity, as asserted by the upstream authentication layer.
//!
//! Session issuance and token verification are outside this service; the
//! reverse proxy in front of it resolves the session and forwards the
//! account id and role as `x-user-id` / `x-user-role` headers. A request
//! without the id header never reaches a handler.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use fixbid_core::UserId;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Provider,
    Admin,
}

impl Role {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "provider" => Self::Provider,
            "admin" => Self::Admin,
            _ => Self::User,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    pub fn is_provider(&self) -> bool {
        self.role == Role::Provider
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        let Some(user_id) = user_id else {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "caller identity is missing",
                    "code": "unauthenticated",
                })),
            ));
        };

        let role = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(Role::parse)
            .unwrap_or(Role::User);

        Ok(Identity { user_id: UserId(user_id.to_string()), role })
    }
}

#[cfg(test)]
mod tests {
    use super::Role;

    #[test]
    fn unknown_roles_degrade_to_plain_user() {
        assert_eq!(Role::parse("provider"), Role::Provider);
        assert_eq!(Role::parse("Admin"), Role::Admin);
        assert_eq!(Role::parse("shopkeeper"), Role::User);
        assert_eq!(Role::parse(""), Role::User);
    }
}
