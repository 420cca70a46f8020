//! Caller identity, as resolved by the identity proxy in front of this server.
//!
//! Authentication itself is delegated: by the time a request reaches these handlers, the fronting
//! proxy has verified whatever credential the client presented and injected the resolved identity
//! as headers. This module only parses those headers; it never validates credentials.

use std::{
    fmt::Display,
    future::{ready, Ready},
    str::FromStr,
};

use actix_web::{http::header::HeaderMap, FromRequest, HttpRequest};
use serde::{Deserialize, Serialize};

use crate::errors::{AuthError, ServerError};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLES_HEADER: &str = "x-user-roles";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            s => Err(AuthError::PoorlyFormattedIdentity(format!("Unknown role: {s}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserClaims {
    pub user_id: String,
    pub roles: Vec<Role>,
}

impl UserClaims {
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }

    pub fn has_roles(&self, required: &[Role]) -> bool {
        required.iter().all(|role| self.roles.contains(role))
    }
}

/// Extracts the resolved identity from the request headers. Absent identity headers mean the
/// request never went through the identity proxy (or the caller is anonymous); both are a 401.
pub fn claims_from_headers(headers: &HeaderMap) -> Result<UserClaims, AuthError> {
    let user_id = headers
        .get(USER_ID_HEADER)
        .ok_or(AuthError::MissingIdentity)?
        .to_str()
        .map_err(|e| AuthError::PoorlyFormattedIdentity(e.to_string()))?
        .trim()
        .to_string();
    if user_id.is_empty() {
        return Err(AuthError::MissingIdentity);
    }
    let roles = match headers.get(USER_ROLES_HEADER) {
        None => vec![Role::User],
        Some(value) => {
            let value = value.to_str().map_err(|e| AuthError::PoorlyFormattedIdentity(e.to_string()))?;
            value.split(',').filter(|s| !s.trim().is_empty()).map(Role::from_str).collect::<Result<Vec<_>, _>>()?
        },
    };
    Ok(UserClaims { user_id, roles })
}

impl FromRequest for UserClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        ready(claims_from_headers(req.headers()).map_err(ServerError::from))
    }
}

#[cfg(test)]
mod test {
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn missing_identity_is_rejected() {
        let req = TestRequest::default().to_http_request();
        let err = claims_from_headers(req.headers()).unwrap_err();
        assert!(matches!(err, AuthError::MissingIdentity));
    }

    #[test]
    fn roles_default_to_user() {
        let req = TestRequest::default().insert_header((USER_ID_HEADER, "alice")).to_http_request();
        let claims = claims_from_headers(req.headers()).unwrap();
        assert_eq!(claims.user_id, "alice");
        assert_eq!(claims.roles, vec![Role::User]);
        assert!(!claims.is_admin());
    }

    #[test]
    fn role_lists_parse() {
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, "carol"))
            .insert_header((USER_ROLES_HEADER, "user, admin"))
            .to_http_request();
        let claims = claims_from_headers(req.headers()).unwrap();
        assert!(claims.is_admin());
        assert!(claims.has_roles(&[Role::User, Role::Admin]));
    }

    #[test]
    fn unknown_roles_are_rejected() {
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, "mallory"))
            .insert_header((USER_ROLES_HEADER, "superuser"))
            .to_http_request();
        let err = claims_from_headers(req.headers()).unwrap_err();
        assert!(matches!(err, AuthError::PoorlyFormattedIdentity(_)));
    }
}
