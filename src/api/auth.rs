//! Caller identity and validated request bodies.
//!
//! Authentication happens upstream; the gateway forwards the verified user
//! as `x-user-id` / `x-user-email` / `x-user-role` headers.

use async_trait::async_trait;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request},
    http::{request::Parts, Extensions, StatusCode},
    Json,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use super::middleware::RequestId;
use super::ApiError;
use crate::error::MarketplaceError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role { #[default] Customer, Tailor, Admin }

impl Role {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "customer" => Some(Self::Customer),
            "tailor" => Some(Self::Tailor),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub role: Role,
}

impl CurrentUser {
    pub fn require_role(&self, role: Role, request_id: &RequestId) -> Result<(), ApiError> {
        if self.role == role { return Ok(()); }
        Err(ApiError::from_domain(request_id, MarketplaceError::Forbidden))
    }

    pub fn require_admin(&self, request_id: &RequestId) -> Result<(), ApiError> { self.require_role(Role::Admin, request_id) }
}

/// The id set by the request-id middleware, or a fresh one when the
/// extractor runs outside it.
pub(crate) fn request_id_of(extensions: &Extensions) -> RequestId {
    extensions.get::<RequestId>().cloned().unwrap_or_else(|| RequestId(Uuid::new_v4().to_string()))
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let request_id = request_id_of(&parts.extensions);
        let header = |name: &str| parts.headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim).filter(|v| !v.is_empty());

        let id = header(USER_ID_HEADER)
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or_else(|| ApiError::from_domain(&request_id, MarketplaceError::Unauthorized))?;
        let role = match header(USER_ROLE_HEADER) {
            None => Role::Customer,
            Some(raw) => Role::parse(raw).ok_or_else(|| ApiError::new(&request_id, StatusCode::UNAUTHORIZED, "unauthorized", format!("unknown role '{raw}'")))?,
        };
        Ok(Self { id, email: header(USER_EMAIL_HEADER).map(String::from), role })
    }
}

/// JSON body that has passed its `validator` rules.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let request_id = request_id_of(req.extensions());
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e: JsonRejection| {
            ApiError::new(&request_id, StatusCode::BAD_REQUEST, "validation_error", e.body_text())
        })?;
        value.validate().map_err(|e| ApiError::from_domain(&request_id, e.into()))?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request as HttpRequest;

    use super::*;

    async fn extract(headers: &[(&str, &str)]) -> Result<CurrentUser, ApiError> {
        let mut builder = HttpRequest::builder().uri("/");
        for (k, v) in headers { builder = builder.header(*k, *v); }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        CurrentUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_missing_or_malformed_user_id_is_unauthorized() {
        assert_eq!(extract(&[]).await.unwrap_err().status, StatusCode::UNAUTHORIZED);
        assert_eq!(extract(&[(USER_ID_HEADER, "not-a-uuid")]).await.unwrap_err().status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_role_defaults_to_customer() {
        let id = Uuid::new_v4().to_string();
        let user = extract(&[(USER_ID_HEADER, &id), (USER_EMAIL_HEADER, "ada@atelier.test")]).await.unwrap();
        assert_eq!(user.role, Role::Customer);
        assert_eq!(user.email.as_deref(), Some("ada@atelier.test"));

        let admin = extract(&[(USER_ID_HEADER, &id), (USER_ROLE_HEADER, "Admin")]).await.unwrap();
        assert!(admin.require_admin(&RequestId("r".into())).is_ok());
        assert_eq!(user.require_admin(&RequestId("r".into())).unwrap_err().status, StatusCode::FORBIDDEN);
    }
}
