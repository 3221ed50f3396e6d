use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::errors::ServiceError;

/// Explicit tenant/user identity for a request. Every service operation
/// takes one; nothing tenant-related is ambient. Upstream authentication
/// (an external collaborator) is responsible for validating the identity
/// and setting the headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantContext {
    pub account_id: Uuid,
    pub user_id: Uuid,
}

impl TenantContext {
    pub fn new(account_id: Uuid, user_id: Uuid) -> Self {
        Self {
            account_id,
            user_id,
        }
    }
}

const ACCOUNT_HEADER: &str = "x-account-id";
const USER_HEADER: &str = "x-user-id";

fn header_uuid(parts: &Parts, name: &str) -> Result<Uuid, ServiceError> {
    let raw = parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServiceError::Unauthorized(format!("missing {} header", name)))?;

    Uuid::parse_str(raw)
        .map_err(|_| ServiceError::Unauthorized(format!("invalid {} header", name)))
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let account_id = header_uuid(parts, ACCOUNT_HEADER)?;
        let user_id = header_uuid(parts, USER_HEADER)?;
        Ok(TenantContext::new(account_id, user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_headers(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn extracts_account_and_user() {
        let account = Uuid::new_v4();
        let user = Uuid::new_v4();
        let mut parts = parts_with_headers(&[
            (ACCOUNT_HEADER, &account.to_string()),
            (USER_HEADER, &user.to_string()),
        ]);

        let ctx = TenantContext::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(ctx.account_id, account);
        assert_eq!(ctx.user_id, user);
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let mut parts = parts_with_headers(&[(ACCOUNT_HEADER, &Uuid::new_v4().to_string())]);

        let err = TenantContext::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn malformed_uuid_is_unauthorized() {
        let mut parts = parts_with_headers(&[
            (ACCOUNT_HEADER, "not-a-uuid"),
            (USER_HEADER, &Uuid::new_v4().to_string()),
        ]);

        let err = TenantContext::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }
}
