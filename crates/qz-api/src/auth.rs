use axum::async_trait;
use axum::extract::FromRef;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;

/// Shared-key auth for service-to-service callers. Per-user identity travels
/// in the request payloads; issuing user tokens stays with the identity
/// collaborator.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct AuthUser;

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    AuthConfig: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AuthConfig::from_ref(state);
        authorize_api_key(parts, &config)
    }
}

fn authorize_api_key(parts: &Parts, config: &AuthConfig) -> Result<AuthUser, ApiError> {
    let provided = parts
        .headers
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("missing X-API-Key header".into()))?;

    if provided != config.api_key {
        return Err(ApiError::Unauthorized("invalid API key".into()));
    }

    Ok(AuthUser)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_key(key: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(key) = key {
            builder = builder.header("x-api-key", key);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        parts
    }

    fn config() -> AuthConfig {
        AuthConfig {
            api_key: "secret".into(),
        }
    }

    #[test]
    fn accepts_the_configured_key() {
        let parts = parts_with_key(Some("secret"));
        assert!(authorize_api_key(&parts, &config()).is_ok());
    }

    #[test]
    fn rejects_a_wrong_key() {
        let parts = parts_with_key(Some("other"));
        let err = authorize_api_key(&parts, &config()).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn rejects_a_missing_header() {
        let parts = parts_with_key(None);
        let err = authorize_api_key(&parts, &config()).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }
}
