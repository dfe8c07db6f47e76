//! Basic 认证闸门：按配置决定是否校验凭据，并给出上传身份。

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Basic};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::config::ServerConfig;
use crate::error::ApiError;

/// 上传身份标签；为空表示不加文件名前缀。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Identity(String);

impl Identity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 校验请求凭据。
///
/// 未启用认证时不读取 `Authorization` 头，直接返回空身份，也不会发出质询。
pub fn authenticate(config: &ServerConfig, headers: &HeaderMap) -> Result<Identity, ApiError> {
    let Some(expected) = config.credentials.as_ref() else {
        return Ok(Identity::anonymous());
    };

    // A missing or undecodable header compares like empty credentials.
    let supplied = headers.typed_get::<Authorization<Basic>>();
    let (username, password) = supplied
        .as_ref()
        .map(|auth| (auth.username(), auth.password()))
        .unwrap_or(("", ""));

    let username_ok = username.as_bytes().ct_eq(expected.username.as_bytes());
    let password_ok = password.as_bytes().ct_eq(expected.password.as_bytes());
    if !bool::from(username_ok & password_ok) || supplied.is_none() {
        warn!(has_credentials = supplied.is_some(), "basic auth rejected");
        return Err(ApiError::Unauthorized);
    }

    Ok(Identity(username.to_string()))
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let config = parts
            .extensions
            .get::<Arc<ServerConfig>>()
            .cloned()
            .ok_or_else(|| ApiError::Internal("server config missing".into()))?;
        authenticate(&config, &parts.headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use axum::http::{HeaderValue, header};
    use std::path::PathBuf;

    fn config(credentials: Option<(&str, &str)>) -> ServerConfig {
        ServerConfig {
            credentials: credentials.map(|(username, password)| Credentials {
                username: username.to_string(),
                password: password.to_string(),
            }),
            save_dir: PathBuf::from("/tmp"),
            advertised_url: "http://127.0.0.1:5000/".to_string(),
        }
    }

    fn basic_headers(username: &str, password: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.typed_insert(Authorization::basic(username, password));
        headers
    }

    #[test]
    fn disabled_security_ignores_any_header() {
        let config = config(None);
        assert_eq!(
            authenticate(&config, &HeaderMap::new()).expect("anonymous"),
            Identity::anonymous()
        );
        assert_eq!(
            authenticate(&config, &basic_headers("mallory", "nope")).expect("anonymous"),
            Identity::anonymous()
        );

        let mut garbage = HeaderMap::new();
        garbage.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic !!!"));
        assert!(authenticate(&config, &garbage).is_ok());
    }

    #[test]
    fn matching_credentials_yield_supplied_username() {
        let config = config(Some(("alice", "secret")));
        let identity = authenticate(&config, &basic_headers("alice", "secret")).expect("accepted");
        assert_eq!(identity.as_str(), "alice");
    }

    #[test]
    fn any_mismatch_is_unauthorized() {
        let config = config(Some(("alice", "secret")));
        for (username, password) in [
            ("alice", "wrong"),
            ("bob", "secret"),
            ("", ""),
            ("alice", ""),
            ("alicealice", "secret"),
        ] {
            assert!(
                matches!(
                    authenticate(&config, &basic_headers(username, password)),
                    Err(ApiError::Unauthorized)
                ),
                "{username}:{password} should be rejected"
            );
        }
    }

    #[test]
    fn missing_or_malformed_header_is_unauthorized() {
        let config = config(Some(("alice", "secret")));
        assert!(matches!(
            authenticate(&config, &HeaderMap::new()),
            Err(ApiError::Unauthorized)
        ));

        let mut bearer = HeaderMap::new();
        bearer.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer token"));
        assert!(matches!(
            authenticate(&config, &bearer),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn empty_password_requires_header() {
        // Empty configured password must not let a header-less request through.
        let config = config(Some(("alice", "")));
        assert!(matches!(
            authenticate(&config, &HeaderMap::new()),
            Err(ApiError::Unauthorized)
        ));
        assert!(authenticate(&config, &basic_headers("alice", "")).is_ok());
    }
}
