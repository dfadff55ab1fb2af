//! Request decorator
//!
//! Attaches identity, locale, platform, and bearer-token headers to an
//! outgoing endpoint before it reaches the transport. Pure per-request
//! mutation: no side effects, no failure path; missing values are tolerated
//! by omission.

use std::sync::Arc;

use crate::ports::{BearerTokenSource, Endpoint};

/// `Device-Id` request header.
pub const HEADER_DEVICE_ID: &str = "Device-Id";
/// `Locale` request header.
pub const HEADER_LOCALE: &str = "Locale";
/// `Platform` request header.
pub const HEADER_PLATFORM: &str = "Platform";
/// `Authorization` request header.
pub const HEADER_AUTHORIZATION: &str = "Authorization";

/// Identity of the device issuing requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Stable device identifier; the header is omitted when absent.
    pub device_id: Option<String>,
    /// Locale tag.
    pub locale: String,
    /// Platform name.
    pub platform: String,
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self { device_id: None, locale: "en".to_string(), platform: std::env::consts::OS.to_string() }
    }
}

impl DeviceIdentity {
    /// Build from the device section of the SDK configuration.
    #[must_use]
    pub fn from_config(config: &courier_domain::DeviceConfig) -> Self {
        Self {
            device_id: config.device_id.clone(),
            locale: config.locale.clone(),
            platform: config.platform.clone(),
        }
    }
}

/// Decorates outgoing endpoints with identity and authorization headers.
///
/// The bearer token is read from the [`BearerTokenSource`] on every request,
/// so a replay after a token refresh automatically carries the fresh token.
#[derive(Clone)]
pub struct RequestDecorator {
    identity: DeviceIdentity,
    bearer: Option<Arc<dyn BearerTokenSource>>,
}

impl RequestDecorator {
    /// Decorator attaching identity headers only.
    #[must_use]
    pub fn new(identity: DeviceIdentity) -> Self {
        Self { identity, bearer: None }
    }

    /// Also attach `Authorization: Bearer <token>` when the source holds a
    /// non-empty access token.
    #[must_use]
    pub fn with_bearer_source(mut self, source: Arc<dyn BearerTokenSource>) -> Self {
        self.bearer = Some(source);
        self
    }

    /// Apply the decoration to one outgoing endpoint.
    pub async fn decorate(&self, endpoint: &mut Endpoint) {
        if let Some(device_id) = &self.identity.device_id {
            endpoint.headers.insert(HEADER_DEVICE_ID.to_string(), device_id.clone());
        }
        endpoint.headers.insert(HEADER_LOCALE.to_string(), self.identity.locale.clone());
        endpoint.headers.insert(HEADER_PLATFORM.to_string(), self.identity.platform.clone());

        if let Some(source) = &self.bearer {
            if let Some(token) = source.bearer_token().await {
                if !token.is_empty() {
                    endpoint
                        .headers
                        .insert(HEADER_AUTHORIZATION.to_string(), format!("Bearer {token}"));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::ports::Method;

    struct StaticBearer(Option<String>);

    #[async_trait]
    impl BearerTokenSource for StaticBearer {
        async fn bearer_token(&self) -> Option<String> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn attaches_identity_and_bearer_headers() {
        let identity = DeviceIdentity {
            device_id: Some("device-123".to_string()),
            locale: "en".to_string(),
            platform: "ios".to_string(),
        };
        let decorator = RequestDecorator::new(identity)
            .with_bearer_source(Arc::new(StaticBearer(Some("tok".to_string()))));

        let mut endpoint = Endpoint::new(Method::Get, "profile");
        decorator.decorate(&mut endpoint).await;

        assert_eq!(endpoint.headers.get(HEADER_DEVICE_ID).map(String::as_str), Some("device-123"));
        assert_eq!(endpoint.headers.get(HEADER_LOCALE).map(String::as_str), Some("en"));
        assert_eq!(endpoint.headers.get(HEADER_PLATFORM).map(String::as_str), Some("ios"));
        assert_eq!(
            endpoint.headers.get(HEADER_AUTHORIZATION).map(String::as_str),
            Some("Bearer tok")
        );
    }

    #[tokio::test]
    async fn missing_values_are_omitted() {
        let decorator = RequestDecorator::new(DeviceIdentity {
            device_id: None,
            locale: "en".to_string(),
            platform: "ios".to_string(),
        })
        .with_bearer_source(Arc::new(StaticBearer(None)));

        let mut endpoint = Endpoint::new(Method::Get, "profile");
        decorator.decorate(&mut endpoint).await;

        assert!(!endpoint.headers.contains_key(HEADER_DEVICE_ID));
        assert!(!endpoint.headers.contains_key(HEADER_AUTHORIZATION));
    }

    #[tokio::test]
    async fn empty_token_is_treated_as_absent() {
        let decorator = RequestDecorator::new(DeviceIdentity::default())
            .with_bearer_source(Arc::new(StaticBearer(Some(String::new()))));

        let mut endpoint = Endpoint::new(Method::Get, "profile");
        decorator.decorate(&mut endpoint).await;

        assert!(!endpoint.headers.contains_key(HEADER_AUTHORIZATION));
    }
}
