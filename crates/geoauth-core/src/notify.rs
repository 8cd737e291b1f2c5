//! Login callback: forwards the session snapshot to the game backend.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

use crate::session::Session;
use crate::util::{compact_text, is_http_url};

pub const DEFAULT_CALLBACK_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("callback request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("callback endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid callback endpoint: {0}")]
    InvalidEndpoint(String),
}

pub trait SessionNotifier: Send + Sync {
    fn notify(
        &self,
        session: &Session,
    ) -> impl Future<Output = Result<(), NotificationError>> + Send;
}

/// Used when no callback endpoint is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl SessionNotifier for NoopNotifier {
    async fn notify(&self, session: &Session) -> Result<(), NotificationError> {
        tracing::debug!(user = %session.id, "no login callback configured");
        Ok(())
    }
}

/// POSTs the session JSON to a fixed endpoint.
#[derive(Debug, Clone)]
pub struct HttpCallbackNotifier {
    endpoint: String,
    client: Client,
}

impl HttpCallbackNotifier {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, NotificationError> {
        let endpoint = endpoint.into().trim().to_string();
        if !is_http_url(&endpoint) {
            return Err(NotificationError::InvalidEndpoint(format!(
                "'{endpoint}' must include http:// or https://"
            )));
        }

        Ok(Self {
            endpoint,
            client: Client::builder().timeout(timeout).build()?,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl SessionNotifier for HttpCallbackNotifier {
    async fn notify(&self, session: &Session) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(session)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Status {
                status,
                body: compact_text(&body),
            });
        }

        tracing::debug!(endpoint = %self.endpoint, user = %session.id, "login callback delivered");
        Ok(())
    }
}

/// Either notifier, chosen from configuration at runtime.
#[derive(Debug, Clone)]
pub enum CallbackNotifier {
    Http(HttpCallbackNotifier),
    Disabled(NoopNotifier),
}

impl CallbackNotifier {
    pub fn from_endpoint(
        endpoint: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, NotificationError> {
        match endpoint {
            Some(endpoint) => Ok(Self::Http(HttpCallbackNotifier::new(endpoint, timeout)?)),
            None => Ok(Self::Disabled(NoopNotifier)),
        }
    }
}

impl SessionNotifier for CallbackNotifier {
    async fn notify(&self, session: &Session) -> Result<(), NotificationError> {
        match self {
            Self::Http(notifier) => notifier.notify(session).await,
            Self::Disabled(notifier) => notifier.notify(session).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::flow::testing::sample_session;

    #[test]
    fn http_notifier_requires_http_scheme() {
        let error = HttpCallbackNotifier::new(
            "geogame-api.keremkk.com.tr/api/login/callback",
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert!(matches!(error, NotificationError::InvalidEndpoint(_)));
    }

    #[test]
    fn from_endpoint_selects_variant() {
        let timeout = Duration::from_secs(DEFAULT_CALLBACK_TIMEOUT_SECS);
        assert!(matches!(
            CallbackNotifier::from_endpoint(None, timeout).unwrap(),
            CallbackNotifier::Disabled(_)
        ));
        let notifier = CallbackNotifier::from_endpoint(
            Some(" https://geogame-api.keremkk.com.tr/api/login/callback "),
            timeout,
        )
        .unwrap();
        match notifier {
            CallbackNotifier::Http(http) => assert_eq!(
                http.endpoint(),
                "https://geogame-api.keremkk.com.tr/api/login/callback"
            ),
            CallbackNotifier::Disabled(_) => panic!("expected http notifier"),
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn http_notifier_posts_session_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/login/callback"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "uid": "user-1",
                "displayName": "user-1",
                "email": "user-1@example.com",
                "profilePicture": "https://api.dicebear.com/8.x/initials/svg?seed=user-1",
                "accessToken": "user-1-access",
                "refreshToken": "user-1-refresh"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = HttpCallbackNotifier::new(
            format!("{}/api/login/callback", server.uri()),
            Duration::from_secs(1),
        )
        .unwrap();
        notifier.notify(&sample_session("user-1")).await.unwrap();
    }

    #[tokio::test(flavor = "current_thread")]
    async fn http_notifier_reports_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("  oops \n"))
            .mount(&server)
            .await;

        let notifier = HttpCallbackNotifier::new(server.uri(), Duration::from_secs(1)).unwrap();
        match notifier.notify(&sample_session("user-1")).await.unwrap_err() {
            NotificationError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "oops");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
