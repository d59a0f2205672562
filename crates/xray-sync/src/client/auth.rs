//! Credentials and authorization headers.

use reqwest::RequestBuilder;
use serde::Serialize;
use std::fmt;

/// Credentials for Jira and Xray server.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Username with password or API token, sent as basic auth.
    Basic {
        /// The username or account email.
        username: String,
        /// The password or API token.
        password: String,
    },
    /// Personal access token, sent as bearer token.
    Pat(String),
}

impl Credentials {
    /// Basic auth credentials.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Personal access token credentials.
    pub fn pat(token: impl Into<String>) -> Self {
        Self::Pat(token.into())
    }

    /// Attach the authorization header to a request.
    #[must_use]
    pub fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Basic { username, password } => request.basic_auth(username, Some(password)),
            Self::Pat(token) => request.bearer_auth(token),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::Pat(_) => f.debug_tuple("Pat").field(&"<redacted>").finish(),
        }
    }
}

/// API key pair exchanged for a bearer token by Xray cloud.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct XrayCloudCredentials {
    /// The client id of the API key.
    pub client_id: String,
    /// The client secret of the API key.
    pub client_secret: String,
}

impl XrayCloudCredentials {
    /// Create a key pair.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for XrayCloudCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XrayCloudCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secrets() {
        let basic = format!("{:?}", Credentials::basic("user", "hunter2"));
        let pat = format!("{:?}", Credentials::pat("secret-token"));
        let cloud = format!("{:?}", XrayCloudCredentials::new("id", "very-secret"));

        assert!(basic.contains("user") && !basic.contains("hunter2"));
        assert!(!pat.contains("secret-token"));
        assert!(cloud.contains("id") && !cloud.contains("very-secret"));
    }

    #[test]
    fn test_authorize_sets_header() {
        let client = reqwest::Client::new();
        let request = Credentials::pat("abc")
            .authorize(client.get("http://localhost/"))
            .build()
            .unwrap();

        assert_eq!(
            request.headers()[reqwest::header::AUTHORIZATION],
            "Bearer abc"
        );
    }

    #[test]
    fn test_cloud_credentials_serialize_as_authenticate_body() {
        let body = serde_json::to_value(XrayCloudCredentials::new("id", "secret")).unwrap();
        assert_eq!(body, serde_json::json!({"client_id": "id", "client_secret": "secret"}));
    }
}
