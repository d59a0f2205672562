//! Xray feature import client for Xray server and Xray cloud.

use super::XrayClient;
use super::auth::{Credentials, XrayCloudCredentials};
use super::jira::send_checked;
use crate::domain::{ImportFeatureResponse, IssueKey};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Default base URL of Xray cloud.
pub const DEFAULT_CLOUD_URL: &str = "https://xray.cloud.getxray.app";

const TIMEOUT: Duration = Duration::from_secs(120);

/// Where and how to reach Xray.
#[derive(Debug, Clone)]
pub enum XrayMode {
    /// Xray server, running inside Jira and using Jira's credentials.
    Server {
        /// The Jira base URL.
        jira_url: String,
        /// Jira credentials.
        credentials: Credentials,
    },
    /// Xray cloud, authenticating with an API key pair.
    Cloud {
        /// The Xray cloud base URL.
        url: String,
        /// The API key pair.
        credentials: XrayCloudCredentials,
    },
}

/// Imports feature files through the Xray REST API.
#[derive(Debug)]
pub struct XrayHttpClient {
    client: Client,
    mode: XrayMode,
    token: Mutex<Option<String>>,
}

#[derive(Deserialize)]
struct ImportedIssue {
    key: IssueKey,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ImportBody {
    Issues(Vec<ImportedIssue>),
    Detailed {
        #[serde(rename = "updatedOrCreatedTests", default)]
        tests: Vec<ImportedIssue>,
        #[serde(rename = "updatedOrCreatedPreconditions", default)]
        preconditions: Vec<ImportedIssue>,
        #[serde(default)]
        errors: Vec<Value>,
    },
}

impl From<ImportBody> for ImportFeatureResponse {
    fn from(body: ImportBody) -> Self {
        match body {
            ImportBody::Detailed {
                tests,
                preconditions,
                errors,
            } => Self {
                updated_or_created_issues: tests
                    .into_iter()
                    .chain(preconditions)
                    .map(|issue| issue.key)
                    .collect(),
                errors: errors
                    .into_iter()
                    .map(|error| match error {
                        Value::String(message) => message,
                        other => other.to_string(),
                    })
                    .collect(),
            },
            ImportBody::Issues(issues) => Self {
                updated_or_created_issues: issues.into_iter().map(|issue| issue.key).collect(),
                errors: Vec::new(),
            },
        }
    }
}

impl XrayHttpClient {
    /// Create a client for the given Xray deployment.
    ///
    /// # Errors
    ///
    /// Returns `Error::Http` if the HTTP client cannot be built.
    pub fn new(mode: XrayMode) -> Result<Self> {
        let mode = match mode {
            XrayMode::Server {
                jira_url,
                credentials,
            } => XrayMode::Server {
                jira_url: jira_url.trim_end_matches('/').to_string(),
                credentials,
            },
            XrayMode::Cloud { url, credentials } => XrayMode::Cloud {
                url: url.trim_end_matches('/').to_string(),
                credentials,
            },
        };
        Ok(Self {
            client: Client::builder().timeout(TIMEOUT).build()?,
            mode,
            token: Mutex::new(None),
        })
    }

    /// Whether this client talks to Xray cloud.
    #[must_use]
    pub fn is_cloud(&self) -> bool {
        matches!(self.mode, XrayMode::Cloud { .. })
    }

    /// The bearer token for Xray cloud, authenticating on first use.
    async fn cloud_token(&self, url: &str, credentials: &XrayCloudCredentials) -> Result<String> {
        let mut token = self.token.lock().await;
        if let Some(token) = token.as_ref() {
            return Ok(token.clone());
        }

        let endpoint = format!("{url}/api/v2/authenticate");
        debug!(url = %endpoint, "Authenticating with Xray cloud");
        let response = send_checked(self.client.post(&endpoint).json(credentials))
            .await
            .map_err(|e| match e {
                Error::Api { status, body, .. } if status == 401 || status == 403 => {
                    Error::Authentication(format!(
                        "Xray cloud rejected the client id and secret (status {status}): {body}"
                    ))
                }
                other => other,
            })?;
        let fresh: String = response.json().await?;
        *token = Some(fresh.clone());
        Ok(fresh)
    }
}

async fn feature_form(file: &Path) -> Result<Form> {
    let content = tokio::fs::read(file).await?;
    let name = file
        .file_name()
        .map_or_else(|| "feature.feature".to_string(), |n| n.to_string_lossy().into_owned());
    let part = Part::bytes(content).file_name(name).mime_str("text/plain")?;
    Ok(Form::new().part("file", part))
}

#[async_trait]
impl XrayClient for XrayHttpClient {
    async fn import_feature(&self, file: &Path, project_key: &str) -> Result<ImportFeatureResponse> {
        let form = feature_form(file).await?;
        let request = match &self.mode {
            XrayMode::Server {
                jira_url,
                credentials,
            } => {
                let url = format!("{jira_url}/rest/raven/1.0/import/feature");
                debug!(url = %url, file = %file.display(), "Importing feature file");
                credentials.authorize(self.client.post(url))
            }
            XrayMode::Cloud { url, credentials } => {
                let token = self.cloud_token(url, credentials).await?;
                let url = format!("{url}/api/v2/import/feature");
                debug!(url = %url, file = %file.display(), "Importing feature file");
                self.client.post(url).bearer_auth(token)
            }
        };

        let body: ImportBody = send_checked(
            request
                .query(&[("projectKey", project_key)])
                .multipart(form),
        )
        .await?
        .json()
        .await?;
        Ok(body.into())
    }
}
