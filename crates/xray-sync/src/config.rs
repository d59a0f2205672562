//! Configuration file and environment credentials.
//!
//! The configuration lives in a YAML file (`xray-sync.yaml` by default):
//!
//! ```yaml
//! jira:
//!   url: https://jira.example.com
//!   project-key: CYP
//!   fields:
//!     test-type: customfield_10100
//! xray:
//!   cloud: false
//! cucumber:
//!   prefixes:
//!     test: "TestName:"
//!     precondition: "Precondition:"
//! ```
//!
//! Credentials never live in the file. They are read from the environment,
//! see [`jira_credentials`] and [`xray_cloud_credentials`].

use crate::client::xray::DEFAULT_CLOUD_URL;
use crate::client::{Credentials, XrayCloudCredentials, XrayMode};
use crate::error::{Error, Result};
use crate::repository::FieldIdOverrides;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use xray_gherkin::references::{is_valid_project_key, TagPrefixes};

/// Default configuration file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "xray-sync.yaml";

/// Username for basic authentication.
pub const ENV_JIRA_USERNAME: &str = "JIRA_USERNAME";
/// API token for basic authentication (Jira cloud).
pub const ENV_JIRA_API_TOKEN: &str = "JIRA_API_TOKEN";
/// Password for basic authentication (Jira server).
pub const ENV_JIRA_PASSWORD: &str = "JIRA_PASSWORD";
/// Personal access token (Jira server).
pub const ENV_JIRA_TOKEN: &str = "JIRA_TOKEN";
/// Client id of an Xray cloud API key.
pub const ENV_XRAY_CLIENT_ID: &str = "XRAY_CLIENT_ID";
/// Client secret of an Xray cloud API key.
pub const ENV_XRAY_CLIENT_SECRET: &str = "XRAY_CLIENT_SECRET";

/// The complete configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SyncConfig {
    /// Jira connection and project.
    pub jira: JiraConfig,

    /// Xray deployment.
    #[serde(default)]
    pub xray: XrayConfig,

    /// Feature file conventions.
    #[serde(default)]
    pub cucumber: CucumberConfig,
}

/// The `jira` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct JiraConfig {
    /// Base URL of the Jira instance.
    pub url: String,

    /// Key of the project the feature files belong to.
    pub project_key: String,

    /// Explicit field ids, for fields whose names are ambiguous.
    #[serde(default)]
    pub fields: FieldIdOverrides,
}

/// The `xray` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct XrayConfig {
    /// Whether Xray cloud is used instead of Xray server.
    #[serde(default)]
    pub cloud: bool,

    /// Base URL of Xray cloud, if not the default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// The `cucumber` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CucumberConfig {
    /// Prefixes of issue references in feature files.
    #[serde(default)]
    pub prefixes: PrefixConfig,
}

/// The `cucumber.prefixes` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PrefixConfig {
    /// Prefix of test tags, e.g. `TestName:` for `@TestName:CYP-1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,

    /// Prefix of precondition comments, e.g. `Precondition:`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precondition: Option<String>,
}

impl SyncConfig {
    /// Load and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read and `Error::Config` if
    /// it is malformed or invalid.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        Self::from_yaml(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Parse and validate configuration text.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the text is malformed or invalid.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot check.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.jira.url.trim().is_empty() {
            return Err(Error::Config("jira.url must not be empty".to_string()));
        }
        if !is_valid_project_key(&self.jira.project_key) {
            return Err(Error::Config(format!(
                "Invalid jira.project-key '{}': expected an uppercase letter followed by \
                 uppercase letters, digits or underscores, e.g. CYP",
                self.jira.project_key
            )));
        }
        if let Some(url) = &self.xray.url {
            if !self.xray.cloud {
                return Err(Error::Config(format!(
                    "xray.url '{url}' is only used with Xray cloud; set xray.cloud to true or remove it"
                )));
            }
        }
        Ok(())
    }

    /// The configured reference prefixes.
    #[must_use]
    pub fn tag_prefixes(&self) -> TagPrefixes {
        TagPrefixes::new(
            self.cucumber.prefixes.test.as_deref(),
            self.cucumber.prefixes.precondition.as_deref(),
        )
    }

    /// The Xray deployment, with credentials taken from `env`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if Xray cloud credentials are missing.
    pub fn xray_mode(
        &self,
        jira_credentials: &Credentials,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<XrayMode> {
        if self.xray.cloud {
            Ok(XrayMode::Cloud {
                url: self
                    .xray
                    .url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CLOUD_URL.to_string()),
                credentials: xray_cloud_credentials(env)?,
            })
        } else {
            Ok(XrayMode::Server {
                jira_url: self.jira.url.clone(),
                credentials: jira_credentials.clone(),
            })
        }
    }
}

/// Read an environment variable, treating empty values as unset.
#[must_use]
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// Jira credentials from the environment.
///
/// `JIRA_TOKEN` selects a personal access token. Otherwise `JIRA_USERNAME`
/// with `JIRA_API_TOKEN` or `JIRA_PASSWORD` selects basic authentication.
///
/// # Errors
///
/// Returns `Error::Config` if no complete set of credentials is present.
pub fn jira_credentials(env: impl Fn(&str) -> Option<String>) -> Result<Credentials> {
    if let Some(token) = env(ENV_JIRA_TOKEN) {
        return Ok(Credentials::pat(token));
    }
    let username = env(ENV_JIRA_USERNAME);
    let password = env(ENV_JIRA_API_TOKEN).or_else(|| env(ENV_JIRA_PASSWORD));
    match (username, password) {
        (Some(username), Some(password)) => Ok(Credentials::basic(username, password)),
        (Some(_), None) => Err(Error::Config(format!(
            "{ENV_JIRA_USERNAME} is set but neither {ENV_JIRA_API_TOKEN} nor {ENV_JIRA_PASSWORD} is"
        ))),
        (None, _) => Err(Error::Config(format!(
            "Missing Jira credentials: set {ENV_JIRA_TOKEN}, or {ENV_JIRA_USERNAME} together with \
             {ENV_JIRA_API_TOKEN} (Jira cloud) or {ENV_JIRA_PASSWORD} (Jira server)"
        ))),
    }
}

/// Xray cloud credentials from `XRAY_CLIENT_ID` and `XRAY_CLIENT_SECRET`.
///
/// # Errors
///
/// Returns `Error::Config` if either variable is missing.
pub fn xray_cloud_credentials(
    env: impl Fn(&str) -> Option<String>,
) -> Result<XrayCloudCredentials> {
    match (env(ENV_XRAY_CLIENT_ID), env(ENV_XRAY_CLIENT_SECRET)) {
        (Some(id), Some(secret)) => Ok(XrayCloudCredentials::new(id, secret)),
        _ => Err(Error::Config(format!(
            "Xray cloud requires {ENV_XRAY_CLIENT_ID} and {ENV_XRAY_CLIENT_SECRET}"
        ))),
    }
}
