//! Jira REST API v2 client for Jira server and Jira cloud.

use super::JiraClient;
use super::auth::Credentials;
use crate::domain::{FieldDescriptor, IssueEdit, IssueKey, SearchIssue};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Issues requested per search page.
const PAGE_SIZE: usize = 100;

const TIMEOUT: Duration = Duration::from_secs(60);

/// Jira client speaking REST API v2.
///
/// Jira server searches through `/rest/api/2/search` with offset paging.
/// Jira cloud only offers `/rest/api/2/search/jql`, which pages with tokens;
/// enable it with [`JiraHttpClient::with_cloud`].
#[derive(Debug, Clone)]
pub struct JiraHttpClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
    cloud: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    jql: &'a str,
    fields: &'a [String],
    start_at: usize,
    max_results: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JqlSearchRequest<'a> {
    jql: &'a str,
    fields: &'a [String],
    max_results: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_page_token: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JqlSearchPage {
    #[serde(default)]
    issues: Option<Vec<SearchIssue>>,
    #[serde(default)]
    next_page_token: Option<String>,
    #[serde(default)]
    is_last: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchPage {
    #[serde(default)]
    total: Option<usize>,
    #[serde(default)]
    issues: Option<Vec<SearchIssue>>,
}

impl JiraHttpClient {
    /// Create a client for the Jira instance at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Http` if the HTTP client cannot be built.
    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self> {
        let client = Client::builder().timeout(TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            cloud: false,
        })
    }

    /// Use the Jira cloud search endpoint.
    #[must_use]
    pub fn with_cloud(mut self, cloud: bool) -> Self {
        self.cloud = cloud;
        self
    }

    /// The Jira base URL, without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        send_checked(self.credentials.authorize(request)).await
    }

    async fn search_by_offset(
        &self,
        jql: &str,
        fields: &[String],
    ) -> Result<Option<Vec<SearchIssue>>> {
        let url = self.url("/rest/api/2/search");
        let mut issues: Option<Vec<SearchIssue>> = None;
        let mut start_at = 0;

        loop {
            let body = SearchRequest {
                jql,
                fields,
                start_at,
                max_results: PAGE_SIZE,
            };
            debug!(url = %url, start_at, "Searching Jira issues");
            let page: Option<SearchPage> = self
                .send(self.client.post(&url).json(&body))
                .await?
                .json()
                .await?;

            let Some(SearchPage {
                total,
                issues: Some(batch),
            }) = page
            else {
                break;
            };
            let count = batch.len();
            issues.get_or_insert_with(Vec::new).extend(batch);
            start_at += count;

            if count == 0 || total.is_none_or(|total| start_at >= total) {
                break;
            }
        }

        Ok(issues)
    }

    async fn search_by_token(
        &self,
        jql: &str,
        fields: &[String],
    ) -> Result<Option<Vec<SearchIssue>>> {
        let url = self.url("/rest/api/2/search/jql");
        let mut issues: Option<Vec<SearchIssue>> = None;
        let mut next_page_token: Option<String> = None;

        loop {
            let body = JqlSearchRequest {
                jql,
                fields,
                max_results: PAGE_SIZE,
                next_page_token: next_page_token.as_deref(),
            };
            debug!(url = %url, token = ?next_page_token, "Searching Jira issues");
            let page: Option<JqlSearchPage> = self
                .send(self.client.post(&url).json(&body))
                .await?
                .json()
                .await?;

            let Some(JqlSearchPage {
                issues: Some(batch),
                next_page_token: token,
                is_last,
            }) = page
            else {
                break;
            };
            let count = batch.len();
            issues.get_or_insert_with(Vec::new).extend(batch);

            match token {
                Some(token) if count > 0 && is_last != Some(true) => next_page_token = Some(token),
                _ => break,
            }
        }

        Ok(issues)
    }
}

/// Send a request and turn non-success statuses into `Error::Api`.
pub(crate) async fn send_checked(request: RequestBuilder) -> Result<Response> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(Error::Api {
        url,
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl JiraClient for JiraHttpClient {
    async fn search_issues(
        &self,
        jql: &str,
        fields: &[String],
    ) -> Result<Option<Vec<SearchIssue>>> {
        if self.cloud {
            self.search_by_token(jql, fields).await
        } else {
            self.search_by_offset(jql, fields).await
        }
    }

    async fn list_fields(&self) -> Result<Option<Vec<FieldDescriptor>>> {
        let url = self.url("/rest/api/2/field");
        debug!(url = %url, "Listing Jira fields");
        let fields = self.send(self.client.get(&url)).await?.json().await?;
        Ok(fields)
    }

    async fn edit_issue(&self, key: &IssueKey, edit: &IssueEdit) -> Result<()> {
        let url = self.url(&format!("/rest/api/2/issue/{key}"));
        debug!(url = %url, fields = ?edit.fields.keys().collect::<Vec<_>>(), "Editing Jira issue");
        self.send(self.client.put(&url).json(edit)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_removed() {
        let client = JiraHttpClient::new("https://jira.example.com/", Credentials::pat("t")).unwrap();
        assert_eq!(client.base_url(), "https://jira.example.com");
        assert_eq!(
            client.url("/rest/api/2/field"),
            "https://jira.example.com/rest/api/2/field"
        );
    }

    #[test]
    fn test_first_jql_search_request_has_no_token() {
        let fields = vec!["labels".to_string()];
        let body = serde_json::to_value(JqlSearchRequest {
            jql: "issue in (CYP-1)",
            fields: &fields,
            max_results: PAGE_SIZE,
            next_page_token: None,
        })
        .unwrap();

        assert_eq!(
            body,
            serde_json::json!({"jql": "issue in (CYP-1)", "fields": ["labels"], "maxResults": 100})
        );
    }

    #[test]
    fn test_search_request_uses_camel_case() {
        let fields = vec!["summary".to_string()];
        let body = serde_json::to_value(SearchRequest {
            jql: "issue in (CYP-1)",
            fields: &fields,
            start_at: 0,
            max_results: PAGE_SIZE,
        })
        .unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "jql": "issue in (CYP-1)",
                "fields": ["summary"],
                "startAt": 0,
                "maxResults": 100
            })
        );
    }
}
