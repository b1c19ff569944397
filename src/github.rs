//! GitHub repository hook adapter
//!
//! [`RepositoryHost`] is the seam the reconciler talks to; [`GitHubClient`]
//! implements it against the GitHub REST API. The adapter only translates
//! between hook JSON and [`ExistingWebhook`]/[`DesiredWebhook`]; it makes no
//! decisions of its own.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::webhook::{DesiredWebhook, ExistingWebhook};
use crate::Error;

/// Media type GitHub recommends for REST requests
const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// REST API version pinned for all requests
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Page size used when listing hooks (GitHub's maximum)
const HOOKS_PER_PAGE: usize = 100;

/// Upper bound on pages fetched for a single repository
const MAX_HOOK_PAGES: u32 = 50;

/// Per-request timeout for GitHub calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Repository webhook operations the reconciler depends on
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RepositoryHost: Send + Sync {
    /// List every hook configured on `owner/repo`
    async fn list_hooks(&self, owner: &str, repo: &str) -> Result<Vec<ExistingWebhook>, Error>;

    /// Create `desired` as a new hook on `owner/repo`
    async fn create_hook(
        &self,
        owner: &str,
        repo: &str,
        desired: &DesiredWebhook,
    ) -> Result<ExistingWebhook, Error>;
}

/// Hook object as returned by the GitHub API
#[derive(Debug, Deserialize)]
struct HookResponse {
    id: u64,
    #[serde(default)]
    active: bool,
    #[serde(default)]
    events: Vec<String>,
    #[serde(default)]
    config: HookConfigResponse,
}

#[derive(Debug, Default, Deserialize)]
struct HookConfigResponse {
    #[serde(default)]
    url: Option<String>,
}

impl From<HookResponse> for ExistingWebhook {
    fn from(hook: HookResponse) -> Self {
        Self {
            id: hook.id,
            active: hook.active,
            url: hook.config.url,
            events: hook.events,
        }
    }
}

/// GitHub REST client authenticated with a token
#[derive(Clone, Debug)]
pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
}

impl GitHubClient {
    /// Create a client for the API at `base_url` using `token`
    pub fn new(base_url: &str, token: &str) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| Error::config(format!("invalid GitHub token: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("runner-webhook/", env!("CARGO_PKG_VERSION"))),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(client, base_url))
    }

    /// Create a client around an existing `reqwest::Client`
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn hooks_url(&self, owner: &str, repo: &str) -> String {
        format!("{}/repos/{owner}/{repo}/hooks", self.base_url)
    }
}

#[async_trait]
impl RepositoryHost for GitHubClient {
    async fn list_hooks(&self, owner: &str, repo: &str) -> Result<Vec<ExistingWebhook>, Error> {
        const OP: &str = "list_hooks";
        let url = self.hooks_url(owner, repo);
        let mut hooks = Vec::new();

        for page in 1..=MAX_HOOK_PAGES {
            let response = self
                .client
                .get(&url)
                .query(&[("per_page", HOOKS_PER_PAGE.to_string()), ("page", page.to_string())])
                .send()
                .await
                .map_err(|e| Error::github(OP, format!("request failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(Error::github_status(OP, status.as_u16(), body));
            }

            let body = response
                .bytes()
                .await
                .map_err(|e| Error::github(OP, format!("failed to read body: {e}")))?;
            let batch = parse_hooks(&body)?;
            let done = batch.len() < HOOKS_PER_PAGE;
            hooks.extend(batch);
            if done {
                break;
            }
        }

        debug!(owner, repo, count = hooks.len(), "listed repository hooks");
        Ok(hooks)
    }

    async fn create_hook(
        &self,
        owner: &str,
        repo: &str,
        desired: &DesiredWebhook,
    ) -> Result<ExistingWebhook, Error> {
        const OP: &str = "create_hook";
        let response = self
            .client
            .post(self.hooks_url(owner, repo))
            .json(&desired.create_payload())
            .send()
            .await
            .map_err(|e| Error::github(OP, format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::github_status(OP, status.as_u16(), body));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::github(OP, format!("failed to read body: {e}")))?;
        parse_hook(&body)
    }
}

fn parse_hooks(body: &[u8]) -> Result<Vec<ExistingWebhook>, Error> {
    let hooks: Vec<HookResponse> = serde_json::from_slice(body)
        .map_err(|e| Error::github("list_hooks", format!("invalid JSON: {e}")))?;
    Ok(hooks.into_iter().map(ExistingWebhook::from).collect())
}

fn parse_hook(body: &[u8]) -> Result<ExistingWebhook, Error> {
    let hook: HookResponse = serde_json::from_slice(body)
        .map_err(|e| Error::github("create_hook", format!("invalid JSON: {e}")))?;
    Ok(hook.into())
}
