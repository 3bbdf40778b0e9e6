use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use tracing::{info, warn};

use super::descriptor::ToolDescriptor;
use super::handler::ToolHandler;
use super::result::ToolResult;

pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Looks up a GitHub user's public profile via `GET /users/{username}`.
///
/// Every call is a fresh round-trip: no caching, no retries. All failures
/// come back as [`ToolResult::Failure`] so the model can explain them.
pub struct GitHubUserTool {
    client: reqwest::Client,
    base_url: String,
}

impl GitHubUserTool {
    pub const NAME: &'static str = "fetch_user_info";

    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: GITHUB_API_URL.into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// The descriptor the model sees for this tool.
    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(
            Self::NAME,
            "Fetch the public GitHub profile of a user or organization by their \
             GitHub username (login handle). Returns the display name, bio, company, \
             location, blog, number of public repositories, follower and following \
             counts, and account creation date. Call this whenever the user asks who \
             someone is on GitHub, or wants details or statistics about a GitHub \
             account.",
        )
        .param(
            "username",
            "string",
            "The GitHub username to look up, e.g. \"octocat\". No leading @.",
            true,
        )
    }

    /// Fetch a user's profile. Returns the API's JSON body verbatim on 2xx.
    pub async fn fetch_user_info(&self, username: &str) -> ToolResult {
        let username = username.trim();
        if username.is_empty() {
            warn!("fetch_user_info called with an empty username");
            return ToolResult::error("username must not be empty");
        }

        let url = match self.user_url(username) {
            Ok(url) => url,
            Err(e) => {
                warn!(username, error = %e, "could not build GitHub URL");
                return ToolResult::error(e);
            }
        };

        info!(username, %url, "fetching GitHub user");

        let resp = match self
            .client
            .get(url)
            .header("user-agent", concat!("github-lookup-agent/", env!("CARGO_PKG_VERSION")))
            .header("accept", "application/vnd.github+json")
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!(username, error = %e, "GitHub request failed");
                return ToolResult::error(format!("request failed: {e}"));
            }
        };

        let status = resp.status();
        let text = match resp.text().await {
            Ok(text) => text,
            Err(e) => {
                warn!(username, error = %e, "failed to read GitHub response");
                return ToolResult::error(format!("failed to read response: {e}"));
            }
        };

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v["message"].as_str().map(String::from))
                .or_else(|| status.canonical_reason().map(String::from))
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            warn!(username, status = status.as_u16(), %message, "GitHub returned an error");
            return ToolResult::http_error(message, status.as_u16());
        }

        match serde_json::from_str::<Value>(&text) {
            Ok(body) => ToolResult::Success(body),
            Err(e) => {
                warn!(username, error = %e, "GitHub returned malformed JSON");
                ToolResult::error(format!("malformed response: {e}"))
            }
        }
    }

    /// `{base}/users/{username}`, with the username as one encoded path segment.
    fn user_url(&self, username: &str) -> Result<Url, String> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| format!("invalid base URL {}: {e}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| format!("invalid base URL {}", self.base_url))?
            .pop_if_empty()
            .push("users")
            .push(username);
        Ok(url)
    }
}

impl Default for GitHubUserTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for GitHubUserTool {
    async fn call(&self, arguments: &Value) -> ToolResult {
        match arguments["username"].as_str() {
            Some(username) => self.fetch_user_info(username).await,
            None => {
                warn!(%arguments, "fetch_user_info called without a string `username`");
                ToolResult::error("missing required string argument `username`")
            }
        }
    }
}
