use std::path::{Path, PathBuf};

use reqwest::{Method, RequestBuilder};
use tokio::sync::Mutex;

use crate::config::OAuthConfig;
use crate::error::Result;
use crate::flow::{AuthorizationFlow, BrowserFlow, refresh_token};
use crate::token::OAuthToken;

/// Loads cached tokens or runs an [`AuthorizationFlow`] to obtain new ones.
pub struct TokenManager<F = BrowserFlow> {
    config: OAuthConfig,
    flow: F,
    http: reqwest::Client,
}

impl TokenManager<BrowserFlow> {
    /// Manager that falls back to the interactive browser flow.
    pub fn new(config: OAuthConfig) -> Self {
        let http = reqwest::Client::new();
        let flow = BrowserFlow::new(http.clone());
        Self { config, flow, http }
    }

    /// How long the browser flow waits for the redirect; `None` waits indefinitely.
    pub fn with_auth_timeout(mut self, timeout: Option<std::time::Duration>) -> Self {
        self.flow = self.flow.with_timeout(timeout);
        self
    }
}

impl<F: AuthorizationFlow> TokenManager<F> {
    pub fn with_flow(config: OAuthConfig, flow: F) -> Self {
        Self {
            config,
            flow,
            http: reqwest::Client::new(),
        }
    }

    /// Return a client for the account whose token lives at `token_path`.
    ///
    /// A readable token file is reused as-is. A missing or undecodable one
    /// triggers a single authorization and is overwritten with the result.
    pub async fn obtain(&self, token_path: impl AsRef<Path>) -> Result<AuthorizedClient> {
        let token_path = token_path.as_ref();

        let token = match OAuthToken::load_from_file(token_path) {
            Ok(token) => {
                tracing::info!(path = %token_path.display(), "Using cached OAuth token");
                token
            }
            Err(e) => {
                tracing::info!(
                    path = %token_path.display(),
                    reason = %e,
                    "No usable cached OAuth token, starting authorization"
                );
                let token = self.flow.authorize(&self.config).await?;
                tracing::info!(path = %token_path.display(), "Saving OAuth token");
                token.save_to_file(token_path)?;
                token
            }
        };

        Ok(AuthorizedClient::new(
            self.http.clone(),
            self.config.clone(),
            token,
            Some(token_path.to_path_buf()),
        ))
    }
}

/// Obtain an authorized client using the interactive browser flow when needed.
pub async fn obtain_token(
    config: &OAuthConfig,
    token_path: impl AsRef<Path>,
) -> Result<AuthorizedClient> {
    TokenManager::new(config.clone()).obtain(token_path).await
}

/// HTTP client that attaches a bearer token to every request, refreshing it
/// first when it is about to expire.
#[derive(Debug)]
pub struct AuthorizedClient {
    http: reqwest::Client,
    config: OAuthConfig,
    token: Mutex<OAuthToken>,
    token_path: Option<PathBuf>,
}

impl AuthorizedClient {
    /// Wrap `token`; refreshed tokens are written back to `token_path` if given.
    pub fn new(
        http: reqwest::Client,
        config: OAuthConfig,
        token: OAuthToken,
        token_path: Option<PathBuf>,
    ) -> Self {
        Self {
            http,
            config,
            token: Mutex::new(token),
            token_path,
        }
    }

    /// Get valid access token, refreshing if necessary
    pub async fn access_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;

        if token.is_expired() {
            tracing::info!("Access token expired, refreshing");
            let refreshed = refresh_token(&self.http, &self.config, &token).await?;
            if let Some(path) = &self.token_path {
                refreshed.save_to_file(path)?;
            }
            *token = refreshed;
        }

        Ok(token.access_token.clone())
    }

    /// Start a request with the `Authorization` header already set.
    pub async fn request(&self, method: Method, url: reqwest::Url) -> Result<RequestBuilder> {
        let access_token = self.access_token().await?;
        Ok(self.http.request(method, url).bearer_auth(access_token))
    }
}
