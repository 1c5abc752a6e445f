use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::callback_server::CallbackServer;
use crate::config::OAuthConfig;
use crate::error::{OAuthError, Result};
use crate::token::{OAuthToken, unix_now};

/// PKCE verifier and its S256 challenge.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

fn random_alphanumeric(len: usize) -> String {
    use rand::Rng;
    use rand::distributions::Alphanumeric;

    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generate PKCE verifier and challenge
pub fn generate_pkce() -> PkceChallenge {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use sha2::{Digest, Sha256};

    // Generate random verifier (43-128 characters) using cryptographically secure RNG
    let verifier = random_alphanumeric(64);

    // Generate challenge: base64url(SHA256(verifier))
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    let challenge = URL_SAFE_NO_PAD.encode(hasher.finalize());

    PkceChallenge {
        verifier,
        challenge,
    }
}

/// Generate a random `state` value for the authorization request.
pub fn generate_state() -> String {
    random_alphanumeric(32)
}

/// Generate authorization URL
pub fn generate_auth_url(config: &OAuthConfig, pkce: &PkceChallenge, state: &str) -> String {
    let separator = if config.auth_uri.contains('?') { '&' } else { '?' };
    format!(
        "{}{}\
        client_id={}&\
        redirect_uri={}&\
        response_type=code&\
        scope={}&\
        state={}&\
        code_challenge={}&\
        code_challenge_method=S256&\
        access_type=offline&\
        prompt=consent",
        config.auth_uri,
        separator,
        urlencoding::encode(&config.client_id),
        urlencoding::encode(&config.redirect_uri),
        urlencoding::encode(&config.scopes.join(" ")),
        urlencoding::encode(state),
        urlencoding::encode(&pkce.challenge),
    )
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl TokenResponse {
    fn into_token(self, previous_refresh_token: Option<String>) -> OAuthToken {
        OAuthToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh_token),
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expires_at: self.expires_in.map(|secs| unix_now().saturating_add(secs)),
        }
    }
}

async fn post_token_request(
    http: &reqwest::Client,
    config: &OAuthConfig,
    params: &[(&str, &str)],
) -> Result<TokenResponse> {
    let response = http.post(&config.token_uri).form(params).send().await?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(OAuthError::TokenEndpoint { status, body });
    }

    Ok(response.json().await?)
}

/// Exchange authorization code for tokens
pub async fn exchange_code(
    http: &reqwest::Client,
    config: &OAuthConfig,
    code: &str,
    verifier: &str,
) -> Result<OAuthToken> {
    tracing::info!("Exchanging authorization code for tokens");

    let params = [
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("code", code),
        ("code_verifier", verifier),
        ("grant_type", "authorization_code"),
        ("redirect_uri", config.redirect_uri.as_str()),
    ];
    let token = post_token_request(http, config, &params)
        .await?
        .into_token(None);

    if token.refresh_token.is_none() {
        tracing::warn!(
            "Token endpoint did not return a refresh token; re-authorization will be needed once it expires"
        );
    }
    tracing::info!("Successfully obtained OAuth tokens");
    Ok(token)
}

/// Refresh the access token using the refresh token
pub async fn refresh_token(
    http: &reqwest::Client,
    config: &OAuthConfig,
    current: &OAuthToken,
) -> Result<OAuthToken> {
    let refresh_token = current
        .refresh_token
        .as_deref()
        .ok_or(OAuthError::NoRefreshToken)?;

    tracing::info!("Refreshing OAuth token");

    let params = [
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("refresh_token", refresh_token),
        ("grant_type", "refresh_token"),
    ];
    let token = post_token_request(http, config, &params)
        .await?
        // Keep existing refresh token when the provider does not rotate it
        .into_token(current.refresh_token.clone());

    tracing::info!("OAuth token refreshed successfully");
    Ok(token)
}

/// Produces a fresh token when no usable cached one exists.
#[async_trait]
pub trait AuthorizationFlow: Send + Sync {
    async fn authorize(&self, config: &OAuthConfig) -> Result<OAuthToken>;
}

/// Shows the authorization URL to the user.
pub type AuthPrompt = Arc<dyn Fn(&str) + Send + Sync>;

fn print_auth_banner(auth_url: &str) {
    eprintln!("\n=================================================");
    eprintln!("OAuth 2.0 Authorization Required");
    eprintln!("=================================================");
    eprintln!("\nPlease visit the following URL to authorize the application:\n");
    eprintln!("{}\n", auth_url);
    eprintln!("Waiting for authorization...");
    eprintln!("=================================================\n");
}

/// Interactive authorization-code flow with a local redirect listener.
///
/// The listener binds the host and port of the configured redirect URI and
/// serves its path. A redirect URI with port `0` binds an ephemeral port and
/// the authorization URL carries the port actually bound.
#[derive(Clone)]
pub struct BrowserFlow {
    http: reqwest::Client,
    timeout: Option<Duration>,
    prompt: AuthPrompt,
}

impl BrowserFlow {
    /// Default time to wait for the user to finish in the browser.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            timeout: Some(Self::DEFAULT_TIMEOUT),
            prompt: Arc::new(print_auth_banner),
        }
    }

    /// Override the wait for the redirect; `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the stderr banner that presents the authorization URL.
    pub fn with_prompt(mut self, prompt: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.prompt = Arc::new(prompt);
        self
    }
}

impl Default for BrowserFlow {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl fmt::Debug for BrowserFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserFlow")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AuthorizationFlow for BrowserFlow {
    async fn authorize(&self, config: &OAuthConfig) -> Result<OAuthToken> {
        let pkce = generate_pkce();
        let state = generate_state();

        // Listen before the URL is shown so the redirect cannot arrive early.
        let server = CallbackServer::bind(
            config.callback_addr()?,
            &config.callback_path()?,
            state.clone(),
        )
        .await?;
        let config = config.bound_to(server.local_addr())?;
        let auth_url = generate_auth_url(&config, &pkce, &state);

        (self.prompt)(&auth_url);

        let code = server.wait_for_code(self.timeout).await?;
        exchange_code(&self.http, &config, &code, &pkce.verifier).await
    }
}

/// Prompt that plays the browser: follows the authorization URL straight to
/// the local redirect, approving with `code`.
#[cfg(test)]
pub(crate) fn approving_browser(code: &'static str) -> impl Fn(&str) + Send + Sync + 'static {
    move |auth_url: &str| {
        let url = url::Url::parse(auth_url).unwrap();
        let query: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        let redirect = format!("{}?state={}&code={}", query["redirect_uri"], query["state"], code);
        tokio::spawn(async move {
            let response = reqwest::get(redirect).await.unwrap();
            assert!(response.status().is_success());
        });
    }
}
