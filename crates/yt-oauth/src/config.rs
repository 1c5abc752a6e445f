use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

use serde::Deserialize;
use url::Url;

use crate::error::{OAuthError, Result};

/// Default OAuth callback port
pub const OAUTH_CALLBACK_PORT: u16 = 8080;

/// Read-only access to the YouTube account.
pub const YOUTUBE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/youtube.readonly";
/// Full access to the YouTube account, required for rating videos.
pub const YOUTUBE_SCOPE: &str = "https://www.googleapis.com/auth/youtube";

const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Redirect URI used when none is configured.
pub fn default_redirect_uri() -> String {
    format!("http://localhost:{}", OAUTH_CALLBACK_PORT)
}

/// Client section of a Google client-secret descriptor (`credentials.json`).
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub auth_uri: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

impl ClientSecret {
    /// Parse a descriptor with either an `installed` or a `web` section.
    pub fn from_json(json: &str) -> std::result::Result<Option<Self>, serde_json::Error> {
        let file: ClientSecretFile = serde_json::from_str(json)?;
        Ok(file.installed.or(file.web))
    }

    /// Load the client secret descriptor from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| OAuthError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
            .map_err(|source| OAuthError::Json {
                path: path.to_path_buf(),
                source,
            })?
            .ok_or(OAuthError::MissingClientSection)
    }
}

/// OAuth configuration
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Authorization endpoint the user is sent to
    pub auth_uri: String,
    /// Token endpoint for code exchange and refresh
    pub token_uri: String,
    /// Redirect URI for OAuth callback
    pub redirect_uri: String,
    /// OAuth scope(s)
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    /// Create new OAuth configuration with YouTube defaults
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
            auth_uri: GOOGLE_AUTH_URI.to_string(),
            token_uri: GOOGLE_TOKEN_URI.to_string(),
            redirect_uri: default_redirect_uri(),
            scopes: vec![YOUTUBE_READONLY_SCOPE.to_string(), YOUTUBE_SCOPE.to_string()],
        }
    }

    /// Build the configuration from a parsed client secret descriptor.
    pub fn from_client_secret(secret: ClientSecret, redirect_uri: impl Into<String>) -> Self {
        let mut config = Self::new(secret.client_id, secret.client_secret);
        if let Some(auth_uri) = secret.auth_uri {
            config.auth_uri = auth_uri;
        }
        if let Some(token_uri) = secret.token_uri {
            config.token_uri = token_uri;
        }
        config.redirect_uri = redirect_uri.into();
        config
    }

    /// Read `credentials.json` and annotate it with the YouTube scopes.
    pub fn load(path: &Path, redirect_uri: impl Into<String>) -> Result<Self> {
        Ok(Self::from_client_secret(ClientSecret::load(path)?, redirect_uri))
    }

    fn redirect_url(&self) -> Result<Url> {
        Url::parse(&self.redirect_uri)
            .map_err(|_| OAuthError::InvalidRedirectUri(self.redirect_uri.clone()))
    }

    /// Local socket address the callback listener binds, derived from the redirect URI.
    pub fn callback_addr(&self) -> Result<SocketAddr> {
        let invalid = || OAuthError::InvalidRedirectUri(self.redirect_uri.clone());
        let url = self.redirect_url()?;
        let port = url.port_or_known_default().ok_or_else(invalid)?;
        let ip = match url.host_str().ok_or_else(invalid)? {
            "localhost" => IpAddr::V4(Ipv4Addr::LOCALHOST),
            host => host
                .trim_start_matches('[')
                .trim_end_matches(']')
                .parse()
                .map_err(|_| invalid())?,
        };
        Ok(SocketAddr::new(ip, port))
    }

    /// Path the redirect arrives on; `/` when the redirect URI has none.
    pub fn callback_path(&self) -> Result<String> {
        let url = self.redirect_url()?;
        // Route syntax characters would be read as captures by the listener.
        if url.path().contains([':', '*', '{', '}']) {
            return Err(OAuthError::InvalidRedirectUri(self.redirect_uri.clone()));
        }
        Ok(url.path().to_string())
    }

    /// Pin a `:0` redirect URI to the port the listener actually got.
    ///
    /// Any other redirect URI is returned unchanged, byte for byte, since it
    /// must match the one registered with the provider.
    pub fn bound_to(&self, addr: SocketAddr) -> Result<Self> {
        let mut url = self.redirect_url()?;
        if url.port() != Some(0) {
            return Ok(self.clone());
        }
        url.set_port(Some(addr.port()))
            .map_err(|()| OAuthError::InvalidRedirectUri(self.redirect_uri.clone()))?;
        Ok(Self {
            redirect_uri: url.to_string(),
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSTALLED: &str = r#"{
        "installed": {
            "client_id": "123.apps.googleusercontent.com",
            "project_id": "like-transfer",
            "auth_uri": "https://accounts.example.com/o/oauth2/auth",
            "token_uri": "https://oauth2.example.com/token",
            "auth_provider_x509_cert_url": "https://www.googleapis.com/oauth2/v1/certs",
            "client_secret": "shh",
            "redirect_uris": ["http://localhost"]
        }
    }"#;

    #[test]
    fn loads_installed_descriptor_with_scopes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, INSTALLED).unwrap();

        let config = OAuthConfig::load(&path, default_redirect_uri()).unwrap();
        assert_eq!(config.client_id, "123.apps.googleusercontent.com");
        assert_eq!(config.client_secret, "shh");
        assert_eq!(config.auth_uri, "https://accounts.example.com/o/oauth2/auth");
        assert_eq!(config.token_uri, "https://oauth2.example.com/token");
        assert_eq!(config.redirect_uri, "http://localhost:8080");
        assert_eq!(config.scopes, vec![YOUTUBE_READONLY_SCOPE, YOUTUBE_SCOPE]);
    }

    #[test]
    fn web_descriptor_falls_back_to_google_endpoints() {
        let secret = ClientSecret::from_json(r#"{"web":{"client_id":"id","client_secret":"s"}}"#)
            .unwrap()
            .unwrap();
        let config = OAuthConfig::from_client_secret(secret, "http://localhost:9000");
        assert_eq!(config.auth_uri, GOOGLE_AUTH_URI);
        assert_eq!(config.token_uri, GOOGLE_TOKEN_URI);
    }

    #[test]
    fn load_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("credentials.json");
        assert!(matches!(
            OAuthConfig::load(&missing, default_redirect_uri()),
            Err(OAuthError::Io { .. })
        ));

        let garbage = dir.path().join("garbage.json");
        std::fs::write(&garbage, "{ not json").unwrap();
        assert!(matches!(
            OAuthConfig::load(&garbage, default_redirect_uri()),
            Err(OAuthError::Json { .. })
        ));

        let empty = dir.path().join("empty.json");
        std::fs::write(&empty, "{}").unwrap();
        assert!(matches!(
            OAuthConfig::load(&empty, default_redirect_uri()),
            Err(OAuthError::MissingClientSection)
        ));
    }

    #[test]
    fn callback_addr_from_redirect_uri() {
        let mut config = OAuthConfig::new("id".into(), "secret".into());
        assert_eq!(
            config.callback_addr().unwrap(),
            "127.0.0.1:8080".parse::<SocketAddr>().unwrap()
        );

        config.redirect_uri = "http://127.0.0.1:9123/callback".into();
        assert_eq!(config.callback_addr().unwrap().port(), 9123);

        config.redirect_uri = "not a url".into();
        assert!(matches!(
            config.callback_addr(),
            Err(OAuthError::InvalidRedirectUri(_))
        ));
    }

    #[test]
    fn callback_path_from_redirect_uri() {
        let mut config = OAuthConfig::new("id".into(), "secret".into());
        assert_eq!(config.callback_path().unwrap(), "/");

        config.redirect_uri = "http://127.0.0.1:9123/callback".into();
        assert_eq!(config.callback_path().unwrap(), "/callback");

        config.redirect_uri = "http://127.0.0.1:9123/oauth/*rest".into();
        assert!(matches!(
            config.callback_path(),
            Err(OAuthError::InvalidRedirectUri(_))
        ));
    }

    #[test]
    fn bound_to_only_rewrites_port_zero() {
        let addr: SocketAddr = "127.0.0.1:41234".parse().unwrap();

        let config = OAuthConfig::new("id".into(), "secret".into());
        assert_eq!(config.bound_to(addr).unwrap().redirect_uri, "http://localhost:8080");

        let mut ephemeral = config.clone();
        ephemeral.redirect_uri = "http://127.0.0.1:0/callback".into();
        assert_eq!(
            ephemeral.bound_to(addr).unwrap().redirect_uri,
            "http://127.0.0.1:41234/callback"
        );
    }
}
