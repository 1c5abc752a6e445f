use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors produced while loading credentials or obtaining OAuth tokens.
#[derive(Debug, Error)]
pub enum OAuthError {
    /// A credential or token file could not be read or written.
    #[error("failed to access '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A credential or token file did not contain the expected JSON.
    #[error("failed to parse '{}': {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("client secret file has neither an \"installed\" nor a \"web\" section")]
    MissingClientSection,

    #[error("invalid redirect URI '{0}'")]
    InvalidRedirectUri(String),

    #[error("failed to bind OAuth callback listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The user (or the provider) refused the authorization request.
    #[error("authorization denied: {0}")]
    Denied(String),

    #[error("OAuth callback state did not match the authorization request")]
    StateMismatch,

    #[error("OAuth callback listener closed before an authorization code was received")]
    CallbackClosed,

    #[error("timed out after {}s waiting for authorization", .0.as_secs())]
    Timeout(Duration),

    #[error("token endpoint returned status {status}: {body}")]
    TokenEndpoint { status: u16, body: String },

    #[error("access token expired and no refresh token is available")]
    NoRefreshToken,

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub type Result<T, E = OAuthError> = std::result::Result<T, E>;
