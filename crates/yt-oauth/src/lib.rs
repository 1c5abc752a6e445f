//! OAuth 2.0 support for the YouTube Data API: client secret loading, the
//! interactive authorization-code flow and cached, self-refreshing tokens.

pub mod callback_server;
pub mod config;
pub mod error;
pub mod flow;
pub mod manager;
pub mod token;

pub use callback_server::CallbackServer;
pub use config::{
    ClientSecret, OAUTH_CALLBACK_PORT, OAuthConfig, YOUTUBE_READONLY_SCOPE, YOUTUBE_SCOPE,
    default_redirect_uri,
};
pub use error::OAuthError;
pub use flow::{
    AuthPrompt, AuthorizationFlow, BrowserFlow, exchange_code, generate_auth_url, generate_pkce,
};
pub use manager::{AuthorizedClient, TokenManager, obtain_token};
pub use token::OAuthToken;
