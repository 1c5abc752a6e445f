use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use yt_oauth::{AuthorizationFlow, BrowserFlow, OAuthConfig, default_redirect_uri};

/// OAuth 2.0 helper tool that authorizes a single YouTube account
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the Google client secret file
    #[arg(long, env = "YT_CREDENTIALS_PATH", default_value = "credentials.json")]
    credentials: PathBuf,

    /// Path to save the OAuth token file
    #[arg(long, required = true)]
    token_path: PathBuf,

    /// Redirect URI registered for the OAuth client
    #[arg(long, default_value_t = default_redirect_uri())]
    redirect_uri: String,

    /// Seconds to wait for the browser redirect (0 waits indefinitely)
    #[arg(long, default_value_t = 300)]
    auth_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    let config = OAuthConfig::load(&args.credentials, args.redirect_uri)
        .context("unable to load client secret file")?;

    let timeout = (args.auth_timeout_secs > 0).then(|| Duration::from_secs(args.auth_timeout_secs));
    let token = BrowserFlow::default()
        .with_timeout(timeout)
        .authorize(&config)
        .await
        .context("authorization failed")?;

    token
        .save_to_file(&args.token_path)
        .context("unable to cache OAuth token")?;

    tracing::info!(path = %args.token_path.display(), "OAuth token saved");
    eprintln!("You can now use this token with yt-like-transfer");

    Ok(())
}
