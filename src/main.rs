use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use yt_data_client::{DEFAULT_API_BASE, YouTubeClient};
use yt_like_transfer::transfer_likes;
use yt_oauth::{OAuthConfig, TokenManager, default_redirect_uri};

/// YouTube Like Transfer - Copies liked videos from a source account to a target account
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the Google client secret file
    #[arg(long, env = "YT_CREDENTIALS_PATH", default_value = "credentials.json")]
    credentials: PathBuf,

    /// Token cache for the account whose likes are copied
    #[arg(long, default_value = "source_token.json")]
    source_token: PathBuf,

    /// Token cache for the account that receives the likes
    #[arg(long, default_value = "target_token.json")]
    target_token: PathBuf,

    /// Redirect URI registered for the OAuth client; the callback listener binds its host and port
    #[arg(long, default_value_t = default_redirect_uri())]
    redirect_uri: String,

    /// Base URL of the YouTube Data API
    #[arg(long, env = "REST_API_ADDRESS", default_value = DEFAULT_API_BASE)]
    api_base_url: String,

    /// Seconds to wait for the browser redirect during authorization (0 waits indefinitely)
    #[arg(long, default_value_t = 300)]
    auth_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error, off); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    /// Output logs as JSON instead of human-readable text
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn init_tracing(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(args.log_level.into()));

    if args.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .init();
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    tracing::info!("Reading credentials from {}", args.credentials.display());
    let config = OAuthConfig::load(&args.credentials, args.redirect_uri.clone())
        .context("unable to load client secret file")?;

    let timeout = (args.auth_timeout_secs > 0).then(|| Duration::from_secs(args.auth_timeout_secs));
    let manager = TokenManager::new(config).with_auth_timeout(timeout);

    tracing::info!("Getting {}", args.source_token.display());
    let source_auth = manager
        .obtain(&args.source_token)
        .await
        .context("unable to authorize source account")?;
    tracing::info!("Getting {}", args.target_token.display());
    let target_auth = manager
        .obtain(&args.target_token)
        .await
        .context("unable to authorize target account")?;

    tracing::info!("Creating source YouTube service");
    let source = YouTubeClient::new(&args.api_base_url, source_auth)
        .context("error creating source YouTube service")?;
    tracing::info!("Creating target YouTube service");
    let target = YouTubeClient::new(&args.api_base_url, target_auth)
        .context("error creating target YouTube service")?;

    tracing::info!("Transferring likes");
    let summary = transfer_likes(&source, &target)
        .await
        .context("error transferring likes")?;

    tracing::info!(
        found = summary.found,
        liked = summary.liked,
        failed = summary.failed.len(),
        "Transfer finished"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn runs_with_no_flags() {
        let args = Args::try_parse_from(["yt-like-transfer"]).unwrap();
        assert_eq!(args.source_token, PathBuf::from("source_token.json"));
        assert_eq!(args.target_token, PathBuf::from("target_token.json"));
        assert_eq!(args.log_level, LevelFilter::INFO);
    }

    #[test]
    fn log_level_accepts_known_levels() {
        let args = Args::try_parse_from(["yt-like-transfer", "--log-level", "debug"]).unwrap();
        assert_eq!(args.log_level, LevelFilter::DEBUG);
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let err = Args::try_parse_from(["yt-like-transfer", "--log-level", "verbose"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
