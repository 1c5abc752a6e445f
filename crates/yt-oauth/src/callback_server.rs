use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;

use crate::error::{OAuthError, Result};

/// Body returned to the browser once the authorization code has been captured.
pub const SUCCESS_MESSAGE: &str = "Authorization successful! You can close this window.";

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

type CallbackResult = Result<String>;
type CodeSender = Arc<Mutex<Option<oneshot::Sender<CallbackResult>>>>;

#[derive(Deserialize)]
struct AuthCallback {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Single-use local listener that captures the OAuth redirect.
///
/// The listener runs on its own task while [`CallbackServer::wait_for_code`]
/// waits on the rendezvous. It is shut down when the wait finishes or when the
/// value is dropped, whichever comes first.
pub struct CallbackServer {
    local_addr: SocketAddr,
    code_rx: Option<oneshot::Receiver<CallbackResult>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CallbackServer {
    /// Bind `addr` and start serving the redirect at `path`.
    ///
    /// `path` is the path component of the registered redirect URI, e.g. `/`
    /// for `http://localhost:8080` or `/callback` for
    /// `http://127.0.0.1:8080/callback`.
    pub async fn bind(addr: SocketAddr, path: &str, expected_state: String) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| OAuthError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| OAuthError::Bind { addr, source })?;

        let (code_tx, code_rx) = oneshot::channel();
        let code_tx: CodeSender = Arc::new(Mutex::new(Some(code_tx)));

        let callback_handler = move |Query(params): Query<AuthCallback>| async move {
            handle_callback(params, &expected_state, &code_tx).await
        };
        let app = Router::new().route(path, get(callback_handler));

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        let handle = tokio::spawn(async move {
            if let Err(e) = server.await {
                tracing::warn!(error = %e, "OAuth callback listener stopped with an error");
            }
        });

        tracing::debug!(%local_addr, path, "OAuth callback listener started");

        Ok(Self {
            local_addr,
            code_rx: Some(code_rx),
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Block until the redirect delivers a code, then tear the listener down.
    pub async fn wait_for_code(mut self, timeout: Option<Duration>) -> Result<String> {
        let result = match self.code_rx.take() {
            Some(code_rx) => match timeout {
                Some(limit) => match tokio::time::timeout(limit, code_rx).await {
                    Ok(received) => received.unwrap_or(Err(OAuthError::CallbackClosed)),
                    Err(_) => Err(OAuthError::Timeout(limit)),
                },
                None => code_rx.await.unwrap_or(Err(OAuthError::CallbackClosed)),
            },
            None => Err(OAuthError::CallbackClosed),
        };

        self.shutdown().await;
        result
    }

    async fn shutdown(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(mut handle) = self.handle.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await.is_err() {
                handle.abort();
            }
        }
        tracing::debug!(local_addr = %self.local_addr, "OAuth callback listener stopped");
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn handle_callback(
    params: AuthCallback,
    expected_state: &str,
    code_tx: &CodeSender,
) -> Response {
    let (outcome, response) = if let Some(error) = params.error {
        (
            Err(OAuthError::Denied(error.clone())),
            (
                StatusCode::BAD_REQUEST,
                format!("Authorization failed: {}. You can close this window.", error),
            )
                .into_response(),
        )
    } else if let Some(code) = params.code {
        if params.state.as_deref() != Some(expected_state) {
            (
                Err(OAuthError::StateMismatch),
                (StatusCode::BAD_REQUEST, "Authorization failed: state mismatch.").into_response(),
            )
        } else {
            (Ok(code), SUCCESS_MESSAGE.into_response())
        }
    } else {
        return (StatusCode::BAD_REQUEST, "Missing authorization code.").into_response();
    };

    match code_tx.lock().await.take() {
        Some(sender) => {
            let _ = sender.send(outcome);
            response
        }
        None => (StatusCode::GONE, "Authorization already completed.").into_response(),
    }
}
