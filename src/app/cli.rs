use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::error::AppError;

/// Reusable CLI application runner that handles:
/// - Signal handling (SIGINT, SIGTERM, SIGHUP)
/// - Graceful shutdown through a cancellation token
/// - Exit codes (0 = success, 1 = error, 130 = SIGINT, 143 = SIGTERM, 129 = SIGHUP)
pub struct CliApp {
    name: String,
}

impl CliApp {
    /// Create a new CLI application runner
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the application and return the process exit code
    ///
    /// The token handed to `main_fn` is cancelled when a signal arrives; the
    /// application is then awaited so it can stop its pipeline cleanly.
    pub async fn run<F, Fut>(self, main_fn: F) -> i32
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), AppError>>,
    {
        let ctx = CancellationToken::new();
        let main = main_fn(ctx.clone());
        tokio::pin!(main);

        tokio::select! {
            result = &mut main => self.exit_code(result),
            signal_code = wait_for_signal() => {
                ctx.cancel();
                // The cancellation error is expected here.
                let _ = (&mut main).await;
                signal_code
            }
        }
    }

    fn exit_code(&self, result: Result<(), AppError>) -> i32 {
        match result {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("{}: {}", self.name, e);
                1
            }
        }
    }
}

/// Wait for any Unix signal (SIGINT, SIGTERM, SIGHUP) or Ctrl+C
/// Returns the exit code to use (130 for SIGINT, 143 for SIGTERM, etc.)
async fn wait_for_signal() -> i32 {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let handlers = (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
            signal(SignalKind::hangup()),
        );
        let (mut sigterm, mut sigint, mut sighup) = match handlers {
            (Ok(term), Ok(int), Ok(hup)) => (term, int, hup),
            _ => {
                warn!("Failed to install signal handlers");
                return std::future::pending().await;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                eprintln!("Received SIGTERM");
                143 // 128 + 15
            }
            _ = sigint.recv() => {
                eprintln!("Received SIGINT");
                130 // 128 + 2
            }
            _ = sighup.recv() => {
                eprintln!("Received SIGHUP");
                129 // 128 + 1
            }
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_err() {
            warn!("Failed to install Ctrl+C handler");
            return std::future::pending().await;
        }
        eprintln!("Received Ctrl+C");
        130
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_app_new() {
        let app = CliApp::new("test-app");
        assert_eq!(app.name(), "test-app");
    }

    #[tokio::test]
    async fn success_exits_zero() {
        let code = CliApp::new("t").run(|_ctx| async { Ok(()) }).await;
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn error_exits_one() {
        let code = CliApp::new("t")
            .run(|_ctx| async { Err(AppError::InvalidArguments("x".to_string())) })
            .await;
        assert_eq!(code, 1);
    }
}
