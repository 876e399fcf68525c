use std::future::Future;
use std::io;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use super::error::AppError;

/// Reusable CLI application runner that handles:
/// - Logging setup (`RUST_LOG`, default `info`, written to stderr)
/// - Signal handling (SIGINT, SIGTERM, SIGHUP)
/// - Graceful shutdown through a cancellation token
/// - Exit codes (0 = success, 1 = error, 130 = SIGINT, 143 = SIGTERM, 129 = SIGHUP)
pub struct CliApp {
    name: String,
    drain_timeout: Duration,
}

impl CliApp {
    /// Create a new CLI application runner
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            drain_timeout: Duration::from_secs(30),
        }
    }

    /// How long to wait for the application to wind down after a signal
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Install the global `tracing` subscriber (no-op if one is already set)
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init();
    }

    /// Run the CLI application with signal handling and graceful shutdown
    ///
    /// `main_fn` receives a token that is cancelled when a signal arrives; it
    /// is expected to stop its work and return. The process exits with the
    /// signal's code once it does (or once the drain timeout passes).
    ///
    /// This function never returns - it calls std::process::exit with the appropriate code
    pub async fn run<F, Fut>(self, main_fn: F) -> !
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), AppError>>,
    {
        Self::init_tracing();

        let shutdown = CancellationToken::new();
        let main_fut = main_fn(shutdown.clone());
        tokio::pin!(main_fut);

        let signal_fut = Self::wait_for_signal();
        tokio::pin!(signal_fut);

        let result = tokio::select! {
            result = &mut main_fut => result,
            Ok(code) = &mut signal_fut => {
                info!(app = %self.name, code, "shutdown requested, draining");
                shutdown.cancel();
                match tokio::time::timeout(self.drain_timeout, &mut main_fut).await {
                    Ok(Err(e)) => error!(app = %self.name, error = %e, "failed during shutdown"),
                    Ok(Ok(())) => {}
                    Err(_) => warn!(app = %self.name, "drain timed out"),
                }
                std::process::exit(code);
            }
        };

        match result {
            Ok(()) => std::process::exit(0),
            Err(e) => {
                error!(app = %self.name, error = %e, "exiting");
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }

    /// Wait for any Unix signal (SIGINT, SIGTERM, SIGHUP) or Ctrl+C
    /// Returns the exit code to use (130 for SIGINT, 143 for SIGTERM, etc.)
    async fn wait_for_signal() -> io::Result<i32> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let mut sigterm = signal(SignalKind::terminate())?;
            let mut sigint = signal(SignalKind::interrupt())?;
            let mut sighup = signal(SignalKind::hangup())?;

            let code = tokio::select! {
                _ = sigterm.recv() => 143, // 128 + 15
                _ = sigint.recv() => 130,  // 128 + 2
                _ = sighup.recv() => 129,  // 128 + 1
            };
            Ok(code)
        }

        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await?;
            Ok(130)
        }
    }
}
