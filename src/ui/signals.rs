use crate::error::{BackupExportError, Result};
use crate::job::CancelToken;
use std::sync::atomic::{AtomicBool, Ordering};

/// Routes Ctrl+C to a job's cancel token. A second Ctrl+C exits immediately.
pub struct GracefulShutdown {
    token: CancelToken,
}

impl GracefulShutdown {
    pub fn new() -> Result<Self> {
        let token = CancelToken::new();
        let token_clone = token.clone();
        let message_shown = AtomicBool::new(false);

        ctrlc::set_handler(move || {
            token_clone.cancel();

            if !message_shown.swap(true, Ordering::SeqCst) {
                eprintln!("\n🛑 Stopping after the current file... (press Ctrl+C again to force exit)");
            } else {
                eprintln!("\n💀 Force stopping...");
                std::process::exit(130);
            }
        })
        .map_err(|e| BackupExportError::Config {
            message: format!("Failed to set signal handler: {}", e),
        })?;

        Ok(Self { token })
    }

    /// Create a GracefulShutdown instance for testing (no signal handler registration)
    pub fn new_for_test() -> Self {
        Self {
            token: CancelToken::new(),
        }
    }

    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    pub fn check_shutdown(&self) -> Result<()> {
        self.token.check()
    }

    pub fn request_shutdown(&self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_state_management() {
        let shutdown = GracefulShutdown::new_for_test();

        assert!(shutdown.is_running());
        assert!(shutdown.check_shutdown().is_ok());

        shutdown.request_shutdown();
        assert!(!shutdown.is_running());
        assert!(matches!(
            shutdown.check_shutdown(),
            Err(BackupExportError::Cancelled)
        ));
    }

    #[test]
    fn test_token_follows_shutdown() {
        let shutdown = GracefulShutdown::new_for_test();
        let token = shutdown.token();

        assert!(!token.is_cancelled());
        shutdown.request_shutdown();
        assert!(token.is_cancelled());
    }
}
