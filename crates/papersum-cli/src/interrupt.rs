//! Ctrl-C routing: cancels the job being waited on, otherwise exits.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Conventional exit status for SIGINT
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Clone, Default)]
pub struct Interrupts {
    active: Arc<Mutex<Option<CancellationToken>>>,
}

impl Interrupts {
    /// Install the one process-wide Ctrl-C handler
    pub fn install() -> Self {
        let interrupts = Self::default();
        let handler = interrupts.clone();

        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if !handler.interrupt() {
                    println!();
                    std::process::exit(EXIT_INTERRUPTED);
                }
            }
        });

        interrupts
    }

    /// Start a wait that the next Ctrl-C cancels instead of exiting
    pub fn begin(&self) -> Wait {
        let token = CancellationToken::new();
        *self.slot() = Some(token.clone());
        Wait {
            interrupts: self.clone(),
            token,
        }
    }

    /// Cancel the active wait. `false` when nothing is waiting.
    fn interrupt(&self) -> bool {
        match self.slot().take() {
            Some(token) => {
                debug!("Interrupt cancels the active wait");
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An interruptible wait; Ctrl-C goes back to exiting once it drops
pub struct Wait {
    interrupts: Interrupts,
    token: CancellationToken,
}

impl Wait {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for Wait {
    fn drop(&mut self) {
        self.interrupts.slot().take();
    }
}
