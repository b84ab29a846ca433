//! Error-swallowing wrapper for store calls
//!
//! Every store-touching cache operation runs through [`StoreGuard::run`]: a
//! failed call is logged with its subject and replaced by a fallback value.
//! A connection failure also switches the cache off until
//! [`StoreGuard::enable`] is called.

use crate::store::StoreResult;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, warn};

#[derive(Debug)]
pub(crate) struct StoreGuard {
    enabled: AtomicBool,
}

impl StoreGuard {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    /// Await `call`, substituting `fallback` on error
    pub async fn run<T, F>(&self, operation: &'static str, subject: &str, fallback: T, call: F) -> T
    where
        F: Future<Output = StoreResult<T>>,
    {
        match call.await {
            Ok(value) => value,
            Err(e) if e.is_connection_error() => {
                // Only the transition from enabled is logged
                if self.enabled.swap(false, Ordering::AcqRel) {
                    error!(
                        operation = operation,
                        subject = subject,
                        error = %e,
                        "Lost connection to cache store, caching disabled"
                    );
                }
                fallback
            }
            Err(e) => {
                warn!(
                    operation = operation,
                    subject = subject,
                    error = %e,
                    "Cache store operation failed"
                );
                fallback
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[tokio::test]
    async fn test_success_passes_through() {
        let guard = StoreGuard::new(true);
        let value = guard.run("get", "k", 0, async { Ok(7) }).await;
        assert_eq!(value, 7);
        assert!(guard.is_enabled());
    }

    #[tokio::test]
    async fn test_command_error_yields_fallback_and_stays_enabled() {
        let guard = StoreGuard::new(true);
        let value = guard
            .run("get", "k", None::<String>, async {
                Err(StoreError::Command("WRONGTYPE".into()))
            })
            .await;
        assert_eq!(value, None);
        assert!(guard.is_enabled());
    }

    #[tokio::test]
    async fn test_connection_error_disables_until_enabled() {
        let guard = StoreGuard::new(true);
        guard
            .run("set", "k", (), async {
                Err(StoreError::Connection("refused".into()))
            })
            .await;
        assert!(!guard.is_enabled());

        guard.enable();
        assert!(guard.is_enabled());
    }
}
