//! Readiness probe: poll the server until it accepts a connection.

use std::future::Future;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection as _;

use crate::error::{PgError, Result};
use crate::process::ServerProcess;

/// Connection attempts before giving up on a starting server.
pub const READY_ATTEMPTS: u32 = 1000;

/// Fixed delay between attempts, without backoff.
pub const READY_INTERVAL: Duration = Duration::from_millis(10);

/// A fixed-interval retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retry {
    pub attempts: u32,
    pub interval: Duration,
}

/// Why a [`Retry`] loop stopped without success.
#[derive(Debug)]
pub struct RetryError<E> {
    /// Attempts actually made.
    pub attempts: u32,
    /// Error returned by the last attempt.
    pub last: E,
    /// Set when `abandon` cut the loop short.
    pub abandoned: Option<String>,
}

impl Retry {
    pub const READINESS: Self = Self {
        attempts: READY_ATTEMPTS,
        interval: READY_INTERVAL,
    };

    /// Run `op` until it succeeds or the budget is spent.
    ///
    /// `abandon` is checked after each failure; returning a reason stops the
    /// loop early.
    pub async fn run<T, E, F, Fut, A>(
        &self,
        mut op: F,
        mut abandon: A,
    ) -> std::result::Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        A: FnMut() -> Option<String>,
    {
        let mut made = 0;
        loop {
            made += 1;
            let last = match op().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if made >= self.attempts {
                return Err(RetryError {
                    attempts: made,
                    last,
                    abandoned: None,
                });
            }
            if let Some(reason) = abandon() {
                return Err(RetryError {
                    attempts: made,
                    last,
                    abandoned: Some(reason),
                });
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}

/// Open one administrative connection, retrying while the server starts.
///
/// Stops early if the server process exits. The returned error carries the
/// last real connection error rather than a generic timeout.
pub async fn wait_until_ready(
    server: &mut ServerProcess,
    options: &PgConnectOptions,
    budget: Retry,
) -> Result<PgConnection> {
    budget
        .run(
            || PgConnection::connect_with(options),
            || server.exit_status(),
        )
        .await
        .map_err(|e| {
            log::debug!(
                "PostgreSQL not ready after {} attempts: {}",
                e.attempts,
                e.last
            );
            let err = PgError::readiness_timeout(e.attempts, e.last.to_string());
            match e.abandoned {
                Some(status) => err.with_field("server_exit", status),
                None => err,
            }
        })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    const FAST: Retry = Retry {
        attempts: 5,
        interval: Duration::from_millis(1),
    };

    #[tokio::test]
    async fn returns_first_success() {
        let calls = Cell::new(0);
        let result: std::result::Result<u32, RetryError<String>> = FAST
            .run(
                || {
                    calls.set(calls.get() + 1);
                    let n = calls.get();
                    async move {
                        if n < 3 {
                            Err(format!("refused {}", n))
                        } else {
                            Ok(n)
                        }
                    }
                },
                || None,
            )
            .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn exhausted_budget_returns_last_error() {
        let calls = Cell::new(0);
        let err = FAST
            .run(
                || {
                    calls.set(calls.get() + 1);
                    let n = calls.get();
                    async move { Err::<(), _>(format!("refused {}", n)) }
                },
                || None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.attempts, 5);
        assert_eq!(err.last, "refused 5");
        assert!(err.abandoned.is_none());
        assert_eq!(calls.get(), 5);
    }

    #[tokio::test]
    async fn abandon_stops_early() {
        let err = FAST
            .run(
                || async { Err::<(), _>("refused") },
                || Some("exit status: 1".to_string()),
            )
            .await
            .unwrap_err();
        assert_eq!(err.attempts, 1);
        assert_eq!(err.abandoned.as_deref(), Some("exit status: 1"));
    }

    #[tokio::test]
    async fn single_attempt_budget_never_sleeps_or_abandons() {
        let budget = Retry {
            attempts: 1,
            interval: Duration::from_secs(60),
        };
        let err = budget
            .run(
                || async { Err::<(), _>("refused") },
                || Some("unused".to_string()),
            )
            .await
            .unwrap_err();
        assert_eq!(err.attempts, 1);
        assert!(err.abandoned.is_none());
    }

    #[test]
    fn readiness_budget_is_about_ten_seconds() {
        assert_eq!(Retry::READINESS.attempts, 1000);
        assert_eq!(
            Retry::READINESS.interval * Retry::READINESS.attempts,
            Duration::from_secs(10)
        );
    }
}
