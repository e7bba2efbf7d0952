//! Polling primitives shared by the classifier, resolver, and extractor.
//!
//! Every "wait for the page" loop in the crawler goes through one of these
//! two functions so timeouts behave the same everywhere: recoverable port
//! errors count as "not yet", anything else aborts the wait immediately.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::PortError;

/// Poll `check` until it yields `Some`, or fail with [`PortError::Timeout`].
///
/// The check always runs at least once, even with a zero timeout.
///
/// # Errors
///
/// Returns [`PortError::Timeout`] at the deadline, or the first
/// non-recoverable error the check returns.
pub async fn wait_until<T, F, Fut>(
    what: &str,
    timeout: Duration,
    interval: Duration,
    mut check: F,
) -> Result<T, PortError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, PortError>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        match check().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(err) if err.is_recoverable() => {
                tracing::trace!(what, error = %err, "condition not met yet");
            }
            Err(err) => return Err(err),
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(PortError::Timeout(what.to_string()));
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

/// Poll `check` until two consecutive readings are equal and return that
/// reading, or fail with [`PortError::Timeout`].
///
/// A recoverable error resets the comparison.
///
/// # Errors
///
/// Returns [`PortError::Timeout`] at the deadline, or the first
/// non-recoverable error the check returns.
pub async fn wait_until_stable<T, F, Fut>(
    what: &str,
    timeout: Duration,
    interval: Duration,
    mut check: F,
) -> Result<T, PortError>
where
    T: PartialEq,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PortError>>,
{
    let deadline = Instant::now() + timeout;
    let mut last: Option<T> = None;
    loop {
        match check().await {
            Ok(reading) => {
                if last.as_ref() == Some(&reading) {
                    return Ok(reading);
                }
                last = Some(reading);
            }
            Err(err) if err.is_recoverable() => {
                tracing::trace!(what, error = %err, "stability check not ready");
                last = None;
            }
            Err(err) => return Err(err),
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(PortError::Timeout(what.to_string()));
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    const TICK: Duration = Duration::from_millis(1);

    #[tokio::test]
    async fn wait_until_returns_first_some() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = wait_until("value", Duration::from_secs(1), TICK, || {
            let c = Arc::clone(&c);
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst);
                Ok::<_, PortError>((n >= 2).then_some(n))
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn wait_until_times_out() {
        let result: Result<(), _> =
            wait_until("never", Duration::from_millis(20), TICK, || async {
                Ok(None)
            })
            .await;
        assert!(matches!(result, Err(PortError::Timeout(ref w)) if w == "never"));
    }

    #[tokio::test]
    async fn wait_until_checks_once_with_zero_timeout() {
        let result = wait_until("now", Duration::ZERO, TICK, || async { Ok(Some(7)) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn wait_until_treats_not_found_as_not_ready() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = wait_until("element", Duration::from_secs(1), TICK, || {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(PortError::NotFound("x".to_string()))
                } else {
                    Ok(Some("ok"))
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "ok");
    }

    #[tokio::test]
    async fn wait_until_propagates_transport_errors() {
        let result: Result<(), _> = wait_until("element", Duration::from_secs(1), TICK, || async {
            Err(PortError::Transport("gone".to_string()))
        })
        .await;
        assert!(matches!(result, Err(PortError::Transport(_))));
    }

    #[tokio::test]
    async fn wait_until_stable_waits_for_repeat_reading() {
        let readings = Arc::new(std::sync::Mutex::new(vec![100, 200, 300, 300, 400]));
        let r = Arc::clone(&readings);
        let result = wait_until_stable("height", Duration::from_secs(1), TICK, || {
            let r = Arc::clone(&r);
            async move { Ok::<_, PortError>(r.lock().unwrap().remove(0)) }
        })
        .await;
        assert_eq!(result.unwrap(), 300);
        assert_eq!(readings.lock().unwrap().as_slice(), &[400]);
    }

    #[tokio::test]
    async fn wait_until_stable_times_out_on_growing_value() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&counter);
        let result = wait_until_stable("height", Duration::from_millis(20), TICK, || {
            let c = Arc::clone(&c);
            async move { Ok::<_, PortError>(c.fetch_add(1, Ordering::SeqCst)) }
        })
        .await;
        assert!(matches!(result, Err(PortError::Timeout(_))));
    }
}
