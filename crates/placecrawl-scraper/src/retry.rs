//! Exponential back-off for opening browser sessions.
//!
//! Only [`PortError::Transport`] is retried: a driver that is still starting
//! up or briefly unreachable. Anything the driver actively rejected is
//! returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::PortError;

fn is_retriable(err: &PortError) -> bool {
    matches!(err, PortError::Transport(_))
}

/// Runs `operation` with up to `max_retries` additional attempts on transport
/// errors, sleeping `backoff_base_secs * 2^attempt` (±25 % jitter) between
/// attempts. Delay is capped at 60 s.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, PortError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PortError>>,
{
    const MAX_DELAY_MS: u64 = 60_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                let computed = backoff_base_secs
                    .saturating_mul(1000)
                    .saturating_mul(1u64 << attempt.min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                attempt += 1;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "browser session unavailable, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
