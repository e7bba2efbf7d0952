use std::time::Duration;

use placecrawl_core::AppConfig;

/// Bounded-wait budget used by every browser interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Longest wait for something the page is expected to show.
    pub wait: Duration,
    /// Wait for optional elements that are usually absent.
    pub short_wait: Duration,
    pub poll: Duration,
    /// Pause after clicks and navigations so client-side rendering settles.
    pub settle: Duration,
}

impl Timings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            wait: config.wait_timeout(),
            short_wait: config.short_wait(),
            poll: config.poll_interval(),
            settle: config.settle(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub timings: Timings,
    /// Records per mid-session checkpoint; `0` flushes only at session end.
    pub checkpoint_size: usize,
    pub review_limit: usize,
}

impl CrawlSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            timings: Timings::from_config(config),
            checkpoint_size: config.checkpoint_size,
            review_limit: config.review_limit,
        }
    }
}

#[cfg(test)]
impl Timings {
    /// Millisecond-scale budget so tests against the fake browser stay fast.
    pub(crate) fn fast() -> Self {
        Self {
            wait: Duration::from_millis(40),
            short_wait: Duration::from_millis(10),
            poll: Duration::from_millis(1),
            settle: Duration::ZERO,
        }
    }
}
