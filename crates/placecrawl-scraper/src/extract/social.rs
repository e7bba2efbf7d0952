//! Social profile link normalisation and embed-page statistics.

use std::sync::LazyLock;

use regex::Regex;

use super::Extractor;
use crate::dom::{self, find_text};
use crate::error::PortError;
use crate::selectors::{SOCIAL_EMBED_FOLLOWERS, SOCIAL_EMBED_NAME, SOCIAL_EMBED_POSTS};

const PROFILE_PREFIX: &str = "https://www.instagram.com/";

/// Path segments that name a post, reel, or site page rather than a profile.
const NON_PROFILE_SEGMENTS: &[&str] = &[
    "p", "reel", "reels", "explore", "stories", "tv", "accounts", "direct",
];

static HANDLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"instagram\.com/([A-Za-z0-9._]+)").expect("valid regex")
});

static COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:\.\d+)?)\s*(만|천|억|[KkMm])?").expect("valid regex"));

/// Canonical profile URL for a social link, or `None` when the link does
/// not point at a profile.
#[must_use]
pub fn normalize_profile_link(href: &str) -> Option<String> {
    let handle = HANDLE.captures(href)?.get(1)?.as_str();
    let handle = handle.trim_end_matches('.');
    if handle.is_empty() || NON_PROFILE_SEGMENTS.contains(&handle.to_ascii_lowercase().as_str())
    {
        return None;
    }
    Some(format!("{PROFILE_PREFIX}{handle}"))
}

/// Parse follower/post counts as the embed page renders them:
/// `1,234`, `1.2만`, `3천`, `1.5K`, `2M`.
#[must_use]
pub fn parse_count(text: &str) -> Option<u64> {
    let compact: String = text
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    let caps = COUNT.captures(&compact)?;
    let number: f64 = caps[1].parse().ok()?;
    let multiplier = match caps.get(2).map(|m| m.as_str()) {
        None => 1.0,
        Some("천" | "K" | "k") => 1_000.0,
        Some("만") => 10_000.0,
        Some("M" | "m") => 1_000_000.0,
        Some("억") => 100_000_000.0,
        Some(_) => return None,
    };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // non-negative by the regex
    let count = (number * multiplier).round() as u64;
    Some(count)
}

/// Follower and post counts read from a profile's embed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct SocialStats {
    pub followers: Option<u64>,
    pub posts: Option<u64>,
}

impl Extractor<'_> {
    pub(super) async fn social_stats(&self, profile: &str) -> Result<SocialStats, PortError> {
        let embed = format!("{}/embed", profile.trim_end_matches('/'));
        self.port.navigate(&embed).await?;
        dom::wait_for(self.port, &SOCIAL_EMBED_NAME, self.timings.wait, self.timings).await?;

        let followers = find_text(self.port, &SOCIAL_EMBED_FOLLOWERS, None).await?;
        let posts = find_text(self.port, &SOCIAL_EMBED_POSTS, None).await?;
        let stats = SocialStats {
            followers: followers.as_deref().and_then(parse_count),
            posts: posts.as_deref().and_then(parse_count),
        };
        if stats.followers.is_none() && stats.posts.is_none() {
            return Err(PortError::NotFound(format!("counts on {embed}")));
        }
        Ok(stats)
    }
}
