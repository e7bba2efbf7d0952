//! Field extraction from an open detail view.
//!
//! A record is assembled from many small steps, each of which may find
//! nothing. A step that fails falls back to the field's default and the
//! next step runs; only three conditions reject the whole record:
//!
//! - the detail reference carries no entity id,
//! - the displayed name does not correspond to the queried name,
//! - the browser transport fails (the session can no longer be trusted).

mod contact;
mod datalab;
pub mod dates;
mod menu;
mod reviews;
pub mod social;

use std::future::Future;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use placecrawl_core::{CrawlTarget, EntityId, StoreRecord};
use regex::Regex;
use serde_json::Value;

use crate::dom;
use crate::error::{PortError, ScraperError};
use crate::port::AutomationPort;
use crate::selectors::{self, scripts, NEW_LISTING_CLASS, NEW_LISTING_TEXT, TITLE_SPANS};
use crate::settings::{CrawlSettings, Timings};

pub use datalab::age_2030_score;
pub use dates::{parse_visit_date, running_well_tier};
pub use social::{normalize_profile_link, parse_count};

static PLACE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/place/(\d+)").expect("valid regex"));

/// Extract the entity id from a detail reference: the digits after
/// `/place/`, or else the second path segment.
///
/// # Errors
///
/// Returns [`ScraperError::MissingEntityId`] when neither yields a number.
pub fn parse_entity_id(detail_ref: &str) -> Result<EntityId, ScraperError> {
    let missing = || ScraperError::MissingEntityId {
        detail_ref: detail_ref.to_string(),
    };

    if let Some(caps) = PLACE_PATH.captures(detail_ref) {
        return caps[1].parse().map_err(|_| missing());
    }

    let without_query = detail_ref.split(['?', '#']).next().unwrap_or_default();
    let path = without_query
        .split_once("://")
        .map_or(without_query, |(_, rest)| {
            rest.split_once('/').map_or("", |(_, path)| path)
        });
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .nth(1)
        .and_then(|segment| segment.parse().ok())
        .ok_or_else(missing)
}

/// `true` when either name contains the other.
#[must_use]
pub fn names_correspond(found: &str, origin: &str) -> bool {
    let found = found.trim();
    let origin = origin.trim();
    found.contains(origin) || origin.contains(found)
}

/// Run one sub-extraction, replacing any failure except a transport failure
/// with `default`.
async fn soft<T, Fut>(field: &'static str, default: T, step: Fut) -> Result<T, ScraperError>
where
    Fut: Future<Output = Result<T, PortError>>,
{
    match step.await {
        Ok(value) => Ok(value),
        Err(err @ PortError::Transport(_)) => Err(err.into()),
        Err(err) if err.is_recoverable() => {
            tracing::debug!(field, error = %err, "field not present, using default");
            Ok(default)
        }
        Err(err) => {
            tracing::warn!(field, error = %err, "field extraction failed, using default");
            Ok(default)
        }
    }
}

/// Per-item failures inside a list skip the item; transport failures end
/// the step.
fn skip_item(what: &'static str, err: PortError) -> Result<(), PortError> {
    match err {
        PortError::Transport(_) => Err(err),
        other => {
            tracing::debug!(what, error = %other, "skipping unreadable item");
            Ok(())
        }
    }
}

#[derive(Debug, Default)]
struct Title {
    name: Option<String>,
    category: Option<String>,
    new_listing: bool,
}

pub struct Extractor<'a> {
    port: &'a dyn AutomationPort,
    timings: &'a Timings,
    review_limit: usize,
    now: DateTime<Utc>,
}

impl<'a> Extractor<'a> {
    /// `now` stamps `collected_at` and anchors review recency.
    #[must_use]
    pub fn new(
        port: &'a dyn AutomationPort,
        settings: &'a CrawlSettings,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            port,
            timings: &settings.timings,
            review_limit: settings.review_limit,
            now,
        }
    }

    fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }

    /// Build a record for the detail view at `detail_ref`, which must already
    /// be loaded in the browser.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::MissingEntityId`] if `detail_ref` has no id.
    /// - [`ScraperError::IdentityMismatch`] if the displayed name does not
    ///   correspond to `target.name`.
    /// - [`ScraperError::Port`] on transport failure.
    pub async fn extract(
        &self,
        target: &CrawlTarget,
        detail_ref: &str,
    ) -> Result<StoreRecord, ScraperError> {
        let entity_id = parse_entity_id(detail_ref)?;
        let mut record =
            StoreRecord::new(entity_id, &target.name, target.location_hint(), self.now);
        record.detail_url = Some(detail_ref.to_string());

        soft("detail frame", (), async {
            dom::enter_frame(self.port, &selectors::ENTRY_IFRAME, self.timings)
                .await
                .map(|_| ())
        })
        .await?;

        let (latitude, longitude) = soft("coordinates", (None, None), self.coordinates()).await?;
        record.latitude = latitude;
        record.longitude = longitude;

        let title = soft("title", Title::default(), self.title()).await?;
        record.name = title
            .name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| target.name.clone());
        if !names_correspond(&record.name, &target.name) {
            return Err(ScraperError::IdentityMismatch {
                expected: target.name.clone(),
                found: record.name,
            });
        }
        record.category = title.category;
        record.new_listing = title.new_listing;

        self.fill_contact(target, &mut record).await?;
        self.fill_home(&mut record).await?;
        self.fill_datalab(&mut record).await?;
        self.fill_review_counts(&mut record).await?;
        self.fill_menu(&mut record).await?;
        self.fill_reviews(&mut record).await?;

        if let Some(profile) = record.social_link.clone() {
            match self.social_stats(&profile).await {
                Ok(stats) => {
                    record.social_followers = stats.followers;
                    record.social_posts = stats.posts;
                }
                Err(err @ PortError::Transport(_)) => return Err(err.into()),
                Err(err) => {
                    tracing::debug!(
                        profile = %profile,
                        error = %err,
                        "social profile unreadable, dropping link"
                    );
                    record.social_link = None;
                }
            }
        }

        tracing::debug!(entity_id = %record.entity_id, name = %record.name, "record extracted");
        Ok(record)
    }

    async fn coordinates(&self) -> Result<(Option<f64>, Option<f64>), PortError> {
        let value = self.port.run_script(scripts::PLACE_COORDINATE, &[]).await?;
        Ok((coordinate(&value, "y"), coordinate(&value, "x")))
    }

    async fn title(&self) -> Result<Title, PortError> {
        dom::wait_for(self.port, &TITLE_SPANS, self.timings.wait, self.timings).await?;
        let spans = self.port.find_elements(&TITLE_SPANS, None).await?;

        let mut title = Title::default();
        if let Some(span) = spans.first() {
            title.name = Some(self.port.text(span).await?.trim().to_string());
        }
        if let Some(span) = spans.get(1) {
            let category = self.port.text(span).await?.trim().to_string();
            title.category = (!category.is_empty()).then_some(category);
        }
        if let Some(span) = spans.get(2) {
            let text = self.port.text(span).await?;
            let class = self.port.attribute(span, "class").await?.unwrap_or_default();
            title.new_listing =
                text.trim() == NEW_LISTING_TEXT && class.contains(NEW_LISTING_CLASS);
        }
        Ok(title)
    }
}

/// A coordinate the page may encode as a number or a numeric string.
fn coordinate(value: &Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
