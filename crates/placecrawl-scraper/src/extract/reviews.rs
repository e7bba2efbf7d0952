//! Review counts, the reviews tab, and the recency tier derived from it.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use placecrawl_core::{ReviewSnippet, StoreRecord};
use regex::Regex;

use super::dates::{parse_visit_date, running_well_tier};
use super::{skip_item, soft, Extractor};
use crate::dom::{self, click_js, find_text};
use crate::error::{PortError, ScraperError};
use crate::port::{ElementRef, Locator};
use crate::selectors::{
    BLOG_REVIEWS, REVIEW_COMMENT_PARTS, REVIEW_ITEMS, REVIEW_KEYWORDS, REVIEW_KEYWORD_LABEL,
    REVIEW_KEYWORD_VOTES, REVIEW_KEYWORD_VOTES_NOISE, REVIEW_MORE_TEXT, REVIEW_SORT_LATEST,
    REVIEW_VISIT_DATE, TAB_REVIEW, VISITOR_REVIEWS,
};

static FIRST_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

/// First integer in `text` once thousands separators are removed.
fn first_number(text: &str) -> Option<u64> {
    let compact = text.replace(',', "");
    FIRST_NUMBER.find(&compact)?.as_str().parse().ok()
}

impl Extractor<'_> {
    /// Visitor and blog review counts from the home tab links.
    pub(super) async fn fill_review_counts(
        &self,
        record: &mut StoreRecord,
    ) -> Result<(), ScraperError> {
        record.visitor_review_count =
            soft("visitor review count", 0, self.link_count(&VISITOR_REVIEWS)).await?;
        record.blog_review_count =
            soft("blog review count", 0, self.link_count(&BLOG_REVIEWS)).await?;
        Ok(())
    }

    pub(super) async fn fill_reviews(&self, record: &mut StoreRecord) -> Result<(), ScraperError> {
        let opened = soft("review tab", false, async {
            dom::open_tab(self.port, TAB_REVIEW, self.timings).await?;
            dom::wait_for(self.port, &REVIEW_ITEMS, self.timings.wait, self.timings).await?;
            Ok::<_, PortError>(true)
        })
        .await?;
        if !opened {
            return Ok(());
        }

        soft("latest sort", (), self.sort_latest()).await?;
        record.review_keywords = soft("review keywords", BTreeMap::new(), self.keywords()).await?;

        let reviews = soft("review snippets", Vec::new(), self.snippets()).await?;
        let dates: Vec<_> = reviews.iter().map(|r| r.date).collect();
        record.running_well = running_well_tier(&dates, self.today());
        record.reviews = reviews;
        Ok(())
    }

    async fn link_count(&self, locator: &Locator) -> Result<u64, PortError> {
        Ok(find_text(self.port, locator, None)
            .await?
            .and_then(|text| first_number(&text))
            .unwrap_or(0))
    }

    async fn sort_latest(&self) -> Result<(), PortError> {
        let button =
            dom::wait_for(self.port, &REVIEW_SORT_LATEST, self.timings.short_wait, self.timings)
                .await?;
        click_js(self.port, &button).await?;
        dom::settle(self.timings).await;
        Ok(())
    }

    async fn keywords(&self) -> Result<BTreeMap<String, u64>, PortError> {
        let mut keywords = BTreeMap::new();
        for item in self.port.find_elements(&REVIEW_KEYWORDS, None).await? {
            match self.keyword(&item).await {
                Ok(Some((label, votes))) => {
                    keywords.insert(label, votes);
                }
                Ok(None) => {}
                Err(err) => skip_item("review keyword", err)?,
            }
        }
        Ok(keywords)
    }

    async fn keyword(&self, item: &ElementRef) -> Result<Option<(String, u64)>, PortError> {
        let Some(label) = find_text(self.port, &REVIEW_KEYWORD_LABEL, Some(item)).await? else {
            return Ok(None);
        };
        let label = label.replace('"', "").trim().to_string();
        if label.is_empty() {
            return Ok(None);
        }
        let votes = find_text(self.port, &REVIEW_KEYWORD_VOTES, Some(item))
            .await?
            .unwrap_or_default()
            .replace(REVIEW_KEYWORD_VOTES_NOISE, "")
            .trim()
            .parse()
            .unwrap_or(0);
        Ok(Some((label, votes)))
    }

    /// Latest `review_limit` reviews that carry a readable visit date, newest
    /// first.
    async fn snippets(&self) -> Result<Vec<ReviewSnippet>, PortError> {
        let mut reviews = Vec::new();
        for item in self.port.find_elements(&REVIEW_ITEMS, None).await? {
            match self.snippet(&item).await {
                Ok(Some(review)) => reviews.push(review),
                Ok(None) => {}
                Err(err) => skip_item("review", err)?,
            }
        }
        reviews.sort_by(|a, b| b.date.cmp(&a.date));
        reviews.truncate(self.review_limit);
        Ok(reviews)
    }

    async fn snippet(&self, item: &ElementRef) -> Result<Option<ReviewSnippet>, PortError> {
        let Some(visited) = find_text(self.port, &REVIEW_VISIT_DATE, Some(item)).await? else {
            return Ok(None);
        };
        let Some(date) = parse_visit_date(&visited, self.today()) else {
            tracing::debug!(text = %visited, "unparseable visit date");
            return Ok(None);
        };

        let mut parts = Vec::new();
        for part in self.port.find_elements(&REVIEW_COMMENT_PARTS, Some(item)).await? {
            let text = self.port.text(&part).await?;
            let text = text.trim();
            if !text.is_empty() {
                parts.push(text.to_string());
            }
        }
        let comment = parts
            .join(" ")
            .replace('\n', " ")
            .replace(REVIEW_MORE_TEXT, "")
            .trim()
            .to_string();
        Ok(Some(ReviewSnippet { date, comment }))
    }
}
