//! Candidate resolution over a paginated result list.
//!
//! Every page is scored in full and the best candidate across all pages
//! wins; ties keep the first one seen. The list is re-rendered on each page
//! switch, so the winner is found again on its page by exact name and
//! address before it is clicked.

use placecrawl_core::CrawlTarget;

use crate::dom::{self, click_js, scroll_into_view, text_or_content};
use crate::error::{PortError, ScraperError};
use crate::poll::wait_until_stable;
use crate::port::{AutomationPort, ElementRef, Frame};
use crate::selectors::{
    self, scripts, CANDIDATE_ADDRESS, CANDIDATE_NAME, CANDIDATE_ROWS, ENTRY_IFRAME,
    LIST_CONTAINER, SEARCH_IFRAME,
};
use crate::settings::Timings;
use crate::similarity;

/// Hard stop for runaway pagination.
pub const MAX_PAGES: usize = 20;

/// One readable row of the result list.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub display_name: String,
    pub display_address: String,
    /// 1-based page number as shown by the site.
    pub page_index: usize,
    /// 0-based row index on its page.
    pub position_index: usize,
    handle: ElementRef,
}

impl Candidate {
    fn same_listing(&self, other: &Candidate) -> bool {
        self.display_name == other.display_name && self.display_address == other.display_address
    }
}

#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub score: f64,
    pub candidate: Candidate,
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone)]
pub struct Selection {
    pub detail_ref: String,
    pub chosen: ScoredCandidate,
}

pub struct Resolver<'a> {
    port: &'a dyn AutomationPort,
    timings: &'a Timings,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub fn new(port: &'a dyn AutomationPort, timings: &'a Timings) -> Self {
        Self { port, timings }
    }

    /// Pick the best candidate for `target` and open its detail view.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::NoCandidates`] if no page held a readable row.
    /// - [`ScraperError::ResolutionFailed`] if the winner could not be
    ///   found again or its detail view never opened.
    /// - [`ScraperError::Port`] on transport failures.
    pub async fn resolve(&self, target: &CrawlTarget) -> Result<Selection, ScraperError> {
        let hint = target.resolution_hint();
        let mut best: Option<ScoredCandidate> = None;
        let mut page = 1;

        loop {
            dom::enter_frame(self.port, &SEARCH_IFRAME, self.timings).await?;
            self.stabilise().await?;
            let candidates = self.read_candidates(page).await?;

            let page_best = best_of(&target.name, hint, candidates);
            if let Some(page_best) = page_best {
                tracing::debug!(
                    page,
                    score = page_best.score,
                    name = %page_best.candidate.display_name,
                    "page best candidate"
                );
                if best.as_ref().is_none_or(|b| page_best.score > b.score) {
                    best = Some(page_best);
                }
            }

            if page >= MAX_PAGES || !self.goto_page(page + 1).await? {
                break;
            }
            page += 1;
        }

        let Some(best) = best else {
            return Err(ScraperError::NoCandidates);
        };

        if best.candidate.page_index != page {
            self.return_to_page(best.candidate.page_index).await?;
        }
        dom::enter_frame(self.port, &SEARCH_IFRAME, self.timings).await?;
        self.stabilise().await?;
        let rows = self.read_candidates(best.candidate.page_index).await?;
        let Some(row) = rematch(&rows, &best.candidate) else {
            return Err(ScraperError::ResolutionFailed {
                reason: format!(
                    "best candidate \"{}\" no longer on page {}",
                    best.candidate.display_name, best.candidate.page_index
                ),
            });
        };

        let detail_ref = self.select(row).await?;
        tracing::info!(
            query = %target,
            chosen = %best.candidate.display_name,
            score = best.score,
            page = best.candidate.page_index,
            "candidate resolved"
        );
        Ok(Selection {
            detail_ref,
            chosen: best,
        })
    }

    /// Scroll the list until its row count and height stop changing. A list
    /// that never settles is read as-is.
    async fn stabilise(&self) -> Result<(), PortError> {
        let port = self.port;
        let result = wait_until_stable(
            "candidate list height",
            self.timings.wait,
            self.timings.poll,
            || async move {
                let rows = port.find_elements(&CANDIDATE_ROWS, None).await?;
                if let Some(last) = rows.last() {
                    scroll_into_view(port, last).await?;
                }
                let height = match port.find_element(&LIST_CONTAINER, None).await? {
                    Some(container) => port
                        .run_script(scripts::ELEMENT_SCROLL_HEIGHT, &[&container])
                        .await?
                        .as_u64()
                        .unwrap_or(0),
                    None => 0,
                };
                Ok::<_, PortError>((rows.len(), height))
            },
        )
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if err.is_recoverable() => {
                tracing::debug!(error = %err, "candidate list did not settle, reading anyway");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn read_candidates(&self, page: usize) -> Result<Vec<Candidate>, PortError> {
        let rows = self.port.find_elements(&CANDIDATE_ROWS, None).await?;
        let mut candidates = Vec::with_capacity(rows.len());
        for (position, row) in rows.iter().enumerate() {
            match self.read_row(row, page, position).await {
                Ok(Some(candidate)) => candidates.push(candidate),
                Ok(None) => {}
                Err(err) if err.is_recoverable() => {
                    tracing::debug!(page, position, error = %err, "skipping unreadable row");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(candidates)
    }

    async fn read_row(
        &self,
        row: &ElementRef,
        page: usize,
        position: usize,
    ) -> Result<Option<Candidate>, PortError> {
        let Some(name_el) = self.port.find_element(&CANDIDATE_NAME, Some(row)).await? else {
            return Ok(None);
        };
        let Some(address_el) = self.port.find_element(&CANDIDATE_ADDRESS, Some(row)).await?
        else {
            return Ok(None);
        };
        let display_name = text_or_content(self.port, &name_el).await?;
        let display_address = text_or_content(self.port, &address_el).await?;
        if display_name.is_empty() {
            return Ok(None);
        }
        Ok(Some(Candidate {
            display_name,
            display_address,
            page_index: page,
            position_index: position,
            handle: name_el,
        }))
    }

    /// Click through to page `next`. `Ok(false)` when there is no such page
    /// or the site did not switch to it.
    async fn goto_page(&self, next: usize) -> Result<bool, PortError> {
        let Some(link) = self
            .port
            .find_element(&selectors::page_link(next), None)
            .await?
        else {
            return Ok(false);
        };
        if self.port.attribute(&link, "aria-disabled").await?.as_deref() == Some("true") {
            return Ok(false);
        }
        click_js(self.port, &link).await?;
        match dom::wait_for(
            self.port,
            &selectors::active_page_link(next),
            self.timings.wait,
            self.timings,
        )
        .await
        {
            Ok(_) => Ok(true),
            Err(err) if err.is_recoverable() => {
                tracing::warn!(page = next, error = %err, "page switch did not complete");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    async fn return_to_page(&self, page: usize) -> Result<(), ScraperError> {
        let failed = |reason: String| ScraperError::ResolutionFailed { reason };
        let link = self
            .port
            .find_element(&selectors::page_link(page), None)
            .await?
            .ok_or_else(|| failed(format!("no link back to page {page}")))?;
        click_js(self.port, &link).await?;
        dom::wait_for(
            self.port,
            &selectors::active_page_link(page),
            self.timings.wait,
            self.timings,
        )
        .await
        .map_err(|err| match err {
            PortError::NotFound(_) | PortError::Timeout(_) => {
                failed(format!("could not return to page {page}"))
            }
            other => other.into(),
        })?;
        Ok(())
    }

    /// Open the candidate's detail view and return its reference.
    async fn select(&self, candidate: &Candidate) -> Result<String, ScraperError> {
        scroll_into_view(self.port, &candidate.handle).await?;
        click_js(self.port, &candidate.handle).await?;
        dom::settle(self.timings).await;

        self.port.switch_to_frame(Frame::Default).await?;
        let entry = dom::wait_for(self.port, &ENTRY_IFRAME, self.timings.wait, self.timings)
            .await
            .map_err(|err| {
                if err.is_recoverable() {
                    ScraperError::ResolutionFailed {
                        reason: format!(
                            "detail view did not open for \"{}\"",
                            candidate.display_name
                        ),
                    }
                } else {
                    err.into()
                }
            })?;
        self.port
            .attribute(&entry, "src")
            .await?
            .filter(|src| !src.is_empty())
            .ok_or_else(|| ScraperError::ResolutionFailed {
                reason: "detail frame has no source".to_string(),
            })
    }
}

/// Highest-scoring candidate; the earliest wins a tie.
fn best_of(origin: &str, hint: &str, candidates: Vec<Candidate>) -> Option<ScoredCandidate> {
    let mut best: Option<ScoredCandidate> = None;
    for candidate in candidates {
        let score = similarity::score(
            origin,
            hint,
            &candidate.display_name,
            &candidate.display_address,
        );
        if best.as_ref().is_none_or(|b| score > b.score) {
            best = Some(ScoredCandidate { score, candidate });
        }
    }
    best
}

/// Find `best` again among freshly read `rows`: same position with the same
/// name and address, else any row with the same name and address, else
/// whatever now sits at the recorded position.
fn rematch<'r>(rows: &'r [Candidate], best: &Candidate) -> Option<&'r Candidate> {
    let at_position = |c: &&Candidate| c.position_index == best.position_index;
    rows.iter()
        .filter(at_position)
        .find(|c| c.same_listing(best))
        .or_else(|| rows.iter().find(|c| c.same_listing(best)))
        .or_else(|| rows.iter().find(at_position))
}

#[cfg(test)]
#[path = "resolver_test.rs"]
mod tests;
