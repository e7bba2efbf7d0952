//! Frame-state classification: what did the search land on?
//!
//! The map site renders a matched listing inside `iframe#entryIframe` and a
//! result list inside `iframe#searchIframe`. Everything about that layout is
//! confined to this module and [`crate::selectors`].

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::dom::{self, find_text};
use crate::error::PortError;
use crate::poll::wait_until;
use crate::port::{AutomationPort, ElementRef, Frame};
use crate::selectors::{self, ENTRY_IFRAME, NO_RESULT_MARKER, NO_RESULT_TEXT, SEARCH_IFRAME};
use crate::settings::Timings;

#[derive(Debug, Clone)]
pub enum FrameState {
    /// The search opened a detail view directly.
    SingleResult { detail_ref: String },
    /// The search frame shows a candidate list; the port is left inside it.
    CandidateList,
    NoResults,
    Unknown,
    TransportError(PortError),
}

/// Search page URL for `query`.
#[must_use]
pub fn search_url(query: &str) -> String {
    format!(
        "{}{}",
        selectors::SEARCH_URL_PREFIX,
        utf8_percent_encode(query.trim(), NON_ALPHANUMERIC)
    )
}

/// Navigate to the site home and wait until the app shell is ready, so the
/// next search starts from a clean state.
///
/// # Errors
///
/// Returns the port error if navigation fails or the shell never renders.
pub async fn reset(port: &dyn AutomationPort, timings: &Timings) -> Result<(), PortError> {
    port.navigate(selectors::HOME_URL).await?;
    port.switch_to_frame(Frame::Default).await?;
    dom::wait_for(port, &selectors::ROOT, timings.wait, timings).await?;
    Ok(())
}

/// Submit `query` as a search.
///
/// # Errors
///
/// Returns the port error if navigation fails.
pub async fn submit_search(port: &dyn AutomationPort, query: &str) -> Result<(), PortError> {
    port.navigate(&search_url(query)).await
}

/// Classify the page produced by the last search. Never fails: every port
/// error becomes a [`FrameState`].
pub async fn classify(port: &dyn AutomationPort, timings: &Timings) -> FrameState {
    match detect(port, timings).await {
        Ok(state) => state,
        Err(err) if err.is_recoverable() => {
            tracing::debug!(error = %err, "no result frame appeared");
            FrameState::Unknown
        }
        Err(err) => FrameState::TransportError(err),
    }
}

enum ResultFrame {
    Entry(ElementRef),
    Search(ElementRef),
}

async fn detect(port: &dyn AutomationPort, timings: &Timings) -> Result<FrameState, PortError> {
    port.switch_to_frame(Frame::Default).await?;

    let first = wait_until("result frame", timings.wait, timings.poll, || async move {
        locate_result_frame(port).await
    })
    .await?;

    // The list frame can render a moment before the detail frame on a
    // direct hit; look once more before settling on the list.
    let frame = match first {
        ResultFrame::Search(search) => {
            dom::settle(timings).await;
            match port.find_element(&ENTRY_IFRAME, None).await? {
                Some(entry) => ResultFrame::Entry(entry),
                None => ResultFrame::Search(search),
            }
        }
        entry @ ResultFrame::Entry(_) => entry,
    };

    match frame {
        ResultFrame::Entry(iframe) => {
            let detail_ref = port.attribute(&iframe, "src").await?.unwrap_or_default();
            tracing::debug!(detail_ref = %detail_ref, "search opened a detail view");
            Ok(FrameState::SingleResult { detail_ref })
        }
        ResultFrame::Search(iframe) => {
            port.switch_to_frame(Frame::Element(&iframe)).await?;
            let marker = find_text(port, &NO_RESULT_MARKER, None).await?;
            if marker.is_some_and(|text| text.contains(NO_RESULT_TEXT)) {
                Ok(FrameState::NoResults)
            } else {
                Ok(FrameState::CandidateList)
            }
        }
    }
}

async fn locate_result_frame(
    port: &dyn AutomationPort,
) -> Result<Option<ResultFrame>, PortError> {
    if let Some(entry) = port.find_element(&ENTRY_IFRAME, None).await? {
        return Ok(Some(ResultFrame::Entry(entry)));
    }
    Ok(port
        .find_element(&SEARCH_IFRAME, None)
        .await?
        .map(ResultFrame::Search))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeCandidate, FakeSite};

    #[test]
    fn search_url_percent_encodes_query() {
        assert_eq!(
            search_url(" ABC Diner "),
            "https://map.naver.com/p/search/ABC%20Diner"
        );
        assert_eq!(
            search_url("카페"),
            "https://map.naver.com/p/search/%EC%B9%B4%ED%8E%98"
        );
    }

    async fn classify_query(site: &FakeSite, query: &str) -> FrameState {
        let timings = Timings::fast();
        reset(&site.browser, &timings).await.unwrap();
        submit_search(&site.browser, query).await.unwrap();
        classify(&site.browser, &timings).await
    }

    #[tokio::test]
    async fn detail_frame_means_single_result() {
        let site = FakeSite::new();
        let detail = site.titled_detail(1001, "ABC Diner");
        site.single_result("ABC Diner", &detail);

        let state = classify_query(&site, "ABC Diner").await;
        assert!(
            matches!(state, FrameState::SingleResult { ref detail_ref } if *detail_ref == detail.url),
            "unexpected state: {state:?}"
        );
    }

    #[tokio::test]
    async fn list_frame_means_candidate_list() {
        let site = FakeSite::new();
        site.candidate_list(
            "ABC",
            vec![vec![FakeCandidate {
                name: "ABC Diner",
                address: "5 Main St",
                detail: None,
            }]],
        );

        let state = classify_query(&site, "ABC").await;
        assert!(matches!(state, FrameState::CandidateList), "got {state:?}");
    }

    #[tokio::test]
    async fn no_match_marker_means_no_results() {
        let site = FakeSite::new();
        site.no_results("Nowhere Cafe");

        let state = classify_query(&site, "Nowhere Cafe").await;
        assert!(matches!(state, FrameState::NoResults), "got {state:?}");
    }

    #[tokio::test]
    async fn missing_frames_mean_unknown() {
        let site = FakeSite::new();
        let state = classify_query(&site, "unrouted query").await;
        assert!(matches!(state, FrameState::Unknown), "got {state:?}");
    }

    #[tokio::test]
    async fn transport_failure_is_reported_not_raised() {
        let site = FakeSite::new();
        let detail = site.titled_detail(1001, "ABC Diner");
        site.single_result("ABC Diner", &detail);
        let timings = Timings::fast();
        submit_search(&site.browser, "ABC Diner").await.unwrap();
        site.browser.close().await.unwrap();

        let state = classify(&site.browser, &timings).await;
        assert!(matches!(state, FrameState::TransportError(_)), "got {state:?}");
    }
}
