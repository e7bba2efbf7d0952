//! Small compositions of port calls used across the crawler.

use crate::error::PortError;
use crate::poll::wait_until;
use crate::port::{AutomationPort, ElementRef, Frame, Locator};
use crate::selectors::{self, scripts};
use crate::settings::Timings;

/// Text of the first match, trimmed; `None` when nothing matches.
pub(crate) async fn find_text(
    port: &dyn AutomationPort,
    locator: &Locator,
    scope: Option<&ElementRef>,
) -> Result<Option<String>, PortError> {
    match port.find_element(locator, scope).await? {
        Some(el) => Ok(Some(port.text(&el).await?.trim().to_string())),
        None => Ok(None),
    }
}

/// Trimmed visible text, falling back to `textContent` when the element is
/// rendered off-screen (headless browsers report empty text for those).
pub(crate) async fn text_or_content(
    port: &dyn AutomationPort,
    element: &ElementRef,
) -> Result<String, PortError> {
    let text = port.text(element).await?;
    if !text.trim().is_empty() {
        return Ok(text.trim().to_string());
    }
    let content = port.run_script(scripts::TEXT_CONTENT, &[element]).await?;
    Ok(content.as_str().unwrap_or_default().trim().to_string())
}

pub(crate) async fn click_js(
    port: &dyn AutomationPort,
    element: &ElementRef,
) -> Result<(), PortError> {
    port.run_script(scripts::CLICK, &[element]).await?;
    Ok(())
}

pub(crate) async fn scroll_into_view(
    port: &dyn AutomationPort,
    element: &ElementRef,
) -> Result<(), PortError> {
    port.run_script(scripts::SCROLL_INTO_VIEW, &[element]).await?;
    Ok(())
}

/// Wait up to `timeout` for `locator` to match in the current frame.
pub(crate) async fn wait_for(
    port: &dyn AutomationPort,
    locator: &Locator,
    timeout: std::time::Duration,
    timings: &Timings,
) -> Result<ElementRef, PortError> {
    let what = locator.to_string();
    wait_until(&what, timeout, timings.poll, || async move {
        port.find_element(locator, None).await
    })
    .await
}

/// Switch to the top document, wait for the iframe matching `frame`, and
/// enter it.
pub(crate) async fn enter_frame(
    port: &dyn AutomationPort,
    frame: &Locator,
    timings: &Timings,
) -> Result<ElementRef, PortError> {
    port.switch_to_frame(Frame::Default).await?;
    let iframe = wait_for(port, frame, timings.wait, timings).await?;
    port.switch_to_frame(Frame::Element(&iframe)).await?;
    Ok(iframe)
}

/// Open a detail-view tab by label and give it time to render.
pub(crate) async fn open_tab(
    port: &dyn AutomationPort,
    label: &str,
    timings: &Timings,
) -> Result<(), PortError> {
    let tab = wait_for(port, &selectors::tab(label), timings.wait, timings).await?;
    click_js(port, &tab).await?;
    settle(timings).await;
    Ok(())
}

pub(crate) async fn settle(timings: &Timings) {
    if !timings.settle.is_zero() {
        tokio::time::sleep(timings.settle).await;
    }
}
