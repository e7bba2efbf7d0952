//! Browser-control capability the crawler depends on.
//!
//! The engine never talks to a concrete browser; it drives an
//! [`AutomationPort`]. [`crate::chrome`] provides the production adapter.

use std::borrow::Cow;
use std::fmt;

use async_trait::async_trait;

use crate::error::PortError;

/// How to find an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(Cow<'static, str>),
    XPath(Cow<'static, str>),
}

impl Locator {
    #[must_use]
    pub const fn css(selector: &'static str) -> Self {
        Locator::Css(Cow::Borrowed(selector))
    }

    #[must_use]
    pub const fn xpath(expr: &'static str) -> Self {
        Locator::XPath(Cow::Borrowed(expr))
    }

    #[must_use]
    pub fn xpath_owned(expr: String) -> Self {
        Locator::XPath(Cow::Owned(expr))
    }

    #[must_use]
    pub fn strategy(&self) -> &'static str {
        match self {
            Locator::Css(_) => "css",
            Locator::XPath(_) => "xpath",
        }
    }

    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Locator::Css(v) | Locator::XPath(v) => v,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.strategy(), self.value())
    }
}

/// Opaque handle to an element inside the current browsing context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(String);

impl ElementRef {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Frame<'a> {
    /// The top-level document.
    Default,
    /// The document inside an `<iframe>` element.
    Element(&'a ElementRef),
}

/// Generic browser control. One instance belongs to exactly one crawl
/// session; implementations need not support concurrent callers.
#[async_trait]
pub trait AutomationPort: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), PortError>;

    async fn switch_to_frame(&self, frame: Frame<'_>) -> Result<(), PortError>;

    /// `Ok(None)` when nothing matches.
    async fn find_element(
        &self,
        locator: &Locator,
        scope: Option<&ElementRef>,
    ) -> Result<Option<ElementRef>, PortError>;

    async fn find_elements(
        &self,
        locator: &Locator,
        scope: Option<&ElementRef>,
    ) -> Result<Vec<ElementRef>, PortError>;

    async fn click(&self, element: &ElementRef) -> Result<(), PortError>;

    /// Runs `script` as a function body; `arguments[i]` is `args[i]`.
    async fn run_script(
        &self,
        script: &str,
        args: &[&ElementRef],
    ) -> Result<serde_json::Value, PortError>;

    async fn text(&self, element: &ElementRef) -> Result<String, PortError>;

    async fn attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, PortError>;

    /// Releases the underlying browser.
    async fn close(&self) -> Result<(), PortError>;
}

/// Creates one independent port per crawl session.
#[async_trait]
pub trait PortFactory: Send + Sync {
    async fn open(&self, worker_id: usize) -> Result<Box<dyn AutomationPort>, PortError>;
}
