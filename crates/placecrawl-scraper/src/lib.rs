pub mod chrome;
pub mod classifier;
pub(crate) mod dom;
pub mod enrich;
pub mod error;
pub mod extract;
#[cfg(test)]
mod fake;
pub mod orchestrator;
pub mod poll;
pub mod port;
pub mod resolver;
mod retry;
pub mod selectors;
pub mod session;
pub mod settings;
pub mod similarity;

pub use chrome::{ChromeFactory, ChromePort};
pub use classifier::FrameState;
pub use enrich::SecondarySource;
pub use error::{PortError, ScraperError};
pub use extract::Extractor;
pub use orchestrator::{chunk_targets, RunSummary};
pub use port::{AutomationPort, ElementRef, Frame, Locator, PortFactory};
pub use resolver::{Candidate, Resolver, Selection};
pub use session::{
    CheckpointSink, CrawlSession, FailureReason, SessionContext, SessionReport, StopSignal,
    TargetFailure,
};
pub use settings::{CrawlSettings, Timings};
