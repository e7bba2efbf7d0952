//! Secondary-directory enrichment.

use async_trait::async_trait;
use placecrawl_core::{SecondaryRatings, StoreRecord};

use crate::error::ScraperError;

/// A second directory consulted once per collected record.
#[async_trait]
pub trait SecondarySource: Send + Sync {
    /// Ratings for the business with this name and address.
    async fn lookup(
        &self,
        name: &str,
        address: Option<&str>,
    ) -> Result<SecondaryRatings, ScraperError>;
}

/// Ratings for `record`, or all-`None` ratings when the lookup fails.
pub async fn enrich(source: &dyn SecondarySource, record: &StoreRecord) -> SecondaryRatings {
    match source.lookup(&record.name, record.address.as_deref()).await {
        Ok(ratings) => ratings,
        Err(err) => {
            tracing::warn!(
                entity_id = %record.entity_id,
                error = %err,
                "secondary lookup failed, leaving ratings empty"
            );
            SecondaryRatings::default()
        }
    }
}
