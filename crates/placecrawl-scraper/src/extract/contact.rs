use std::sync::LazyLock;

use placecrawl_core::{CrawlTarget, StoreRecord};
use regex::Regex;

use super::{normalize_profile_link, soft, Extractor};
use crate::dom::{self, find_text, scroll_into_view, text_or_content};
use crate::error::{PortError, ScraperError};
use crate::port::Locator;
use crate::selectors::{
    ADDRESS, CONVENIENCES, MICHELIN_BADGE, PARKING_WORDS, PHONE, SOCIAL_LINK, TAB_HOME,
    TRANSIT_DISTANCE, TV_BADGE,
};

static DISTRICT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([가-힣]+구)").expect("valid regex"));

static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

/// First `…구` district in an address, or `"unknown"`.
#[must_use]
pub(super) fn derive_location(address: Option<&str>) -> String {
    address
        .and_then(|a| DISTRICT.captures(a))
        .map_or_else(|| "unknown".to_string(), |caps| caps[1].to_string())
}

#[derive(Debug, Default)]
struct Transit {
    meters: Option<u64>,
    text: Option<String>,
}

impl Extractor<'_> {
    /// Social link, address, derived location, and phone.
    pub(super) async fn fill_contact(
        &self,
        target: &CrawlTarget,
        record: &mut StoreRecord,
    ) -> Result<(), ScraperError> {
        record.social_link = soft("social link", None, self.social_link()).await?;

        let address = soft("address", None, self.address()).await?;
        if target.location_hint().is_empty() {
            record.location = derive_location(address.as_deref());
        }
        record.address = address;

        record.phone = soft("phone", None, self.optional_text(&PHONE)).await?;
        Ok(())
    }

    /// Badges, amenities and transit distance from the home tab.
    pub(super) async fn fill_home(&self, record: &mut StoreRecord) -> Result<(), ScraperError> {
        soft("home tab", (), dom::open_tab(self.port, TAB_HOME, self.timings)).await?;

        record.michelin_listed = soft("michelin badge", false, self.exists(&MICHELIN_BADGE)).await?;
        record.on_tv = soft("tv badge", false, self.exists(&TV_BADGE)).await?;
        record.parking_available = soft("parking", false, self.parking()).await?;

        let transit = soft("transit distance", Transit::default(), self.transit()).await?;
        record.transit_distance_m = transit.meters;
        record.transit_distance_text = transit.text;
        Ok(())
    }

    async fn social_link(&self) -> Result<Option<String>, PortError> {
        let anchor =
            dom::wait_for(self.port, &SOCIAL_LINK, self.timings.short_wait, self.timings).await?;
        let href = self.port.attribute(&anchor, "href").await?.unwrap_or_default();
        let profile = normalize_profile_link(&href);
        if profile.is_none() {
            tracing::debug!(href = %href, "social link is not a profile");
        }
        Ok(profile)
    }

    async fn address(&self) -> Result<Option<String>, PortError> {
        let element = dom::wait_for(self.port, &ADDRESS, self.timings.wait, self.timings).await?;
        scroll_into_view(self.port, &element).await?;
        let text = text_or_content(self.port, &element).await?;
        Ok((!text.is_empty()).then_some(text))
    }

    async fn optional_text(&self, locator: &Locator) -> Result<Option<String>, PortError> {
        Ok(find_text(self.port, locator, None)
            .await?
            .filter(|text| !text.is_empty()))
    }

    async fn exists(&self, locator: &Locator) -> Result<bool, PortError> {
        Ok(self.port.find_element(locator, None).await?.is_some())
    }

    async fn parking(&self) -> Result<bool, PortError> {
        let conveniences = find_text(self.port, &CONVENIENCES, None).await?;
        Ok(conveniences.is_some_and(|text| PARKING_WORDS.iter().any(|word| text.contains(word))))
    }

    async fn transit(&self) -> Result<Transit, PortError> {
        let Some(raw) = find_text(self.port, &TRANSIT_DISTANCE, None).await? else {
            return Ok(Transit::default());
        };
        let text = raw.replace(['\n', '\r'], " ");
        let meters = NUMBER
            .find_iter(&text)
            .last()
            .and_then(|m| m.as_str().parse().ok());
        Ok(Transit {
            meters,
            text: Some(text),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_is_first_district_token() {
        assert_eq!(
            derive_location(Some("서울특별시 강남구 테헤란로 152")),
            "강남구"
        );
        assert_eq!(derive_location(Some("서울 중구 세종대로 110")), "중구");
    }

    #[test]
    fn location_without_district_is_unknown() {
        assert_eq!(derive_location(Some("경기 성남시 분당로 1")), "unknown");
        assert_eq!(derive_location(None), "unknown");
    }
}
