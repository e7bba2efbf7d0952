//! Home-tab datalab widgets: theme keywords, age ranking, gender split.

use placecrawl_core::StoreRecord;

use super::{soft, Extractor};
use crate::dom::{click_js, find_text, scroll_into_view, text_or_content};
use crate::error::{PortError, ScraperError};
use crate::poll::{wait_until, wait_until_stable};
use crate::selectors::{
    scripts, AGE_BARS, AGE_BAR_VALUE, AGE_CHART, THEME_CATEGORY, THEME_CONTAINER, THEME_EXPAND,
    THEME_KEYWORDS, THEME_MOOD, THEME_PURPOSE, THEME_ROWS, THEME_TOPIC,
};

/// Age bars in display order: 10s, 20s, 30s, 40s, 50s, 60s.
const AGE_BAR_COUNT: usize = 6;

/// Gender split at or above which a place counts as male-skewed.
const MALE_SKEW_PERCENT: f64 = 55.0;

/// `2` when both the 20s and 30s bars rank first or second, `1` when one
/// of them does, else `0`. `ranks` holds one rank per age bar, `0` when
/// unreadable.
#[must_use]
pub fn age_2030_score(ranks: &[u32]) -> u8 {
    let top = |idx: usize| matches!(ranks.get(idx), Some(1 | 2));
    match (top(1), top(2)) {
        (true, true) => 2,
        (true, false) | (false, true) => 1,
        (false, false) => 0,
    }
}

#[derive(Debug, Default)]
struct Themes {
    mood: Vec<String>,
    topic: Vec<String>,
    purpose: Vec<String>,
}

#[derive(Debug, Default)]
struct Gender {
    male: Option<f64>,
    female: Option<f64>,
    balance: Option<bool>,
}

impl Extractor<'_> {
    pub(super) async fn fill_datalab(&self, record: &mut StoreRecord) -> Result<(), ScraperError> {
        soft("page scroll", (), self.scroll_to_bottom()).await?;
        soft("theme expand", (), self.expand_themes()).await?;

        let themes = soft("theme keywords", Themes::default(), self.themes()).await?;
        record.theme_mood = themes.mood;
        record.theme_topic = themes.topic;
        record.theme_purpose = themes.purpose;

        record.age_2030 = soft("age chart", None, self.age_2030()).await?;

        let gender = soft("gender chart", Gender::default(), self.gender()).await?;
        record.gender_male = gender.male;
        record.gender_female = gender.female;
        record.gender_balance = gender.balance;
        Ok(())
    }

    /// Scroll until the page stops growing so lazily rendered widgets exist.
    async fn scroll_to_bottom(&self) -> Result<(), PortError> {
        let port = self.port;
        wait_until_stable("page height", self.timings.wait, self.timings.poll, || async move {
            let height = port.run_script(scripts::SCROLL_PAGE_TO_BOTTOM, &[]).await?;
            Ok::<_, PortError>(height.as_u64())
        })
        .await?;
        Ok(())
    }

    /// Click the theme "more" control until it reports itself expanded.
    async fn expand_themes(&self) -> Result<(), PortError> {
        if self.port.find_element(&THEME_EXPAND, None).await?.is_none() {
            return Ok(());
        }
        let port = self.port;
        wait_until("theme expansion", self.timings.wait, self.timings.poll, || async move {
            let Some(button) = port.find_element(&THEME_EXPAND, None).await? else {
                return Ok(None);
            };
            let class = port.attribute(&button, "class").await?.unwrap_or_default();
            if class.contains("expanded") {
                return Ok(Some(()));
            }
            scroll_into_view(port, &button).await?;
            click_js(port, &button).await?;
            Ok::<_, PortError>(None)
        })
        .await
    }

    async fn themes(&self) -> Result<Themes, PortError> {
        let mut themes = Themes::default();
        let Some(container) = self.port.find_element(&THEME_CONTAINER, None).await? else {
            return Ok(themes);
        };

        for row in self.port.find_elements(&THEME_ROWS, Some(&container)).await? {
            let Some(category) = find_text(self.port, &THEME_CATEGORY, Some(&row)).await? else {
                continue;
            };
            let bucket = match category.as_str() {
                THEME_MOOD => &mut themes.mood,
                THEME_TOPIC => &mut themes.topic,
                THEME_PURPOSE => &mut themes.purpose,
                _ => continue,
            };
            for keyword in self.port.find_elements(&THEME_KEYWORDS, Some(&row)).await? {
                let text = self.port.text(&keyword).await?.replace(',', "");
                let text = text.trim();
                if !text.is_empty() {
                    bucket.push(text.to_string());
                }
            }
        }
        Ok(themes)
    }

    async fn age_2030(&self) -> Result<Option<u8>, PortError> {
        if self.port.find_element(&AGE_CHART, None).await?.is_none() {
            return Ok(None);
        }
        let bars = self.port.find_elements(&AGE_BARS, None).await?;
        if bars.len() < AGE_BAR_COUNT {
            tracing::debug!(bars = bars.len(), "age chart incomplete");
            return Ok(Some(0));
        }

        let mut ranks = Vec::with_capacity(AGE_BAR_COUNT);
        for bar in bars.iter().take(AGE_BAR_COUNT) {
            scroll_into_view(self.port, bar).await?;
            let rank = match self.port.find_element(&AGE_BAR_VALUE, Some(bar)).await? {
                Some(value) => text_or_content(self.port, &value)
                    .await?
                    .parse()
                    .unwrap_or(0),
                None => 0,
            };
            ranks.push(rank);
        }
        Ok(Some(age_2030_score(&ranks)))
    }

    async fn gender(&self) -> Result<Gender, PortError> {
        let male = self.port.run_script(scripts::GENDER_MALE, &[]).await?;
        let female = self.port.run_script(scripts::GENDER_FEMALE, &[]).await?;
        let (Some(male), Some(female)) = (male.as_str(), female.as_str()) else {
            return Ok(Gender::default());
        };

        let male = percent(male);
        let female = percent(female);
        Ok(Gender {
            male: Some(male),
            female: Some(female),
            balance: Some(male < MALE_SKEW_PERCENT),
        })
    }
}

/// Rounded percentage; unparseable text reads as `0`.
fn percent(text: &str) -> f64 {
    text.trim()
        .trim_end_matches('%')
        .parse::<f64>()
        .map_or(0.0, f64::round)
}
