//! Output records produced by the crawler and the identifiers used to
//! deduplicate them across runs.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Numeric listing identifier taken from the detail page URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(EntityId)
    }
}

/// Entity ids already present in the latest master snapshot.
///
/// Loaded once before a run and shared read-only between sessions.
#[derive(Debug, Clone, Default)]
pub struct MasterIdSet(HashSet<EntityId>);

impl MasterIdSet {
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.0.contains(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<EntityId> for MasterIdSet {
    fn from_iter<I: IntoIterator<Item = EntityId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    pub intro: Option<String>,
    pub price: Option<String>,
    pub is_representative: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSnippet {
    pub date: NaiveDate,
    pub comment: String,
}

/// Ratings from the secondary directory lookup. All `None` when the lookup
/// failed or was not configured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecondaryRatings {
    pub score: Option<f64>,
    pub review_count: Option<u32>,
    pub taste: Option<u32>,
    pub value: Option<u32>,
    pub kindness: Option<u32>,
    pub mood: Option<u32>,
    pub parking: Option<u32>,
}

/// One extracted business listing.
///
/// Only `entity_id` is guaranteed; every other attribute is best-effort and
/// falls back to `None`, `false`, `0`, or an empty collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    pub entity_id: EntityId,
    pub origin_name: String,
    pub location: String,
    pub name: String,
    pub category: Option<String>,
    pub new_listing: bool,
    pub social_link: Option<String>,
    pub social_posts: Option<u64>,
    pub social_followers: Option<u64>,
    pub visitor_review_count: u64,
    pub blog_review_count: u64,
    #[serde(default)]
    pub review_keywords: BTreeMap<String, u64>,
    #[serde(default)]
    pub theme_mood: Vec<String>,
    #[serde(default)]
    pub theme_topic: Vec<String>,
    #[serde(default)]
    pub theme_purpose: Vec<String>,
    #[serde(default)]
    pub menu_items: Vec<MenuItem>,
    pub transit_distance_m: Option<u64>,
    pub transit_distance_text: Option<String>,
    pub on_tv: bool,
    pub parking_available: bool,
    pub michelin_listed: bool,
    pub age_2030: Option<u8>,
    pub gender_balance: Option<bool>,
    pub gender_male: Option<f64>,
    pub gender_female: Option<f64>,
    pub running_well: u8,
    #[serde(default)]
    pub reviews: Vec<ReviewSnippet>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub detail_url: Option<String>,
    #[serde(default)]
    pub secondary: SecondaryRatings,
    pub collected_at: DateTime<Utc>,
}

impl StoreRecord {
    /// A record with every optional attribute at its default.
    #[must_use]
    pub fn new(
        entity_id: EntityId,
        origin_name: &str,
        location: &str,
        collected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            entity_id,
            origin_name: origin_name.to_string(),
            location: location.to_string(),
            name: origin_name.to_string(),
            category: None,
            new_listing: false,
            social_link: None,
            social_posts: None,
            social_followers: None,
            visitor_review_count: 0,
            blog_review_count: 0,
            review_keywords: BTreeMap::new(),
            theme_mood: Vec::new(),
            theme_topic: Vec::new(),
            theme_purpose: Vec::new(),
            menu_items: Vec::new(),
            transit_distance_m: None,
            transit_distance_text: None,
            on_tv: false,
            parking_available: false,
            michelin_listed: false,
            age_2030: None,
            gender_balance: None,
            gender_male: None,
            gender_female: None,
            running_well: 0,
            reviews: Vec::new(),
            address: None,
            phone: None,
            latitude: None,
            longitude: None,
            detail_url: None,
            secondary: SecondaryRatings::default(),
            collected_at,
        }
    }
}
