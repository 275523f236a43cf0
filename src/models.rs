use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

pub type RawObject = Map<String, Value>;

// Kept verbatim next to the decoded record, never read back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPayload(Arc<RawObject>);

impl RawPayload {
    pub fn new(object: RawObject) -> Self {
        Self(Arc::new(object))
    }

    pub fn as_map(&self) -> &RawObject {
        &self.0
    }
}

impl Serialize for RawPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.as_ref().serialize(serializer)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RawPage {
    pub total: u64,
    pub next_page: Option<String>,
    pub results: Vec<RawObject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Translation {
    pub id: i64,
    pub title: String,
    pub kind: String,
}

// Never Some("").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExternalIds {
    pub kinopoisk_id: Option<String>,
    pub shikimori_id: Option<String>,
    pub imdb_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CatalogRecord {
    pub id: String,
    pub kind: String,
    pub link: String,
    pub title: String,
    pub original_title: String,
    pub alternate_title: String,
    pub description: String,
    pub year: i32,
    pub episode_count: i32,
    pub poster_url: String,
    pub genres: Vec<String>,
    pub external_ids: ExternalIds,
    pub rating: f64,
    pub translation: Option<Translation>,
    #[serde(skip)]
    pub raw: RawPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedItem {
    pub key: String,
    pub record: CatalogRecord,
    pub translations: BTreeMap<i64, Translation>,
    pub member_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub items: Vec<AggregatedItem>,
    pub total: u64,
}
