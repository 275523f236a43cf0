use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::aggregate::aggregate;
use crate::coerce::coerce_to_string;
use crate::decode::{decode, decode_page};
use crate::enrich::enrich;
use crate::error::CatalogError;
use crate::kodik::{CatalogSource, PageFilters, PageRequest, MAX_LIMIT};
use crate::models::{AggregatedItem, RawObject, RawPage, SearchPage};

pub const DEFAULT_PAGE_SIZE: i32 = 20;
const LISTING_TYPES: &str = "anime,anime-serial";
const NOT_FOUND_EXAMPLES: usize = 5;
const DIRECT_ID_PREFIXES: [&str; 2] = ["movie-", "serial-"];

#[derive(Clone)]
pub struct Catalog {
    source: Arc<dyn CatalogSource>,
}

impl Catalog {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self { source }
    }

    pub async fn search(
        &self,
        query: &str,
        page: i32,
        page_size: i32,
    ) -> Result<SearchPage, CatalogError> {
        let query = query.trim();
        if is_direct_id(query) {
            // upstream ids are lowercase
            let id = query.to_ascii_lowercase();
            info!(id = %id, "Search query is an id, resolving directly");
            let item = self.get_item(&id).await?;
            return Ok(SearchPage {
                items: vec![item],
                total: 1,
            });
        }

        let page = page.max(1);
        let page_size = normalize_page_size(page_size);
        let filters = PageFilters {
            types: Some(LISTING_TYPES.to_string()),
            title: (!query.is_empty()).then(|| query.to_string()),
            with_material_data: true,
            with_episodes: false,
        };

        let raw = self
            .walk_to_page(PageRequest::first(page_size, filters), page)
            .await?;
        let records = decode_page(&raw);
        let items = aggregate(records);
        debug!(
            rows = raw.results.len(),
            items = items.len(),
            total = raw.total,
            "Aggregated search page"
        );
        Ok(SearchPage {
            items,
            total: raw.total,
        })
    }

    pub async fn get_item(&self, id: &str) -> Result<AggregatedItem, CatalogError> {
        let id = id.trim();
        let raw = self.fetch_by_id(id).await?;
        let record = decode(&raw)?;
        info!(id = %record.id, title = %record.title, "Resolved item");
        let item = AggregatedItem::from_record(record);
        Ok(enrich(self.source.as_ref(), item).await)
    }

    // Past the end of the listing, the last page reached is returned.
    async fn walk_to_page(&self, first: PageRequest, page: i32) -> Result<RawPage, CatalogError> {
        let mut request = first;
        let mut current = 1;
        loop {
            let raw = self
                .source
                .fetch_page(&request)
                .await
                .map_err(CatalogError::Upstream)?;
            if current >= page {
                return Ok(raw);
            }
            match raw.next_page.clone() {
                Some(cursor) => {
                    request = request.next(cursor);
                    current += 1;
                }
                None => {
                    debug!(requested = page, reached = current, "Listing ended early");
                    return Ok(raw);
                }
            }
        }
    }

    async fn fetch_by_id(&self, id: &str) -> Result<RawObject, CatalogError> {
        if id.is_empty() {
            return Err(CatalogError::NotFound {
                id: String::new(),
                examples: Vec::new(),
            });
        }

        let primary = self
            .source
            .list_by_id(id)
            .await
            .map_err(CatalogError::Upstream)?;
        if let Some(found) = find_by_id(&primary, id) {
            return Ok(found);
        }

        debug!(id, "Not in listing, falling back to search");
        let fallback = self
            .source
            .search_by_id(id)
            .await
            .map_err(|e| CatalogError::Upstream(e.context("fallback id search failed")))?;
        if let Some(found) = find_by_id(&fallback, id) {
            return Ok(found);
        }

        let examples: Vec<String> = sample_ids(&primary)
            .chain(sample_ids(&fallback))
            .collect();
        warn!(id, ?examples, "Material not found");
        Err(CatalogError::NotFound {
            id: id.to_string(),
            examples,
        })
    }
}

/// On expiry the call is dropped, along with any upstream request in flight.
pub async fn with_deadline<T, F>(timeout: Duration, call: F) -> Result<T, CatalogError>
where
    F: Future<Output = Result<T, CatalogError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(CatalogError::Timeout),
    }
}

// movie-123, serial-456
pub fn is_direct_id(query: &str) -> bool {
    let lower = query.trim().to_ascii_lowercase();
    DIRECT_ID_PREFIXES.iter().any(|prefix| {
        lower
            .strip_prefix(prefix)
            .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
    })
}

fn normalize_page_size(page_size: i32) -> usize {
    let size = if page_size <= 0 {
        DEFAULT_PAGE_SIZE
    } else {
        page_size
    };
    usize::try_from(size).map_or(MAX_LIMIT, |s| s.min(MAX_LIMIT))
}

fn find_by_id(page: &RawPage, id: &str) -> Option<RawObject> {
    page.results
        .iter()
        .find(|obj| coerce_to_string(obj.get("id")) == id)
        .cloned()
}

fn sample_ids(page: &RawPage) -> impl Iterator<Item = String> + '_ {
    page.results
        .iter()
        .take(NOT_FOUND_EXAMPLES)
        .map(|obj| coerce_to_string(obj.get("id")))
}
