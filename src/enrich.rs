use tracing::{debug, info, warn};

use crate::decode::decode_all;
use crate::identity::{canonical_key, normalize_title};
use crate::kodik::{CatalogSource, DEFAULT_TITLE_LIMIT, DEFAULT_XREF_LIMIT};
use crate::models::{AggregatedItem, RawPage};

/// Only candidates with the item's own key are merged. A failed lookup
/// leaves the item untouched.
pub async fn enrich(source: &dyn CatalogSource, mut item: AggregatedItem) -> AggregatedItem {
    let page = match secondary_lookup(source, &item).await {
        Some(Ok(page)) => page,
        Some(Err(e)) => {
            warn!(key = %item.key, "Enrichment lookup failed, keeping item as is: {:#}", e);
            return item;
        }
        None => return item,
    };

    let before = item.translations.len();
    let mut accepted = 0usize;
    let mut rejected = 0usize;
    for candidate in decode_all(&page.results) {
        let key = canonical_key(&candidate);
        if key != item.key {
            debug!(
                candidate = %candidate.id,
                candidate_key = %key,
                item_key = %item.key,
                "Rejecting enrichment candidate"
            );
            rejected += 1;
            continue;
        }
        // The lookup often returns the item's own row again; merging it is a no-op.
        item.fill_from(candidate);
        accepted += 1;
    }

    info!(
        key = %item.key,
        accepted,
        rejected,
        new_translations = item.translations.len() - before,
        "Enriched item"
    );
    item
}

async fn secondary_lookup(
    source: &dyn CatalogSource,
    item: &AggregatedItem,
) -> Option<anyhow::Result<RawPage>> {
    if let Some(kp) = item.record.external_ids.kinopoisk_id.as_deref() {
        debug!(kinopoisk_id = kp, "Enriching by cross-reference");
        return Some(source.search_by_xref(kp, DEFAULT_XREF_LIMIT).await);
    }
    let title = normalize_title(&item.record.title);
    if title.is_empty() {
        debug!(key = %item.key, "No title to enrich by");
        return None;
    }
    debug!(title = %title, "Enriching by title");
    Some(source.search_by_title(&title, DEFAULT_TITLE_LIMIT).await)
}
