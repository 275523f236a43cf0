//! Folding of per-translation upstream rows into one item per title.
use std::collections::BTreeMap;

use crate::identity::canonical_key;
use crate::models::{AggregatedItem, CatalogRecord};

impl AggregatedItem {
    pub fn from_record(record: CatalogRecord) -> Self {
        let key = canonical_key(&record);
        Self::with_key(key, record)
    }

    fn with_key(key: String, record: CatalogRecord) -> Self {
        let mut translations = BTreeMap::new();
        if let Some(t) = record.translation.clone() {
            translations.insert(t.id, t);
        }
        Self {
            key,
            record,
            translations,
            member_count: 1,
        }
    }

    pub fn absorb(&mut self, incoming: CatalogRecord) {
        self.fill_from(incoming);
        self.member_count += 1;
    }

    /// Same merge as `absorb`, without counting a new member.
    pub fn fill_from(&mut self, incoming: CatalogRecord) {
        let rep = &mut self.record;
        if rep.poster_url.is_empty() && !incoming.poster_url.is_empty() {
            rep.poster_url = incoming.poster_url;
        }
        if rep.description.is_empty() && !incoming.description.is_empty() {
            rep.description = incoming.description;
        }
        if rep.genres.is_empty() && !incoming.genres.is_empty() {
            rep.genres = incoming.genres;
        }
        rep.rating = rep.rating.max(incoming.rating);

        if let Some(t) = incoming.translation {
            self.translations.entry(t.id).or_insert(t);
        }
    }

    #[cfg(test)]
    fn translation_ids(&self) -> std::collections::HashSet<i64> {
        self.translations.keys().copied().collect()
    }
}

// Sorted by title, ties by key, so arrival order never shows.
pub fn aggregate<I>(records: I) -> Vec<AggregatedItem>
where
    I: IntoIterator<Item = CatalogRecord>,
{
    let mut groups: BTreeMap<String, AggregatedItem> = BTreeMap::new();
    for record in records {
        let key = canonical_key(&record);
        match groups.get_mut(&key) {
            Some(item) => item.absorb(record),
            None => {
                groups.insert(key.clone(), AggregatedItem::with_key(key, record));
            }
        }
    }

    let mut items: Vec<AggregatedItem> = groups.into_values().collect();
    items.sort_by(|a, b| a.record.title.as_bytes().cmp(b.record.title.as_bytes()));
    items
}
