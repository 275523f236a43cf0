use crate::models::CatalogRecord;

pub const PRIMARY_XREF_PREFIX: &str = "xref1:";
pub const SECONDARY_XREF_PREFIX: &str = "xref2:";
pub const TITLE_PREFIX: &str = "title:";
pub const RECORD_ID_PREFIX: &str = "id:";

/// Key shared by every upstream row that describes the same title.
///
/// Cross-reference ids win over the title: Kinopoisk first, then Shikimori.
/// Without either, the normalized title plus release year is used; a record
/// with no title at all only groups with itself.
pub fn canonical_key(record: &CatalogRecord) -> String {
    if let Some(id) = record.external_ids.kinopoisk_id.as_deref() {
        return format!("{PRIMARY_XREF_PREFIX}{id}");
    }
    if let Some(id) = record.external_ids.shikimori_id.as_deref() {
        return format!("{SECONDARY_XREF_PREFIX}{id}");
    }
    let title = normalize_title(&record.title);
    if title.is_empty() {
        return format!("{RECORD_ID_PREFIX}{}", record.id);
    }
    format!("{TITLE_PREFIX}{title}|{}", record.year)
}

pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}
