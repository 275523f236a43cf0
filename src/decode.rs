//! Decoding of loosely-typed upstream objects into `CatalogRecord`s.
//!
//! Each field is read on its own: a missing or oddly typed value falls back to
//! the zero value of its type. Only a missing `id` rejects a record.
use serde_json::Value;
use tracing::{debug, warn};

use crate::coerce::{coerce_to_f64, coerce_to_i64, coerce_to_string, try_i64};
use crate::error::DecodeError;
use crate::models::{CatalogRecord, ExternalIds, RawObject, RawPage, RawPayload, Translation};

const ENRICHMENT_BLOCK: &str = "material_data";

pub fn decode(raw: &RawObject) -> Result<CatalogRecord, DecodeError> {
    let id = identifier(raw.get("id")).ok_or(DecodeError::MissingIdentifier)?;

    let mut record = CatalogRecord {
        id,
        kind: text(raw, "type"),
        link: text(raw, "link"),
        title: text(raw, "title"),
        original_title: text(raw, "title_orig"),
        alternate_title: text(raw, "other_title"),
        description: text(raw, "description"),
        year: small_int(raw.get("year")),
        episode_count: small_int(raw.get("episodes_count")),
        poster_url: first_non_empty(raw, &["poster_url", "image"]),
        genres: string_list(raw.get("genres")),
        external_ids: ExternalIds {
            kinopoisk_id: identifier(raw.get("kinopoisk_id")),
            shikimori_id: identifier(raw.get("shikimori_id")),
            imdb_id: identifier(raw.get("imdb_id")),
        },
        rating: 0.0,
        translation: raw.get("translation").and_then(translation),
        raw: RawPayload::new(raw.clone()),
    };

    if let Some(Value::Object(block)) = raw.get(ENRICHMENT_BLOCK) {
        overlay_enrichment(&mut record, block);
    }

    Ok(record)
}

pub fn decode_page(page: &RawPage) -> Vec<CatalogRecord> {
    decode_all(&page.results)
}

pub fn decode_all(results: &[RawObject]) -> Vec<CatalogRecord> {
    let mut dropped = 0usize;
    let records: Vec<CatalogRecord> = results
        .iter()
        .enumerate()
        .filter_map(|(index, raw)| match decode(raw) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(index, error = %e, "Dropping upstream record");
                dropped += 1;
                None
            }
        })
        .collect();
    if dropped > 0 {
        warn!(
            "Dropped {} of {} upstream records that could not be decoded",
            dropped,
            results.len()
        );
    }
    records
}

fn overlay_enrichment(record: &mut CatalogRecord, block: &RawObject) {
    if block.contains_key("kinopoisk_rating") {
        record.rating = coerce_to_f64(block.get("kinopoisk_rating"));
    }
    if record.genres.is_empty() {
        record.genres = string_list(block.get("genres"));
    }
    if record.genres.is_empty() {
        record.genres = string_list(block.get("anime_genres"));
    }
    if record.poster_url.is_empty() {
        record.poster_url = first_non_empty(block, &["poster_url", "anime_poster_url"]);
    }
}

fn identifier(value: Option<&Value>) -> Option<String> {
    match value? {
        v @ (Value::String(_) | Value::Number(_)) => {
            let id = coerce_to_string(Some(v)).trim().to_string();
            (!id.is_empty()).then_some(id)
        }
        _ => None,
    }
}

fn translation(value: &Value) -> Option<Translation> {
    let Value::Object(obj) = value else {
        return None;
    };
    let id = try_i64(obj.get("id"))?;
    Some(Translation {
        id,
        title: text(obj, "title"),
        kind: text(obj, "type"),
    })
}

/// Scalars only; containers in a text slot degrade to `""`.
fn scalar_text(value: Option<&Value>) -> String {
    match value {
        Some(v @ (Value::String(_) | Value::Number(_) | Value::Bool(_))) => {
            coerce_to_string(Some(v))
        }
        _ => String::new(),
    }
}

fn text(obj: &RawObject, key: &str) -> String {
    scalar_text(obj.get(key))
}

fn first_non_empty(obj: &RawObject, keys: &[&str]) -> String {
    keys.iter()
        .map(|k| text(obj, k))
        .find(|s| !s.trim().is_empty())
        .unwrap_or_default()
}

fn small_int(value: Option<&Value>) -> i32 {
    i32::try_from(coerce_to_i64(value)).unwrap_or(0)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| scalar_text(Some(v)))
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> RawObject {
        match v {
            Value::Object(m) => m,
            _ => panic!("test fixture must be an object"),
        }
    }

    #[test]
    fn rejects_records_without_id() {
        for raw in [
            json!({"title": "No id"}),
            json!({"id": null, "title": "Null id"}),
            json!({"id": "  ", "title": "Blank id"}),
            json!({"id": {"nested": 1}}),
        ] {
            assert_eq!(decode(&obj(raw)), Err(DecodeError::MissingIdentifier));
        }
    }

    #[test]
    fn decodes_a_typical_listing_row() {
        let raw = obj(json!({
            "id": "serial-4512",
            "type": "anime-serial",
            "link": "//kodik.info/serial/4512/abc/720p",
            "title": "Frieren",
            "title_orig": "Sousou no Frieren",
            "other_title": "Frieren: Beyond Journey's End",
            "year": 2023,
            "episodes_count": 28,
            "kinopoisk_id": "4512345",
            "shikimori_id": 52991,
            "imdb_id": "tt22248376",
            "translation": {"id": 610, "title": "AniLibria.TV", "type": "voice"},
            "material_data": {"kinopoisk_rating": 8.4, "poster_url": "https://kp/poster.jpg", "genres": ["аниме", "фэнтези"]}
        }));
        let record = decode(&raw).unwrap();
        assert_eq!(record.id, "serial-4512");
        assert_eq!(record.kind, "anime-serial");
        assert_eq!(record.original_title, "Sousou no Frieren");
        assert_eq!(record.alternate_title, "Frieren: Beyond Journey's End");
        assert_eq!(record.year, 2023);
        assert_eq!(record.episode_count, 28);
        assert_eq!(record.external_ids.kinopoisk_id.as_deref(), Some("4512345"));
        assert_eq!(record.external_ids.shikimori_id.as_deref(), Some("52991"));
        assert_eq!(record.rating, 8.4);
        assert_eq!(record.poster_url, "https://kp/poster.jpg");
        assert_eq!(record.genres, vec!["аниме", "фэнтези"]);
        assert_eq!(
            record.translation,
            Some(Translation {
                id: 610,
                title: "AniLibria.TV".to_string(),
                kind: "voice".to_string(),
            })
        );
        assert_eq!(record.raw.as_map(), &raw);
    }

    #[test]
    fn numeric_ids_render_as_integers() {
        let record = decode(&obj(json!({"id": 42.0, "kinopoisk_id": 1001.0}))).unwrap();
        assert_eq!(record.id, "42");
        assert_eq!(record.external_ids.kinopoisk_id.as_deref(), Some("1001"));
    }

    #[test]
    fn wrong_types_degrade_field_by_field() {
        let record = decode(&obj(json!({
            "id": "movie-1",
            "title": {"ru": "Название"},
            "description": ["not", "text"],
            "year": "2001",
            "episodes_count": "many",
            "genres": "drama",
            "kinopoisk_id": "",
            "translation": "AniDUB",
            "material_data": {"kinopoisk_rating": "n/a"}
        })))
        .unwrap();
        assert_eq!(record.title, "");
        assert_eq!(record.description, "");
        assert_eq!(record.year, 2001);
        assert_eq!(record.episode_count, 0);
        assert!(record.genres.is_empty());
        assert_eq!(record.external_ids.kinopoisk_id, None);
        assert_eq!(record.translation, None);
        assert_eq!(record.rating, 0.0);
    }

    #[test]
    fn translation_without_id_is_dropped() {
        let record = decode(&obj(json!({
            "id": "movie-2",
            "translation": {"title": "Subtitles", "type": "subtitles"}
        })))
        .unwrap();
        assert_eq!(record.translation, None);
    }

    #[test]
    fn poster_falls_back_to_image_then_enrichment() {
        let record = decode(&obj(json!({"id": "a", "poster_url": "", "image": "https://img/a.jpg"})))
            .unwrap();
        assert_eq!(record.poster_url, "https://img/a.jpg");

        let record = decode(&obj(json!({
            "id": "b",
            "material_data": {"anime_poster_url": "https://shiki/b.jpg"}
        })))
        .unwrap();
        assert_eq!(record.poster_url, "https://shiki/b.jpg");

        let record = decode(&obj(json!({
            "id": "c",
            "poster_url": "https://own/c.jpg",
            "material_data": {"poster_url": "https://kp/c.jpg"}
        })))
        .unwrap();
        assert_eq!(record.poster_url, "https://own/c.jpg");
    }

    #[test]
    fn enrichment_genres_only_fill_an_empty_list() {
        let record = decode(&obj(json!({
            "id": "a",
            "genres": ["Drama"],
            "material_data": {"genres": ["Comedy"]}
        })))
        .unwrap();
        assert_eq!(record.genres, vec!["Drama"]);

        let record = decode(&obj(json!({
            "id": "b",
            "material_data": {"anime_genres": ["Mecha"]}
        })))
        .unwrap();
        assert_eq!(record.genres, vec!["Mecha"]);
    }

    #[test]
    fn page_decode_skips_bad_records() {
        let page = RawPage {
            total: 3,
            next_page: None,
            results: vec![
                obj(json!({"id": "one"})),
                obj(json!({"title": "orphan"})),
                obj(json!({"id": 3})),
            ],
        };
        let ids: Vec<_> = decode_page(&page).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["one", "3"]);
    }
}
