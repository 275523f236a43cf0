use anyhow::Result;
use async_trait::async_trait;

use crate::models::RawPage;

mod client;

pub use client::KodikClient;

pub const DEFAULT_PAGE_LIMIT: usize = 50;
pub const DEFAULT_TITLE_LIMIT: usize = 20;
pub const DEFAULT_XREF_LIMIT: usize = 100;
pub const MAX_LIMIT: usize = 100;

#[async_trait]
pub trait CatalogSource: Send + Sync {
    // title filter switches to the search endpoint
    async fn fetch_page(&self, request: &PageRequest) -> Result<RawPage>;
    async fn list_by_id(&self, id: &str) -> Result<RawPage>;
    async fn search_by_id(&self, id: &str) -> Result<RawPage>;
    async fn search_by_title(&self, title: &str, limit: usize) -> Result<RawPage>;
    async fn search_by_xref(&self, kinopoisk_id: &str, limit: usize) -> Result<RawPage>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageFilters {
    pub types: Option<String>,
    pub title: Option<String>,
    pub with_material_data: bool,
    pub with_episodes: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: usize,
    pub cursor: Option<String>,
    pub filters: PageFilters,
}

impl PageRequest {
    pub fn first(limit: usize, filters: PageFilters) -> Self {
        Self {
            limit,
            cursor: None,
            filters,
        }
    }

    pub fn next(&self, cursor: String) -> Self {
        Self {
            cursor: Some(cursor),
            ..self.clone()
        }
    }
}

pub fn clamp_limit(limit: usize, default: usize) -> usize {
    if limit == 0 || limit > MAX_LIMIT {
        default
    } else {
        limit
    }
}
