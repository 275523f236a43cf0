//! Fetch raw Kodik results and print how they decode and group.
//! Usage:
//!   cargo run --bin kodik_props -- list [limit]
//!   cargo run --bin kodik_props -- title <title>
//!   cargo run --bin kodik_props -- id <kodik_id>
//! Requires KODIK_API_TOKEN in the environment (.env supported).

use anicatalog::aggregate::aggregate;
use anicatalog::decode::decode_page;
use anicatalog::identity::canonical_key;
use anicatalog::kodik::{CatalogSource, KodikClient, PageFilters, PageRequest};
use anicatalog::models::RawPage;
use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::collections::BTreeSet;
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: cargo run --bin kodik_props -- list [limit]");
        eprintln!("       cargo run --bin kodik_props -- title <title>");
        eprintln!("       cargo run --bin kodik_props -- id <kodik_id>");
        std::process::exit(1);
    }

    let client = KodikClient::from_env()?;
    let page = match args[1].as_str() {
        "list" => {
            let limit = match args.get(2) {
                Some(v) => v.parse().context("limit must be an integer")?,
                None => 20,
            };
            let filters = PageFilters {
                with_material_data: true,
                ..PageFilters::default()
            };
            client.fetch_page(&PageRequest::first(limit, filters)).await?
        }
        "title" => {
            let title = args
                .get(2..)
                .map(|rest| rest.join(" "))
                .filter(|t| !t.is_empty())
                .ok_or_else(|| anyhow::anyhow!("missing title"))?;
            client.search_by_title(&title, 50).await?
        }
        "id" => {
            let id = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("missing kodik id"))?;
            client.list_by_id(id).await?
        }
        other => anyhow::bail!("unknown mode '{}'", other),
    };

    print_page(&page);
    Ok(())
}

fn print_page(page: &RawPage) {
    println!("total={} next_page={:?}", page.total, page.next_page);

    let mut field_names = BTreeSet::new();
    for raw in &page.results {
        field_names.extend(raw.keys().cloned());
    }
    println!("\nRaw fields seen ({}):", field_names.len());
    for name in &field_names {
        println!("  {name}");
    }

    let records = decode_page(page);
    println!(
        "\nDecoded {} of {} records:",
        records.len(),
        page.results.len()
    );
    for record in &records {
        let translation = record
            .translation
            .as_ref()
            .map(|t| format!("{} [{}] {}", t.id, t.kind, t.title))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<16} {:<28} {:<40} {}",
            record.id,
            canonical_key(record),
            record.title,
            translation
        );
    }

    let items = aggregate(records);
    println!("\nAggregated into {} items:", items.len());
    for item in &items {
        println!(
            "  {:<28} {:<40} members={} translations={} rating={}",
            item.key,
            item.record.title,
            item.member_count,
            item.translations.len(),
            item.record.rating
        );
    }
}
