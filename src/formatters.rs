use std::fmt::Display;

use chrono::{DateTime, Local, TimeZone, Utc};

use crate::browser::page_count;
use crate::detail::{DetailSource, ResolvedDetail};
use crate::models::{CatalogPage, CollectionPage, CollectionQuery, PokemonSummary};

/// Height and weight as "0.7 m • 6.9 kg"; either side is "-" when unknown.
pub fn format_size(height_dm: Option<u32>, weight_hg: Option<u32>) -> String {
    let height = height_dm
        .map(|h| format!("{:.1} m", f64::from(h) / 10.0))
        .unwrap_or_else(|| "-".to_string());
    let weight = weight_hg
        .map(|w| format!("{:.1} kg", f64::from(w) / 10.0))
        .unwrap_or_else(|| "-".to_string());
    format!("{height} • {weight}")
}

pub fn format_caught_at(at: &DateTime<Utc>) -> String {
    format_timestamp_in(at, &Local)
}

pub fn format_timestamp_in<Tz>(at: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    at.with_timezone(tz).format("%Y-%m-%d %H:%M").to_string()
}

/// "pikachu" -> "Pikachu"
pub fn display_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn format_id(id: Option<u32>) -> String {
    id.map(|id| format!("#{id:>4}"))
        .unwrap_or_else(|| "    ?".to_string())
}

pub fn format_summaries(items: &[PokemonSummary]) -> String {
    let mut output = String::new();
    for item in items {
        output.push_str(&format!("{}  {}\n", format_id(item.id), display_name(&item.name)));
    }
    output
}

pub fn format_catalog_page(page: &CatalogPage, limit: u32, offset: u32) -> String {
    let mut output = format_summaries(&page.items);
    let last = u64::from(offset) + page.items.len() as u64;
    output.push_str(&format!(
        "Showing {}-{} of {} (limit {})\n",
        if page.items.is_empty() { offset } else { offset + 1 },
        last,
        page.count,
        limit
    ));
    output
}

pub fn format_collection_page(page: &CollectionPage, query: &CollectionQuery) -> String {
    let mut output = String::new();

    if page.items.is_empty() {
        output.push_str("No Pokémon caught yet");
        if let Some(search) = &query.search {
            output.push_str(&format!(" matching '{search}'"));
        }
        output.push('\n');
    }

    for item in &page.items {
        output.push_str(&format!(
            "{}  {:<16} {:<18} caught {}\n",
            format_id(Some(item.id)),
            display_name(&item.name),
            format_size(item.height_dm, item.weight_hg),
            format_caught_at(&item.caught_at)
        ));
    }

    output.push_str(&format!(
        "Page {} of {} ({} total, sorted by {} {})\n",
        query.page,
        page_count(page.total, query.page_size),
        page.total,
        query.sort_by,
        query.sort_dir
    ));
    output
}

pub fn format_detail(resolved: &ResolvedDetail) -> String {
    let detail = &resolved.detail;
    let mut output = format!("#{} {}\n", detail.id, display_name(&detail.name));
    output.push_str(&format!("  Sprite:    {}\n", detail.sprite()));
    output.push_str(&format!(
        "  Size:      {}\n",
        format_size(detail.height_decimeters, detail.weight_hectograms)
    ));
    if !detail.types.is_empty() {
        output.push_str(&format!("  Types:     {}\n", detail.types.join(", ")));
    }
    if !detail.abilities.is_empty() {
        output.push_str(&format!("  Abilities: {}\n", detail.abilities.join(", ")));
    }
    match (resolved.source, detail.caught_at) {
        (DetailSource::Collection, Some(at)) => {
            output.push_str(&format!("  Caught:    {}\n", format_caught_at(&at)));
        }
        (DetailSource::Collection, None) => output.push_str("  Caught\n"),
        (DetailSource::Catalog, _) => output.push_str("  Not caught yet\n"),
    }
    output
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::PokemonDetail;

    #[test]
    fn size_uses_metric_units() {
        assert_eq!(format_size(Some(7), Some(69)), "0.7 m • 6.9 kg");
        assert_eq!(format_size(Some(17), None), "1.7 m • -");
        assert_eq!(format_size(None, None), "- • -");
    }

    #[test]
    fn timestamp_in_given_zone() {
        let at: DateTime<Utc> = "2024-03-01T12:05:00Z".parse().unwrap();
        assert_eq!(format_timestamp_in(&at, &Utc), "2024-03-01 12:05");
    }

    #[test]
    fn display_name_capitalizes() {
        assert_eq!(display_name("pikachu"), "Pikachu");
        assert_eq!(display_name(""), "");
    }

    #[test]
    fn unknown_ids_render_as_question_mark() {
        let items = vec![
            PokemonSummary {
                id: Some(25),
                name: "pikachu".to_string(),
                sprite_url: None,
            },
            PokemonSummary {
                id: None,
                name: "glitch".to_string(),
                sprite_url: None,
            },
        ];
        let output = format_summaries(&items);
        assert!(output.contains("#  25  Pikachu"));
        assert!(output.contains("    ?  Glitch"));
    }

    #[test]
    fn empty_collection_mentions_search() {
        let page = CollectionPage {
            items: Vec::new(),
            total: 0,
        };
        let query = CollectionQuery::default().search(Some("mew"));
        let output = format_collection_page(&page, &query);
        assert!(output.contains("No Pokémon caught yet matching 'mew'"));
        assert!(output.contains("Page 1 of 1"));
    }

    #[test]
    fn catalog_detail_is_marked_not_caught() {
        let resolved = ResolvedDetail {
            detail: Arc::new(PokemonDetail {
                id: 1,
                name: "bulbasaur".to_string(),
                sprite_url: None,
                height_decimeters: Some(7),
                weight_hectograms: Some(69),
                abilities: vec!["overgrow".to_string()],
                types: vec!["grass".to_string(), "poison".to_string()],
                caught_at: None,
            }),
            source: DetailSource::Catalog,
        };
        let output = format_detail(&resolved);
        assert!(output.starts_with("#1 Bulbasaur"));
        assert!(output.contains("0.7 m • 6.9 kg"));
        assert!(output.contains("grass, poison"));
        assert!(output.contains("Not caught yet"));
    }
}
