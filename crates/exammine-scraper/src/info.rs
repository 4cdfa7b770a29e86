//! Information lookups: search page, first result, rendered detail page.

use scraper::Html;

use crate::client::PageFetcher;
use crate::error::ScraperError;
use crate::extract::{
    compile_selector, resolve_url, select_all, select_attr, select_text, text_or,
    FALLBACK_MANUFACTURER, FALLBACK_SECTION,
};
use crate::profile::{InfoLayout, InfoSourceProfile};
use crate::types::InfoRecord;

/// Rendered sections of a bula page and the block headings feeding each one.
const BULA_SECTIONS: &[(&str, &[&str])] = &[
    ("Apresentação", &["apresentação", "apresentações"]),
    ("Composição", &["composição"]),
    ("Indicações", &["para que este medicamento é indicado?"]),
    ("Como usar", &["como devo usar este medicamento?"]),
    ("Contraindicações", &["quando não devo usar este medicamento?"]),
    (
        "Reações Adversas",
        &["quais os males que este medicamento pode me causar?"],
    ),
];

/// Looks `query` up on one information source.
///
/// Returns `Ok(None)` when the search page has no result link.
///
/// # Errors
///
/// Propagates fetch failures and invalid profile selectors.
pub async fn lookup_info(
    fetcher: &PageFetcher,
    profile: &InfoSourceProfile,
    query: &str,
) -> Result<Option<InfoRecord>, ScraperError> {
    let search_url = profile.search_url_for(query);
    tracing::debug!(source = %profile.name, url = %search_url, "searching information source");

    let search_html = fetcher.fetch_html(&search_url).await?;
    let Some(detail_url) = find_result_link(&search_html, profile)? else {
        tracing::info!(source = %profile.name, query, "no search results");
        return Ok(None);
    };

    tracing::debug!(source = %profile.name, url = %detail_url, "fetching detail page");
    let detail_html = fetcher.fetch_html(&detail_url).await?;
    let content = render_info_page(&detail_html, &profile.layout, query)?;

    Ok(Some(InfoRecord {
        content,
        source: detail_url,
    }))
}

/// Absolute URL of the first search result, if any.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidSelector`] for a malformed `result_link`.
pub fn find_result_link(
    html: &str,
    profile: &InfoSourceProfile,
) -> Result<Option<String>, ScraperError> {
    let selector = compile_selector(&profile.result_link)?;
    let document = Html::parse_document(html);
    Ok(select_attr(document.root_element(), &selector, "href")
        .filter(|href| !href.is_empty())
        .map(|href| resolve_url(&profile.base_url, &href)))
}

/// Renders a detail page to the text stored in [`InfoRecord::content`].
///
/// # Errors
///
/// Returns [`ScraperError::InvalidSelector`] for malformed layout selectors.
pub fn render_info_page(
    html: &str,
    layout: &InfoLayout,
    query: &str,
) -> Result<String, ScraperError> {
    match layout {
        InfoLayout::SectionBlocks {
            title,
            manufacturer,
            block,
            block_title,
            block_content,
        } => render_section_blocks(
            html,
            &SectionSelectors {
                title,
                manufacturer,
                block,
                block_title,
                block_content,
            },
            query,
        ),
        InfoLayout::Specifications {
            title,
            manufacturer,
            description,
            spec_item,
            spec_label,
            spec_value,
        } => render_specifications(
            html,
            &SpecSelectors {
                title,
                manufacturer,
                description,
                spec_item,
                spec_label,
                spec_value,
            },
            query,
        ),
    }
}

struct SectionSelectors<'a> {
    title: &'a str,
    manufacturer: &'a str,
    block: &'a str,
    block_title: &'a str,
    block_content: &'a str,
}

struct SpecSelectors<'a> {
    title: &'a str,
    manufacturer: &'a str,
    description: &'a str,
    spec_item: &'a str,
    spec_label: &'a str,
    spec_value: &'a str,
}

fn render_section_blocks(
    html: &str,
    selectors: &SectionSelectors<'_>,
    query: &str,
) -> Result<String, ScraperError> {
    let title_sel = compile_selector(selectors.title)?;
    let manufacturer_sel = compile_selector(selectors.manufacturer)?;
    let block_sel = compile_selector(selectors.block)?;
    let block_title_sel = compile_selector(selectors.block_title)?;
    let block_content_sel = compile_selector(selectors.block_content)?;

    let document = Html::parse_document(html);
    let root = document.root_element();

    let title = page_title(select_text(root, &title_sel), query);
    let manufacturer = text_or(select_text(root, &manufacturer_sel), FALLBACK_MANUFACTURER);

    // Later blocks with the same heading replace earlier ones.
    let mut blocks: Vec<(String, String)> = Vec::new();
    for block in select_all(root, &block_sel) {
        let (Some(heading), Some(body)) = (
            select_text(block, &block_title_sel),
            select_text(block, &block_content_sel),
        ) else {
            continue;
        };
        upsert(&mut blocks, heading.to_lowercase(), body);
    }

    let mut parts = vec![format!("# {title}"), format!("Fabricante: {manufacturer}")];
    for (heading, keys) in BULA_SECTIONS {
        let body = keys
            .iter()
            .find_map(|key| blocks.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone()));
        parts.push(format!("## {heading}"));
        parts.push(text_or(body, FALLBACK_SECTION));
    }

    Ok(parts.join("\n\n"))
}

fn render_specifications(
    html: &str,
    selectors: &SpecSelectors<'_>,
    query: &str,
) -> Result<String, ScraperError> {
    let title_sel = compile_selector(selectors.title)?;
    let manufacturer_sel = compile_selector(selectors.manufacturer)?;
    let description_sel = compile_selector(selectors.description)?;
    let item_sel = compile_selector(selectors.spec_item)?;
    let label_sel = compile_selector(selectors.spec_label)?;
    let value_sel = compile_selector(selectors.spec_value)?;

    let document = Html::parse_document(html);
    let root = document.root_element();

    let title = page_title(select_text(root, &title_sel), query);
    let manufacturer = text_or(select_text(root, &manufacturer_sel), FALLBACK_MANUFACTURER);
    let description = text_or(select_text(root, &description_sel), FALLBACK_SECTION);

    let mut specs: Vec<(String, String)> = Vec::new();
    for item in select_all(root, &item_sel) {
        if let (Some(label), Some(value)) =
            (select_text(item, &label_sel), select_text(item, &value_sel))
        {
            upsert(&mut specs, label.to_lowercase(), value);
        }
    }

    let mut parts = vec![
        format!("# {title}"),
        format!("Fabricante: {manufacturer}"),
        "## Descrição".to_owned(),
        description,
        "## Especificações".to_owned(),
    ];
    parts.extend(
        specs
            .into_iter()
            .map(|(label, value)| format!("### {}\n{value}", capitalize(&label))),
    );

    Ok(parts.join("\n\n"))
}

fn page_title(found: Option<String>, query: &str) -> String {
    found
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| query.trim().to_owned())
}

fn upsert(entries: &mut Vec<(String, String)>, key: String, value: String) {
    match entries.iter_mut().find(|(k, _)| *k == key) {
        Some(entry) => entry.1 = value,
        None => entries.push((key, value)),
    }
}

/// Upper-cases the first character and lower-cases the rest.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
