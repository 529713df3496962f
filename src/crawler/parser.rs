//! HTML extraction for directory list and detail pages
//!
//! This module turns page bodies into records:
//! - Company rows from a listing page
//! - Field tables from a company detail page
//! - The "next page" link used by the page walker
//!
//! Missing required structure is a hard error; a changed site layout should
//! stop the run rather than produce empty records.

use crate::records::{DetailRecord, SeedRecord};
use crate::ScrapeError;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Pure parse functions over page bodies
///
/// `url` is the address the body was fetched from; it is used to resolve
/// relative links and to attribute errors.
pub trait RecordExtractor: Send + Sync {
    /// Parses every company row of a listing page, in document order
    fn parse_list_page(&self, url: &str, body: &str) -> Result<Vec<SeedRecord>, ScrapeError>;

    /// Parses the field tables of a company detail page
    fn parse_detail_page(&self, url: &str, body: &str) -> Result<DetailRecord, ScrapeError>;

    /// Returns the absolute URL of the next listing page, if any
    fn next_page_link(&self, url: &str, body: &str) -> Result<Option<String>, ScrapeError>;
}

/// Extractor for the manufacturer directory markup
#[derive(Debug, Clone)]
pub struct DirectoryExtractor {
    base_url: Url,
}

impl DirectoryExtractor {
    /// Creates an extractor resolving detail links against `base_url`
    pub fn new(base_url: &str) -> Result<Self, ScrapeError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
        })
    }

    fn parse_row(&self, url: &str, row: ElementRef<'_>) -> Result<SeedRecord, ScrapeError> {
        let name = element_text(must_select(url, row, "span.h4")?);
        let details = must_select(url, row, "div.d-sm-flex")?;

        let email = text_after_icon(details, "Email")?;
        let phone_number = text_after_icon(details, "Phone")?;
        let address = address_after_icon(details)?;
        let website = website_link(details)?;
        let products_manufactured = products_paragraph(details)?;

        let href = must_select(url, row, "a.btn.btn-sm.btn-primary")?
            .value()
            .attr("href")
            .ok_or_else(|| parse_error(url, "detail link has no href"))?;
        let detail_url = self.base_url.join(href.trim())?.to_string();

        Ok(SeedRecord {
            name,
            email,
            phone_number,
            address,
            website,
            products_manufactured,
            detail_url,
        })
    }
}

impl RecordExtractor for DirectoryExtractor {
    fn parse_list_page(&self, url: &str, body: &str) -> Result<Vec<SeedRecord>, ScrapeError> {
        let document = Html::parse_document(body);
        let view_content = must_select(url, document.root_element(), "div.view-content")?;

        let row_selector = selector("div.views-row")?;
        view_content
            .select(&row_selector)
            .map(|row| self.parse_row(url, row))
            .collect()
    }

    fn parse_detail_page(&self, url: &str, body: &str) -> Result<DetailRecord, ScrapeError> {
        let document = Html::parse_document(body);
        let summary = must_select(url, document.root_element(), "div#summary")?;

        let row_selector = selector("table tr")?;
        let cell_selector = selector("td")?;

        let mut details = DetailRecord::new();
        for row in summary.select(&row_selector) {
            let cells: Vec<ElementRef<'_>> = row.select(&cell_selector).collect();
            if cells.len() < 2 {
                continue;
            }

            let key = field_key(&element_text(cells[0]));
            let value = element_text(cells[1]);
            details.insert(key, value);
        }

        Ok(details)
    }

    fn next_page_link(&self, url: &str, body: &str) -> Result<Option<String>, ScrapeError> {
        let document = Html::parse_document(body);
        let next_selector = selector(r#"a.page-link[rel="next"][href]"#)?;

        let Some(href) = document
            .select(&next_selector)
            .next()
            .and_then(|link| link.value().attr("href"))
        else {
            return Ok(None);
        };

        let current = Url::parse(url)?;
        Ok(Some(current.join(href.trim())?.to_string()))
    }
}

/// Normalizes a detail-table label into a field name
///
/// Lowercases, drops colons, and turns spaces and slashes into underscores:
/// `"NAICS Code (Primary):"` becomes `"naics_code_(primary)"`.
pub fn field_key(label: &str) -> String {
    label
        .to_lowercase()
        .replace(':', "")
        .chars()
        .map(|c| if c == ' ' || c == '/' { '_' } else { c })
        .collect()
}

fn selector(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|e| ScrapeError::Parse {
        url: String::new(),
        message: format!("invalid selector {}: {:?}", css, e),
    })
}

fn parse_error(url: &str, message: impl Into<String>) -> ScrapeError {
    ScrapeError::Parse {
        url: url.to_string(),
        message: message.into(),
    }
}

/// First match of `css` under `scope`, or a parse error naming the selector
fn must_select<'a>(url: &str, scope: ElementRef<'a>, css: &str) -> Result<ElementRef<'a>, ScrapeError> {
    let sel = selector(css)?;
    scope
        .select(&sel)
        .next()
        .ok_or_else(|| parse_error(url, format!("could not find element '{}'", css)))
}

fn find<'a>(scope: ElementRef<'a>, css: &str) -> Result<Option<ElementRef<'a>>, ScrapeError> {
    let sel = selector(css)?;
    Ok(scope.select(&sel).next())
}

/// Text content with non-breaking spaces flattened and ends trimmed
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .replace('\u{a0}', " ")
        .trim()
        .to_string()
}

fn icon_parent<'a>(scope: ElementRef<'a>, title: &str) -> Result<Option<ElementRef<'a>>, ScrapeError> {
    let icon = find(scope, &format!(r#"i[title="{}"]"#, title))?;
    Ok(icon.and_then(|i| i.parent()).and_then(ElementRef::wrap))
}

fn text_after_icon(scope: ElementRef<'_>, title: &str) -> Result<String, ScrapeError> {
    Ok(icon_parent(scope, title)?
        .map(element_text)
        .unwrap_or_default())
}

/// Multi-line address block joined into one line
fn address_after_icon(scope: ElementRef<'_>) -> Result<String, ScrapeError> {
    let Some(parent) = icon_parent(scope, "Address")? else {
        return Ok(String::new());
    };

    let raw = parent.text().collect::<String>().replace('\u{a0}', " ");
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(", "))
}

/// `href` of the link following the globe icon
fn website_link(scope: ElementRef<'_>) -> Result<String, ScrapeError> {
    let Some(icon) = find(scope, "i.fas.fa-globe")? else {
        return Ok(String::new());
    };

    let link_selector = selector("a[href]")?;
    let href = icon
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find_map(|sibling| {
            if sibling.value().name() == "a" {
                sibling.value().attr("href")
            } else {
                sibling
                    .select(&link_selector)
                    .next()
                    .and_then(|a| a.value().attr("href"))
            }
        });

    Ok(href.map(|h| h.trim().to_string()).unwrap_or_default())
}

/// Paragraph following the "products" heading
fn products_paragraph(scope: ElementRef<'_>) -> Result<String, ScrapeError> {
    let Some(header) = find(scope, "h5")? else {
        return Ok(String::new());
    };

    Ok(header
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sibling| sibling.value().name() == "p")
        .map(element_text)
        .unwrap_or_default())
}
