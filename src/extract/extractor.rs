use crate::config::ExtractorConfig;
use crate::extract::heuristics::HeuristicList;
use crate::extract::{ExtractError, ExtractedPage, PageLink};
use crate::url::{resolve_link, DomainScope};
use chrono::Utc;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Name reported when no candidate region matched
const BODY_REGION: &str = "body";

/// Extracts title, description, main text and internal links from HTML
///
/// Removal never mutates the tree: elements matched by a removal heuristic
/// (and everything below them) are skipped while walking.
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    remove: HeuristicList,
    candidates: HeuristicList,
    max_content_chars: usize,
    max_links: usize,
    body: Selector,
    title: Selector,
    heading: Selector,
    meta_description: Selector,
}

impl ContentExtractor {
    /// Builds an extractor from the configured heuristics and caps
    pub fn new(config: &ExtractorConfig) -> Result<Self, ExtractError> {
        Ok(Self {
            remove: HeuristicList::parse(config.remove_selectors.as_slice())?,
            candidates: HeuristicList::parse(config.content_selectors.as_slice())?,
            max_content_chars: config.max_content_chars,
            max_links: config.max_links,
            body: parse_fixed(BODY_REGION)?,
            title: parse_fixed("title")?,
            heading: parse_fixed("h1")?,
            meta_description: parse_fixed(
                r#"meta[name="description"], meta[property="og:description"]"#,
            )?,
        })
    }

    /// Extracts a page
    ///
    /// # Arguments
    ///
    /// * `html` - The raw document
    /// * `page_url` - Base for resolving relative links
    /// * `scope` - Links outside the scope are dropped
    ///
    /// # Returns
    ///
    /// * `Ok(ExtractedPage)` - Main region found and holds text
    /// * `Err(ExtractError::NoContent)` - Nothing to index on this page
    pub fn extract(
        &self,
        html: &str,
        page_url: &Url,
        scope: &DomainScope,
    ) -> Result<ExtractedPage, ExtractError> {
        let document = Html::parse_document(html);

        let (region_name, region, text) = self
            .select_region(&document)
            .ok_or(ExtractError::NoContent)?;

        let links = self.collect_links(region, page_url, scope);

        Ok(ExtractedPage {
            url: page_url.to_string(),
            title: self.extract_title(&document),
            description: self.extract_description(&document),
            text: truncate_chars(text, self.max_content_chars),
            links,
            region: region_name,
            extracted_at: Utc::now(),
        })
    }

    /// Tries each candidate in order, then the body
    ///
    /// A candidate only wins if it is not inside removed markup and has text
    /// once removed elements are skipped.
    fn select_region<'a>(&self, document: &'a Html) -> Option<(String, ElementRef<'a>, String)> {
        for heuristic in self.candidates.iter() {
            for element in document.select(heuristic.selector()) {
                if self.remove.covers(&element) {
                    continue;
                }
                let text = self.visible_text(element);
                if !text.is_empty() {
                    return Some((heuristic.name().to_string(), element, text));
                }
            }
        }

        let body = document.select(&self.body).next()?;
        let text = self.visible_text(body);
        if text.is_empty() {
            return None;
        }
        Some((BODY_REGION.to_string(), body, text))
    }

    fn visible_text(&self, element: ElementRef<'_>) -> String {
        let mut raw = String::new();
        self.push_text(element, &mut raw);
        collapse_whitespace(&raw)
    }

    fn push_text(&self, element: ElementRef<'_>, out: &mut String) {
        for child in element.children() {
            if let Some(text) = child.value().as_text() {
                out.push_str(text);
                out.push(' ');
            } else if let Some(child_element) = ElementRef::wrap(child) {
                if !self.remove.matches(&child_element) {
                    self.push_text(child_element, out);
                }
            }
        }
    }

    fn collect_links(&self, region: ElementRef<'_>, page_url: &Url, scope: &DomainScope) -> Vec<PageLink> {
        let mut anchors = Vec::new();
        self.push_anchors(region, &mut anchors);

        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for anchor in anchors {
            if links.len() >= self.max_links {
                break;
            }

            let text = self.visible_text(anchor);
            if text.is_empty() {
                continue;
            }

            let Some(url) = anchor
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, page_url))
            else {
                continue;
            };

            if !scope.contains(&url) || !seen.insert(url.to_string()) {
                continue;
            }

            links.push(PageLink {
                url: url.to_string(),
                text,
            });
        }

        links
    }

    fn push_anchors<'a>(&self, element: ElementRef<'a>, out: &mut Vec<ElementRef<'a>>) {
        for child in element.children().filter_map(ElementRef::wrap) {
            if self.remove.matches(&child) {
                continue;
            }
            if child.value().name() == "a" && child.value().attr("href").is_some() {
                out.push(child);
            } else {
                self.push_anchors(child, out);
            }
        }
    }

    fn extract_title(&self, document: &Html) -> Option<String> {
        document
            .select(&self.title)
            .chain(document.select(&self.heading))
            .map(|element| collapse_whitespace(&element.text().collect::<String>()))
            .find(|s| !s.is_empty())
    }

    fn extract_description(&self, document: &Html) -> Option<String> {
        document
            .select(&self.meta_description)
            .filter_map(|element| element.value().attr("content"))
            .map(collapse_whitespace)
            .find(|s| !s.is_empty())
    }
}

fn parse_fixed(source: &str) -> Result<Selector, ExtractError> {
    Selector::parse(source)
        .map_err(|e| ExtractError::InvalidSelector(format!("'{}': {:?}", source, e)))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keeps the first `max_chars` characters; the rest is dropped
fn truncate_chars(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text,
    }
}
