//! Ordered, named selector lists
//!
//! Both boilerplate removal and main-region selection are plain CSS selector
//! lists read from configuration. Order matters for region selection: the
//! first candidate that yields text wins.

use crate::extract::ExtractError;
use scraper::{ElementRef, Selector};

/// A CSS selector together with the text it was parsed from
#[derive(Debug, Clone)]
pub struct Heuristic {
    name: String,
    selector: Selector,
}

impl Heuristic {
    pub fn parse(source: &str) -> Result<Self, ExtractError> {
        let selector = Selector::parse(source)
            .map_err(|e| ExtractError::InvalidSelector(format!("'{}': {:?}", source, e)))?;
        Ok(Self {
            name: source.to_string(),
            selector,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }
}

/// An ordered list of heuristics
#[derive(Debug, Clone, Default)]
pub struct HeuristicList {
    entries: Vec<Heuristic>,
}

impl HeuristicList {
    pub fn parse<S: AsRef<str>>(sources: &[S]) -> Result<Self, ExtractError> {
        let entries = sources
            .iter()
            .map(|s| Heuristic::parse(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Heuristic> {
        self.entries.iter()
    }

    /// Returns true if any heuristic matches the element itself
    pub fn matches(&self, element: &ElementRef<'_>) -> bool {
        self.entries.iter().any(|h| h.selector.matches(element))
    }

    /// Returns true if the element or one of its ancestors matches
    pub fn covers(&self, element: &ElementRef<'_>) -> bool {
        self.matches(element)
            || element
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|ancestor| self.matches(&ancestor))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
