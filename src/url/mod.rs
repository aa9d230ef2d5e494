//! URL handling for the indexer
//!
//! Every set of URLs in the crate (frontier, visited, repository keys) is keyed
//! by the normalized form produced here, and [`DomainScope`] decides which
//! URLs belong to the target site.

mod domain;
mod normalize;
mod resolve;

pub use domain::{extract_domain, DomainScope};
pub use normalize::{canonicalize, normalize_url};
pub use resolve::{is_skipped_link, resolve_link};
