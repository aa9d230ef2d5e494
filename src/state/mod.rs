//! State tracking for both phases
//!
//! # Components
//!
//! - `UrlStatus`: status of a URL in the persisted crawl frontier (queued, visited, failed)
//! - `PipelineState`: per-URL state machine of the index pipeline

mod pipeline_state;
mod url_status;

pub use pipeline_state::PipelineState;
pub use url_status::UrlStatus;
