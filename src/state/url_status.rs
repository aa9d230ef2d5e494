use std::fmt;

/// Status of a discovered URL in the persisted crawl frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlStatus {
    /// Discovered and waiting (or in flight when the run stopped)
    Queued,

    /// Fetched successfully
    Visited,

    /// Fetch failed; counts as visited and is never retried automatically
    Failed,
}

impl UrlStatus {
    /// Returns true once the URL has been fetched, successfully or not
    pub fn is_visited(&self) -> bool {
        matches!(self, Self::Visited | Self::Failed)
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Visited => "visited",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "visited" => Some(Self::Visited),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for UrlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
