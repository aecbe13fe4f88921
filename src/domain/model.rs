use serde::{Deserialize, Serialize};
use std::fmt;

/// A named search partition (a town or city).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Area {
    name: String,
}

impl Area {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory name used to partition this area's checkpoint files.
    pub fn dir_name(&self) -> String {
        self.name
            .trim()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '-' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One business listing as extracted from a search results page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub business_name: Option<String>,
    pub address: Option<String>,
    pub telephone: Option<String>,
    pub website: Option<String>,
    pub listing_url: Option<String>,
}

impl ListingRecord {
    pub fn dedup_key(&self) -> (Option<&str>, Option<&str>) {
        (self.listing_url.as_deref(), self.telephone.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordFlag {
    pub keyword: String,
    pub present: bool,
}

/// A listing tagged with keyword-presence flags from its detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub listing: ListingRecord,
    /// Flags in configured keyword order.
    pub flags: Vec<KeywordFlag>,
}

impl EnrichedRecord {
    pub fn flag(&self, keyword: &str) -> Option<bool> {
        self.flags
            .iter()
            .find(|f| f.keyword == keyword)
            .map(|f| f.present)
    }
}

/// Pipeline stage whose output is checkpointed per area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Raw,
    Enriched,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Raw => f.write_str("raw"),
            Stage::Enriched => f.write_str("enriched"),
        }
    }
}

/// Raw HTTP outcome handed from transports to the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResponse {
    pub status: u16,
    pub body: String,
}

impl PageResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Statuses that will not change on retry.
    pub fn is_gone(&self) -> bool {
        matches!(self.status, 404 | 410)
    }
}

/// Per-stage summary passed between pipeline phases.
#[derive(Debug, Clone, Default)]
pub struct StageReport {
    pub areas: Vec<Area>,
    pub completed: Vec<Area>,
    pub skipped: Vec<Area>,
    pub failed: Vec<Area>,
    pub records: usize,
}
