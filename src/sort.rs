// Folder listing sort engine
// Stable, re-orderable ordering of folder children driven by header clicks

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::remote::FolderEntry;

/// Column a listing can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    Name,
    LastModifiedDateTime,
    Size,
    /// Any unrecognised column; sorting by it keeps input order
    #[serde(other)]
    Unknown,
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name => write!(f, "name"),
            Self::LastModifiedDateTime => write!(f, "lastModifiedDateTime"),
            Self::Size => write!(f, "size"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for SortKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "name" => Self::Name,
            "lastModifiedDateTime" | "modified" => Self::LastModifiedDateTime,
            "size" => Self::Size,
            _ => Self::Unknown,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Current ordering of a folder view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            key: SortKey::Name,
            direction: SortDirection::Asc,
        }
    }
}

impl SortSpec {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Header click: the active column flips direction, any other column
    /// becomes active in ascending order.
    pub fn click(self, key: SortKey) -> Self {
        if self.key == key {
            Self::new(key, self.direction.toggled())
        } else {
            Self::new(key, SortDirection::Asc)
        }
    }
}

fn compare(a: &FolderEntry, b: &FolderEntry, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortKey::LastModifiedDateTime => a.last_modified_date_time.cmp(&b.last_modified_date_time),
        SortKey::Size => a.size.cmp(&b.size),
        SortKey::Unknown => Ordering::Equal,
    }
}

/// Sort a copy of `entries` by `spec`.
///
/// `sort_by` is stable, so entries comparing equal keep their input order in
/// both directions.
pub fn sort(entries: &[FolderEntry], spec: SortSpec) -> Vec<FolderEntry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| {
        let ord = compare(a, b, spec.key);
        match spec.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
    sorted
}
