//! The listing record and its merge semantics.

use serde::{Deserialize, Serialize};

/// A listing record, uniquely identified by an externally supplied `id`.
///
/// All fields other than `id` are optional; absent fields render as placeholders on the query
/// surface and are preserved across upserts by the merge in [`Listing::merge_onto`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// The natural key used for deduplication and upsert targeting. Not the storage engine's
    /// internal identifier.
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<Host>,
}

/// The host of a listing, stored embedded in the record rather than as a separate entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        rename = "hostDetails",
        skip_serializing_if = "Option::is_none"
    )]
    pub host_details: Option<Vec<String>>,
}

impl Listing {
    /// True when the listing carries a usable `id`.
    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }

    /// Merges this listing onto a previously stored one: fields present here win, fields absent
    /// here keep the stored value. `host` is replaced wholesale when present.
    pub fn merge_onto(self, existing: Self) -> Self {
        Self {
            id: self.id,
            title: self.title.or(existing.title),
            description: self.description.or(existing.description),
            url: self.url.or(existing.url),
            host: self.host.or(existing.host),
        }
    }
}
