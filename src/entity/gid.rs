//! Global identifiers
//!
//! GraphQL addresses records as `gid://shopify/<Type>/<id>`; REST uses the
//! bare numeric id. The two are converted without any lookup.

use crate::error::{Error, Result};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Matches `gid://shopify/Product/123`, optionally followed by a query string
static GID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^gid://shopify/([A-Za-z]+)/(\d+)(?:\?.*)?$").unwrap());

/// A parsed global identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Gid {
    /// GraphQL type tag (e.g. "Product")
    pub resource_type: String,
    /// Numeric id in the REST API
    pub id: u64,
}

impl Gid {
    /// Build a gid from a type tag and numeric id
    pub fn new(resource_type: impl Into<String>, id: u64) -> Self {
        Self {
            resource_type: resource_type.into(),
            id,
        }
    }
}

impl fmt::Display for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gid://shopify/{}/{}", self.resource_type, self.id)
    }
}

impl FromStr for Gid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let caps = GID_REGEX
            .captures(s)
            .ok_or_else(|| Error::InvalidGid { gid: s.to_string() })?;
        let id = caps[2]
            .parse()
            .map_err(|_| Error::InvalidGid { gid: s.to_string() })?;
        Ok(Self::new(&caps[1], id))
    }
}

/// Format the gid for a numeric id
pub fn gid_for(resource_type: &str, id: u64) -> String {
    Gid::new(resource_type, id).to_string()
}

/// Parse a gid string
pub fn parse_gid(gid: &str) -> Result<Gid> {
    gid.parse()
}

/// Whether a string looks like a gid at all
pub fn is_gid(value: &str) -> bool {
    value.starts_with("gid://")
}
