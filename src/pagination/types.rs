//! Cursor types
//!
//! Cursors are opaque to the host; these types give them structure inside
//! the fetchers.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Position in a (possibly multi-listing) REST resource
///
/// Resources backed by several listings walk them in order; `phase` is the
/// listing index and `page_info` the position inside it (`None` = first page).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestCursor {
    pub phase: usize,
    pub page_info: Option<String>,
}

impl RestCursor {
    /// First page of the given listing
    pub fn start_of(phase: usize) -> Self {
        Self {
            phase,
            page_info: None,
        }
    }

    /// A later page of the given listing
    pub fn page(phase: usize, page_info: impl Into<String>) -> Self {
        Self {
            phase,
            page_info: Some(page_info.into()),
        }
    }
}

impl fmt::Display for RestCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.phase, self.page_info.as_deref().unwrap_or(""))
    }
}

impl FromStr for RestCursor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some((phase, page_info)) = s.split_once('|') else {
            // bare page_info from a single-listing resource
            return Ok(Self::page(0, s));
        };
        let phase = phase
            .parse()
            .map_err(|_| Error::continuation(format!("Invalid REST cursor '{s}'")))?;
        Ok(Self {
            phase,
            page_info: Some(page_info.to_string()).filter(|p| !p.is_empty()),
        })
    }
}

/// GraphQL connection `pageInfo`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub end_cursor: Option<String>,
}

impl PageInfo {
    /// Cursor of the next page, if there is one
    pub fn next_cursor(&self) -> Option<String> {
        if self.has_next_page {
            self.end_cursor.clone()
        } else {
            None
        }
    }
}
