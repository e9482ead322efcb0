//! GraphQL response envelope

use crate::budget::QueryCost;
use crate::error::{Error, Result};
use serde::Deserialize;
use serde_json::Value;

/// Error code the Admin API uses when the cost bucket is empty
pub const THROTTLED_CODE: &str = "THROTTLED";

/// One entry of the top-level `errors` array
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphQlError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub extensions: Option<Value>,
}

impl GraphQlError {
    /// `extensions.code`, when present
    pub fn code(&self) -> Option<&str> {
        self.extensions.as_ref()?.get("code")?.as_str()
    }
}

/// `extensions` of a response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseExtensions {
    #[serde(default)]
    pub cost: Option<QueryCost>,
}

/// Parsed GraphQL response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphQlResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
    #[serde(default)]
    pub extensions: ResponseExtensions,
}

impl GraphQlResponse {
    /// Reported query cost
    pub fn cost(&self) -> Option<&QueryCost> {
        self.extensions.cost.as_ref()
    }

    /// Whether the request was rejected for lack of budget
    pub fn is_throttled(&self) -> bool {
        self.errors.iter().any(|e| e.code() == Some(THROTTLED_CODE))
    }

    /// `data`, or the joined error messages
    pub fn into_data(self) -> Result<Value> {
        if !self.errors.is_empty() {
            let message = self
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(Error::graphql(message));
        }
        self.data
            .filter(|d| !d.is_null())
            .ok_or_else(|| Error::decode("GraphQL response has no data"))
    }
}
