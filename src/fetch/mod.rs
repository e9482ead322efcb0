//! Fetch adapters
//!
//! Traits the engine and the update path are written against, plus the
//! Admin API implementations:
//!
//! - `RestPrimaryFetcher` / `GraphQlPrimaryFetcher` - primary listings
//! - `GraphQlMetafieldFetcher` / `RestMetafieldFetcher` - custom-field lookups
//! - `RestMutator` - record and custom-field writes
//! - `GraphQlDefinitionSource` - custom-field definitions

mod graphql;
mod rest;
mod types;

pub use graphql::{GraphQlDefinitionSource, GraphQlMetafieldFetcher, GraphQlPrimaryFetcher};
pub use rest::{
    RestMetafieldFetcher, RestMutator, RestPrimaryFetcher, DEFAULT_REST_METAFIELD_CALLS,
};
pub use types::{
    DefinitionSource, Mutator, PrimaryFetcher, PrimaryPage, PrimaryRequest, SecondaryFetcher,
    SecondaryPage, SecondaryRecord, SecondaryRequest,
};

#[cfg(test)]
mod tests;
