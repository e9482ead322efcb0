//! # shoptable-sync
//!
//! Resumable, rate-budget-aware sync of e-commerce Admin API resources
//! (products, variants, orders, customers, collections, pages, locations,
//! metaobjects) into rows, with write-back of edited rows.
//!
//! ## Features
//!
//! - **Bounded slices**: each call does a bounded amount of work and hands
//!   back an opaque continuation to resume from
//! - **Mixed protocols**: REST or GraphQL listings, with custom-field values
//!   merged in from GraphQL
//! - **Rate budget**: GraphQL query costs size the next slice, or defer it
//! - **Write-back**: row edits become creates, updates and custom-field writes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shoptable_sync::{ConnectorConfig, DefinitionCache, ResourceKind, ShopConnector, SyncParams};
//!
//! #[tokio::main]
//! async fn main() -> shoptable_sync::Result<()> {
//!     let connector = ShopConnector::new(ConnectorConfig::from_file("shop.yaml")?)?;
//!     let params = SyncParams::new().select(["title", "custom.color"]);
//!     let mut cache = DefinitionCache::new();
//!
//!     let mut previous = None;
//!     loop {
//!         let slice = connector
//!             .run_sync_slice(ResourceKind::Product, previous.as_deref(), &params, &mut cache)
//!             .await?;
//!         println!("{} rows", slice.rows.len());
//!         if slice.is_final() {
//!             break;
//!         }
//!         previous = slice.continuation;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        ShopConnector                            │
//! │  run_sync_slice()   run_update_batch()   delete()   columns()   │
//! └─────────────────────────────────────────────────────────────────┘
//!                │                               │
//!        ┌───────┴───────┐               ┌───────┴────────┐
//!        │  SyncEngine   │               │ UpdateReconciler│
//!        │ budget, batch │               │ validate, write │
//!        └───────┬───────┘               └───────┬────────┘
//! ┌──────────────┼───────────────┬───────────────┼─────────────┐
//! │  Primary     │  Secondary    │  Mutator      │ Definitions │
//! │  REST/GraphQL│  metafields   │  REST+GraphQL │ GraphQL     │
//! └──────────────┴───────────────┴───────────────┴─────────────┘
//!                          AdminClient
//! ```

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Admin API client with retry and rate limiting
pub mod http;

/// REST `Link` cursors and GraphQL page info
pub mod pagination;

/// Query-cost based slice sizing
pub mod budget;

/// Resource catalog, global ids and the record model
pub mod entity;

/// Field selection, definition cache and columns
pub mod schema;

/// Resumption token carried between slices
pub mod continuation;

/// Fetch and write adapters
pub mod fetch;

/// Main execution engine
pub mod engine;

/// Row edits back to the store
pub mod update;

/// Store configuration
pub mod config;

/// Host-facing connector
pub mod connector;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::ConnectorConfig;
pub use connector::{CheckResult, ShopConnector, SliceOutput, SyncParams};
pub use continuation::Continuation;
pub use entity::ResourceKind;
pub use schema::DefinitionCache;
pub use update::RowEdit;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
