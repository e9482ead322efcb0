//! Entity module
//!
//! Resource catalog, global identifiers and the per-record model.
//!
//! # Overview
//!
//! - `ResourceKind` / `ResourceDescriptor` - static description of each resource
//! - `Capabilities` - flags the engine and the update path branch on
//! - `EntityModel` - one raw record plus merged custom-field values
//! - `Gid` - `gid://shopify/<Type>/<id>` conversion

mod catalog;
mod gid;
mod model;

pub use catalog::{
    Capabilities, FieldSpec, PrimarySource, ResourceDescriptor, ResourceKind, RestPath,
};
pub use gid::{gid_for, is_gid, parse_gid, Gid};
pub use model::{EntityModel, MetafieldWrite, MutationPayload, DEFAULT_METAFIELD_TYPE};
