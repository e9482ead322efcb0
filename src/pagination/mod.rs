//! Pagination module
//!
//! REST listings paginate through `page_info` tokens carried in the `Link`
//! header; GraphQL connections through `pageInfo.endCursor`.

mod link;
mod types;

pub use link::{next_page_info, parse_link_header};
pub use types::{PageInfo, RestCursor};
