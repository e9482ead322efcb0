//! HTTP transport for the Admin API
//!
//! # Features
//!
//! - **Automatic Retries**: Configurable retry logic with backoff
//! - **Rate Limiting**: Token bucket pacing using governor
//! - **REST**: `Link` header cursors on listings
//! - **GraphQL**: response envelope with errors and query cost

mod client;
mod graphql;
mod rate_limit;

pub use client::{
    AdminClient, AdminClientConfig, AdminClientConfigBuilder, RestResponse, ACCESS_TOKEN_HEADER,
};
pub use graphql::{GraphQlError, GraphQlResponse, ResponseExtensions, THROTTLED_CODE};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
