//! Reference rate feed collaborators.
//!
//! The engine never fetches anything itself; callers run a [`RateFeed`]
//! and hand the resulting table (or the failure) to the engine.

pub mod provider;

pub use provider::{parse_feed, FeedError, JsonFileFeed, RateFeed, StaticFeed};
