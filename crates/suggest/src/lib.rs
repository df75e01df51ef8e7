//! Suggestion fetcher for the formula editor.
//!
//! Fetches the full suggestion list from a single configured endpoint and
//! filters it client-side. The view consumes it through [`SuggestionFeed`],
//! which runs fetches off the event loop, reuses recent results, and drops
//! completions for queries the user has already typed past.
//!
//! No GUI concepts. No retries.

mod cache;
mod client;
mod feed;
mod filter;

/// A candidate tag as served by the suggestion endpoint.
pub use fxbar_engine::Tag as Suggestion;

pub use cache::{SuggestionCache, DEFAULT_STALE_TIME};
pub use client::{SuggestClient, SuggestError, SuggestionSource, DEFAULT_TIMEOUT};
pub use feed::{FeedState, SuggestionFeed};
pub use filter::{filter_suggestions, matches_query};
