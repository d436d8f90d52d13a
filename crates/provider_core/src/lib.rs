//! Provider-facing plumbing shared by every weather adapter: the
//! `WeatherSource` capability, a fixed-window rate limiter, and a
//! TTL-bounded observation cache.

pub mod cache;
pub mod rate_limit;

use async_trait::async_trait;
use common::{GeoLocation, Result, WeatherObservation};

pub use cache::{CacheKey, ObservationCache};
pub use rate_limit::RateLimiter;

/// A single upstream weather provider, normalized to canonical units.
///
/// The aggregator holds an ordered collection of these and never branches
/// on a concrete provider.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Stable provider name, used in consensus `sources` and failure reports.
    fn name(&self) -> &'static str;

    /// Fetch current conditions at `location`.
    async fn current_weather(&self, location: GeoLocation) -> Result<WeatherObservation>;
}

/// Truncate `body` to at most `max_bytes`, backing off to the previous char
/// boundary. Upstream error bodies are arbitrary text; a byte slice straight
/// at `max_bytes` panics when it lands inside a multi-byte character.
pub fn truncate_body(body: &str, max_bytes: usize) -> &str {
    if body.len() <= max_bytes {
        return body;
    }
    let mut end = max_bytes;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
