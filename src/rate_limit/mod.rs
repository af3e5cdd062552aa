//! Debounce and throttle helpers for UI callbacks.
//!
//! - **Debounce**: run once, after a quiet period with no further calls.
//! - **Throttle**: run at most once per interval, dropping the excess.
//! - **Batch**: run several callbacks together, in order, on one deferred task.

mod limiter;

pub use limiter::{Callback, RateLimiter};
