//! Priority-aware, multi-window, in-process rate limiter.
//!
//! Callers block in [`RateLimiter::acquire`] (and its variants) until they
//! are admitted, their timeout elapses, or they are cancelled. Admission is
//! governed by a per-cycle throughput counter replicated across
//! second/minute/hour windows and a monotonic priority queue of waiting
//! callers.

pub mod builder;
pub mod cycle_tracker;
pub mod engine;
pub mod error;
pub mod priority_registry;
pub mod window;

pub use builder::RateLimiterBuilder;
pub use engine::{CancellationToken, RateLimiter};
pub use error::{AcquireError, ConfigError};
pub use priority_registry::LOWEST;
pub use window::TimeUnit;
