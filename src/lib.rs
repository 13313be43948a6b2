#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! # Code Reference
//!
//! ## How a Ghost Cache Sees a Workload
//!
//! ```text
//!   access(k)                     recency stack (max entries, step-wide buckets)
//!   ─────────▶ hash(k) ──sampled?──▶ ┌────┬────┬────┬────┐
//!                 │                  │ b0 │ b1 │ b2 │ b3 │──▶ forgotten
//!                 │ no               └────┴────┴────┴────┘
//!                 ▼                    │    │    │    │
//!              ignored               hits[0..n] + bytes[0..n]
//!                                            │
//!                              snapshot() ──▶ MissRateCurve
//! ```
//!
//! A single pass over the requests yields the hit rate an LRU cache would
//! have had at every capacity `min, min + step, …, max`.
//!
//! ## Quick Reference
//!
//! | Type | Role |
//! |------|------|
//! | [`GhostCache`] | Sampled, bucketed ghost LRU |
//! | [`MrcEngine`] | Trait a per-tenant driver talks to |
//! | [`MissRateCurve`] | Points of `(capacity, bytes, hit/miss)` |
//! | [`CapacitySweep`] | Validated `step`/`min`/`max` triple |
//!
//! ## Performance Characteristics
//!
//! | Operation | Cost |
//! |-----------|------|
//! | access | O(max / step) |
//! | snapshot | O(max / step) |
//! | memory | O(max / 2^sample_shift) |
//!
//! ## Modules
//!
//! - [`ghost`]: The ghost LRU cache
//! - [`engine`]: The engine trait
//! - [`curve`]: Miss-rate curve types
//! - [`config`]: Sweep and sampling configuration
//! - [`metrics`]: Hit statistics and simulation counters

#![no_std]

extern crate alloc;

/// Doubly linked list backing each bucket of the recency stack.
///
/// **Note**: This module is internal infrastructure. It exposes raw pointer
/// operations whose invariants are upheld by [`ghost`].
pub(crate) mod list;

/// Capacity sweep and sampling configuration.
pub mod config;

/// Hit statistics and simulation counters.
pub mod metrics;

/// Miss-rate curves and their text form.
pub mod curve;

/// The engine contract.
pub mod engine;

/// Ghost LRU cache implementation.
///
/// Simulates an LRU recency stack without storing values, reporting the hit
/// rate for a whole sweep of capacities at once.
pub mod ghost;

pub use config::{CapacitySweep, ConfigError, GhostCacheConfig};
pub use curve::{CurvePoint, MissRateCurve, ParseCurveError};
pub use engine::MrcEngine;
pub use ghost::GhostCache;
pub use metrics::{CacheMetrics, CacheStat, GhostCacheMetrics};
