//! The contract between a per-tenant driver and whatever computes its curves.

use crate::curve::MissRateCurve;

/// A cache simulation that turns a stream of accesses into miss-rate curves.
///
/// Every tenant gets its own engine, built from a configuration shared by the
/// whole run. Engines are driven from a single thread and only need to be
/// `Send` if the caller moves them between threads.
pub trait MrcEngine {
    /// Parameters fixed for the lifetime of an engine.
    type Config: Clone;

    /// Creates an engine that has seen no accesses.
    fn new(config: &Self::Config) -> Self
    where
        Self: Sized;

    /// Records one access of `cost` bytes to `key`.
    fn access(&mut self, key: &[u8], cost: u64);

    /// The curve over every access recorded so far. Does not reset the
    /// engine; an engine that has simulated nothing returns an empty curve.
    fn snapshot(&self) -> MissRateCurve;
}
