//! Per-tenant cache state
//!
//! A [`TenantCache`] wraps one engine together with the bookkeeping needed to
//! turn it into a report: how many requests it has seen, when it first and
//! last saw one, and the curve captured at every checkpoint.
//!
//! ```text
//!            access / checkpoint
//!             ┌──────────┐
//!             ▼          │
//!        ┌─────────┐     │     finalize(end_ts)    ┌───────────┐
//!  new ─▶│ Active  │─────┴────────────────────────▶│ Finalized │──▶ dump()
//!        └─────────┘                               └───────────┘
//! ```
//!
//! Operations attempted in the wrong state fail with
//! [`TenantError::StateContract`] rather than being ignored.
//!
//! # Gaps
//!
//! A checkpoint stores the engine's curve only if the tenant received at
//! least one access since its previous checkpoint. Otherwise it stores an
//! empty curve, so idle periods are visible in the history instead of
//! repeating the last curve.

use std::collections::BTreeMap;
use std::fmt;

use ghost_cache::{MissRateCurve, MrcEngine};
use thiserror::Error;

use crate::models::Request;
use crate::report::TenantReport;

/// Lifecycle state of a tenant cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantState {
    /// Accepting accesses and checkpoints
    Active,
    /// Read-only; ready to be reported
    Finalized,
}

impl fmt::Display for TenantState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TenantState::Active => write!(f, "active"),
            TenantState::Finalized => write!(f, "finalized"),
        }
    }
}

/// Contract violations raised by [`TenantCache`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TenantError {
    /// The tenant was finalized without a single access.
    #[error("finalized without ever being accessed")]
    NeverAccessed,

    /// The operation is not allowed in the current state.
    #[error("{operation} is not allowed on a {state} tenant")]
    StateContract {
        operation: &'static str,
        state: TenantState,
    },

    /// A checkpoint did not come strictly after the previous one.
    #[error("checkpoint at {requested} does not follow the checkpoint at {previous}")]
    CheckpointOrder { previous: u64, requested: u64 },
}

/// One tenant's simulated cache and its checkpoint history
pub struct TenantCache<E> {
    engine: E,
    requests_processed: u64,
    first_seen_ts: Option<u64>,
    last_seen_ts: Option<u64>,
    checkpoints: BTreeMap<u64, MissRateCurve>,
    accesses_since_checkpoint: u64,
    state: TenantState,
}

impl<E: MrcEngine> TenantCache<E> {
    /// Creates an active tenant with a fresh engine
    pub fn new(config: &E::Config) -> Self {
        Self {
            engine: E::new(config),
            requests_processed: 0,
            first_seen_ts: None,
            last_seen_ts: None,
            checkpoints: BTreeMap::new(),
            accesses_since_checkpoint: 0,
            state: TenantState::Active,
        }
    }

    fn require_active(&self, operation: &'static str) -> Result<(), TenantError> {
        match self.state {
            TenantState::Active => Ok(()),
            state => Err(TenantError::StateContract { operation, state }),
        }
    }

    /// Feeds one request to the engine, charging key plus value size.
    pub fn access(&mut self, request: &Request) -> Result<(), TenantError> {
        self.require_active("access")?;

        self.engine.access(&request.key, request.cost());
        self.first_seen_ts.get_or_insert(request.timestamp);
        self.last_seen_ts = Some(
            self.last_seen_ts
                .map_or(request.timestamp, |last| last.max(request.timestamp)),
        );
        self.requests_processed += 1;
        self.accesses_since_checkpoint += 1;
        Ok(())
    }

    /// The curve to store now: the engine's, or empty if nothing happened
    /// since the previous capture.
    fn capture(&mut self) -> MissRateCurve {
        let curve = if self.accesses_since_checkpoint > 0 {
            self.engine.snapshot()
        } else {
            MissRateCurve::new()
        };
        self.accesses_since_checkpoint = 0;
        curve
    }

    /// Records the tenant's curve at trace time `ts`.
    ///
    /// `ts` must be strictly greater than every earlier checkpoint.
    pub fn checkpoint(&mut self, ts: u64) -> Result<(), TenantError> {
        self.require_active("checkpoint")?;
        if let Some(&previous) = self.checkpoints.keys().next_back() {
            if ts <= previous {
                return Err(TenantError::CheckpointOrder {
                    previous,
                    requested: ts,
                });
            }
        }

        let curve = self.capture();
        self.checkpoints.insert(ts, curve);
        Ok(())
    }

    /// Takes the final capture at `end_ts` and makes the tenant read-only.
    ///
    /// If a checkpoint already exists at `end_ts` it is replaced only when
    /// accesses arrived after it was taken.
    pub fn finalize(&mut self, end_ts: u64) -> Result<(), TenantError> {
        self.require_active("finalize")?;
        if self.requests_processed == 0 {
            return Err(TenantError::NeverAccessed);
        }

        match self.checkpoints.keys().next_back().copied() {
            Some(previous) if previous > end_ts => {
                return Err(TenantError::CheckpointOrder {
                    previous,
                    requested: end_ts,
                });
            }
            Some(previous) if previous == end_ts => {
                if self.accesses_since_checkpoint > 0 {
                    let curve = self.capture();
                    self.checkpoints.insert(end_ts, curve);
                }
            }
            _ => {
                let curve = self.capture();
                self.checkpoints.insert(end_ts, curve);
            }
        }

        self.state = TenantState::Finalized;
        Ok(())
    }

    /// Produces the tenant's report. Only allowed once finalized; may be
    /// called any number of times.
    pub fn dump(&self) -> Result<TenantReport, TenantError> {
        match self.state {
            TenantState::Finalized => {}
            state => {
                return Err(TenantError::StateContract {
                    operation: "dump",
                    state,
                })
            }
        }
        // finalize() refuses tenants that were never accessed
        let (Some(first_ts), Some(last_ts)) = (self.first_seen_ts, self.last_seen_ts) else {
            return Err(TenantError::NeverAccessed);
        };
        Ok(TenantReport::from_history(
            first_ts,
            last_ts,
            &self.checkpoints,
        ))
    }

    pub fn requests_processed(&self) -> u64 {
        self.requests_processed
    }

    pub fn first_seen_ts(&self) -> Option<u64> {
        self.first_seen_ts
    }

    pub fn last_seen_ts(&self) -> Option<u64> {
        self.last_seen_ts
    }

    /// Checkpoint history, oldest first
    pub fn checkpoints(&self) -> &BTreeMap<u64, MissRateCurve> {
        &self.checkpoints
    }

    pub fn state(&self) -> TenantState {
        self.state
    }

    pub fn is_finalized(&self) -> bool {
        self.state == TenantState::Finalized
    }

    /// True if at least one checkpoint holds a non-empty curve
    pub fn has_history(&self) -> bool {
        self.checkpoints.values().any(|curve| !curve.is_empty())
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

impl<E> fmt::Debug for TenantCache<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantCache")
            .field("state", &self.state)
            .field("requests_processed", &self.requests_processed)
            .field("first_seen_ts", &self.first_seen_ts)
            .field("last_seen_ts", &self.last_seen_ts)
            .field("checkpoints", &self.checkpoints.len())
            .finish()
    }
}
