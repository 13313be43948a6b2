//! Multi-tenant simulation driver
//!
//! The driver replays a trace once, in order, routing each record to the
//! cache of its tenant. Checkpoints are taken on a single trace-time clock
//! shared by every tenant:
//!
//! ```text
//!  origin        origin+i      origin+2i     origin+3i
//!    |-------------|-------------|-------------|----->  trace time
//!        5              12         23
//!        A              A          A
//!                 ^ barrier @i   ^ barrier @2i       finalize @23
//! ```
//!
//! A barrier fires when a record's timestamp passes the previous barrier by
//! more than one interval. It checkpoints every tenant registered so far at
//! the newest interval boundary not after that record, then the record is
//! applied. A tenant first seen on a barrier-triggering record therefore
//! misses that barrier.
//!
//! [`MultiTenantSimulator`] holds the pure routing logic and works with any
//! [`MrcEngine`]. [`SimulationRunner`] adds the trace file, report directory
//! and logging around it, using [`GhostCache`] as the engine.

use std::num::NonZeroU64;
use std::time::Instant;

use ghost_cache::{GhostCache, MrcEngine};
use tracing::{debug, info, warn};

use crate::error::SimError;
use crate::input::{TraceError, TraceReader};
use crate::models::{Request, SimulationConfig};
use crate::registry::TenantRegistry;
use crate::report::ReportWriter;
use crate::stats::{RunSummary, TenantRow};
use crate::tenant::{TenantCache, TenantError};

/// Trace-time clock deciding when checkpoint barriers fire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointClock {
    interval: u64,
    origin: u64,
    last: u64,
}

impl CheckpointClock {
    pub fn new(interval: NonZeroU64, origin: u64) -> Self {
        Self {
            interval: interval.get(),
            origin,
            last: origin,
        }
    }

    /// Moves the clock to `ts` and returns the barrier to fire, if any.
    ///
    /// The barrier is the newest multiple of the interval, measured from the
    /// origin, that does not exceed `ts`.
    pub fn advance(&mut self, ts: u64) -> Option<u64> {
        if ts <= self.last.saturating_add(self.interval) {
            return None;
        }
        let elapsed = ts - self.origin;
        self.last = self.origin + elapsed / self.interval * self.interval;
        Some(self.last)
    }

    /// The most recent barrier, or the origin before the first one
    pub fn last(&self) -> u64 {
        self.last
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }
}

/// What happened to a record handed to the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The record reached its tenant's cache.
    Accessed,
    /// The record was older than the newest applied record and was dropped.
    OutOfOrder { newest: u64 },
}

/// Routes records to per-tenant engines and fires checkpoint barriers
pub struct MultiTenantSimulator<E: MrcEngine> {
    engine_config: E::Config,
    registry: TenantRegistry<E>,
    clock: CheckpointClock,
    newest_ts: Option<u64>,
    records_applied: u64,
    out_of_order: u64,
    barriers: u64,
}

impl<E: MrcEngine> MultiTenantSimulator<E> {
    pub fn new(engine_config: E::Config, interval: NonZeroU64, origin: u64) -> Self {
        Self {
            engine_config,
            registry: TenantRegistry::new(),
            clock: CheckpointClock::new(interval, origin),
            newest_ts: None,
            records_applied: 0,
            out_of_order: 0,
            barriers: 0,
        }
    }

    /// Applies one record: fires a barrier if one is due, then routes the
    /// record to its tenant, creating the tenant if needed.
    pub fn apply(&mut self, request: &Request) -> Result<Applied, SimError> {
        if let Some(newest) = self.newest_ts {
            if request.timestamp < newest {
                self.out_of_order += 1;
                return Ok(Applied::OutOfOrder { newest });
            }
        }
        self.newest_ts = Some(request.timestamp);

        if let Some(barrier) = self.clock.advance(request.timestamp) {
            self.checkpoint_all(barrier)?;
        }

        let config = &self.engine_config;
        self.registry
            .get_or_insert_with(request.tenant, || TenantCache::new(config))
            .access(request)
            .map_err(|source| SimError::Tenant {
                tenant: request.tenant,
                source,
            })?;
        self.records_applied += 1;
        Ok(Applied::Accessed)
    }

    fn checkpoint_all(&mut self, barrier: u64) -> Result<(), SimError> {
        debug!(barrier, tenants = self.registry.len(), "checkpoint barrier");
        for (&tenant, cache) in self.registry.iter_mut() {
            cache
                .checkpoint(barrier)
                .map_err(|source| SimError::Tenant { tenant, source })?;
        }
        self.barriers += 1;
        Ok(())
    }

    /// Ends the stream: finalizes every tenant at the newest timestamp seen
    /// and hands the registry over for reporting.
    pub fn finish(mut self) -> Result<TenantRegistry<E>, SimError> {
        if let Some(end_ts) = self.newest_ts {
            for (&tenant, cache) in self.registry.iter_mut() {
                cache
                    .finalize(end_ts)
                    .map_err(|source| SimError::Tenant { tenant, source })?;
            }
        }
        Ok(self.registry)
    }

    pub fn registry(&self) -> &TenantRegistry<E> {
        &self.registry
    }

    pub fn clock(&self) -> &CheckpointClock {
        &self.clock
    }

    pub fn records_applied(&self) -> u64 {
        self.records_applied
    }

    pub fn out_of_order(&self) -> u64 {
        self.out_of_order
    }

    pub fn barriers(&self) -> u64 {
        self.barriers
    }
}

/// Runs a full simulation from a trace file to a report directory
pub struct SimulationRunner {
    config: SimulationConfig,
}

impl SimulationRunner {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Replays the trace and writes one report per tenant with history.
    ///
    /// The output directory is prepared and the trace opened before any
    /// record is processed; failure of either ends the run with nothing
    /// written.
    pub fn run(&self) -> Result<RunSummary, SimError> {
        let start = Instant::now();
        let config = &self.config;

        let mut writer = ReportWriter::prepare(&config.output_dir, config.format)?;
        let mut reader = TraceReader::open(&config.trace, config.profile)?;
        info!(
            trace = %config.trace.display(),
            profile = %config.profile,
            interval = config.interval.get(),
            origin = config.origin,
            engine = ?config.engine,
            "starting simulation"
        );

        let mut simulator =
            MultiTenantSimulator::<GhostCache>::new(config.engine, config.interval, config.origin);
        let mut summary = RunSummary::default();

        for item in reader.by_ref() {
            match item {
                Ok(request) => {
                    if let Applied::OutOfOrder { newest } = simulator.apply(&request)? {
                        warn!(
                            timestamp = request.timestamp,
                            newest,
                            tenant = request.tenant,
                            "skipping out-of-order record"
                        );
                    }
                }
                Err(err @ TraceError::Field { .. }) => {
                    warn!(line = err.line(), error = %err, "skipping record");
                    summary.field_errors += 1;
                }
                Err(TraceError::Io(source)) => return Err(SimError::io(&config.trace, source)),
            }
        }

        summary.lines_read = reader.rows_read();
        summary.records_applied = simulator.records_applied();
        summary.out_of_order = simulator.out_of_order();
        summary.barriers = simulator.barriers();

        let registry = simulator.finish()?;
        summary.tenants = registry.len();

        for (&tenant, cache) in &registry {
            let report = cache
                .dump()
                .map_err(|source| SimError::Tenant { tenant, source })?;
            summary.tenant_rows.push(tenant_row(tenant, cache)?);

            if report.is_empty() {
                debug!(tenant, "no non-empty curve; skipping report");
                summary.tenants_skipped += 1;
                continue;
            }
            let path = writer.write(tenant, &report)?;
            debug!(tenant, path = %path.display(), "wrote report");
        }
        summary.reports_written = writer.written();

        if let Some(path) = &config.summary_csv {
            summary.export_csv(path)?;
            info!(path = %path.display(), "exported tenant summary");
        }

        summary.duration = start.elapsed();
        info!(
            records = summary.records_applied,
            skipped = summary.skipped(),
            tenants = summary.tenants,
            reports = summary.reports_written,
            "simulation finished in {:.2?}",
            summary.duration
        );
        Ok(summary)
    }
}

fn tenant_row<E: MrcEngine>(tenant: u64, cache: &TenantCache<E>) -> Result<TenantRow, SimError> {
    let (Some(first_ts), Some(last_ts)) = (cache.first_seen_ts(), cache.last_seen_ts()) else {
        return Err(SimError::Tenant {
            tenant,
            source: TenantError::NeverAccessed,
        });
    };
    // Idle tenants end on gaps; report the last curve that has points
    let final_curve = cache
        .checkpoints()
        .values()
        .rev()
        .find(|curve| !curve.is_empty());
    Ok(TenantRow {
        tenant,
        requests: cache.requests_processed(),
        first_ts,
        last_ts,
        checkpoints: cache.checkpoints().len(),
        final_points: final_curve.map_or(0, |curve| curve.len()),
        final_hit_rate: final_curve
            .and_then(|curve| curve.last())
            .map_or(0.0, |point| point.stat.hit_rate() * 100.0),
    })
}
