// Accuracy comparison between two tenant reports

use std::path::Path;

use ghost_cache::ParseCurveError;

use crate::error::SimError;
use crate::report::TenantReport;

/// Error between two curves captured at the same checkpoint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckpointError {
    pub timestamp: u64,
    /// Mean absolute hit-rate difference, as a fraction in `[0, 1]`
    pub mae: f64,
}

/// Result of comparing two reports checkpoint by checkpoint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comparison {
    /// Checkpoints where both reports hold a curve, in timestamp order
    pub checkpoints: Vec<CheckpointError>,
}

impl Comparison {
    /// Mean of the per-checkpoint errors, or `None` if nothing overlapped
    pub fn overall(&self) -> Option<f64> {
        if self.checkpoints.is_empty() {
            return None;
        }
        let sum: f64 = self.checkpoints.iter().map(|c| c.mae).sum();
        Some(sum / self.checkpoints.len() as f64)
    }

    /// Print one line per shared checkpoint, then the overall mean
    pub fn print(&self) {
        for checkpoint in &self.checkpoints {
            println!("{} {:.4}", checkpoint.timestamp, checkpoint.mae);
        }
        match self.overall() {
            Some(mean) => println!("mean {mean:.4}"),
            None => println!("no checkpoint with a curve in both reports"),
        }
    }
}

/// Compares two in-memory reports. `a_path` and `b_path` only label errors.
pub fn compare_reports(
    a: &TenantReport,
    a_path: &Path,
    b: &TenantReport,
    b_path: &Path,
) -> Result<Comparison, SimError> {
    let curve_error = |path: &Path| {
        let path = path.to_path_buf();
        move |(checkpoint, source): (u64, ParseCurveError)| SimError::Curve {
            path,
            checkpoint,
            source,
        }
    };
    let a_curves = a.curves().map_err(curve_error(a_path))?;
    let b_curves = b.curves().map_err(curve_error(b_path))?;

    let checkpoints = a_curves
        .iter()
        .filter_map(|(ts, curve)| {
            let other = b_curves.get(ts)?;
            if curve.is_empty() || other.is_empty() {
                return None;
            }
            Some(CheckpointError {
                timestamp: *ts,
                mae: curve.mean_absolute_error(other),
            })
        })
        .collect();
    Ok(Comparison { checkpoints })
}

/// Loads two JSON reports from disk and compares them.
pub fn compare_files(a: &Path, b: &Path) -> Result<Comparison, SimError> {
    let report_a = TenantReport::load(a)?;
    let report_b = TenantReport::load(b)?;
    compare_reports(&report_a, a, &report_b, b)
}
