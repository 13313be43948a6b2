// Statistics collection and reporting for MRC simulation runs

use std::path::Path;
use std::time::Duration;

use serde::Serialize;

use crate::error::SimError;

/// One row of the per-tenant summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TenantRow {
    pub tenant: u64,
    pub requests: u64,
    pub first_ts: u64,
    pub last_ts: u64,
    /// Checkpoints recorded, gaps included
    pub checkpoints: usize,
    /// Points on the last non-empty curve
    pub final_points: usize,
    /// Hit rate at the largest capacity of the last non-empty curve, in percent
    pub final_hit_rate: f64,
}

/// Counters describing a whole simulation run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Trace rows read, good or bad
    pub lines_read: u64,
    /// Records routed to a tenant
    pub records_applied: u64,
    /// Rows skipped because a field failed to parse
    pub field_errors: u64,
    /// Rows skipped because they were older than the newest applied record
    pub out_of_order: u64,
    pub tenants: usize,
    /// Checkpoint barriers fired during the stream
    pub barriers: u64,
    pub reports_written: u64,
    /// Tenants without a single non-empty curve
    pub tenants_skipped: u64,
    pub duration: Duration,
    /// Per-tenant rows in ascending tenant order
    pub tenant_rows: Vec<TenantRow>,
}

impl RunSummary {
    /// Rows that were read but not applied
    pub fn skipped(&self) -> u64 {
        self.field_errors + self.out_of_order
    }

    /// Print a summary report of the run
    pub fn print_summary(&self) {
        println!("\nMRC Simulation Summary");
        println!("======================");
        println!("Lines read:        {}", self.lines_read);
        println!("Records applied:   {}", self.records_applied);
        println!(
            "Records skipped:   {} (field {}, out of order {})",
            self.skipped(),
            self.field_errors,
            self.out_of_order
        );
        println!("Barriers:          {}", self.barriers);
        println!("Tenants:           {}", self.tenants);
        println!(
            "Reports written:   {} ({} empty skipped)",
            self.reports_written, self.tenants_skipped
        );
        println!("Duration:          {:.2?}", self.duration);

        if self.tenant_rows.is_empty() {
            return;
        }

        println!("\nResults by Tenant:");
        println!(
            "{:<12} {:>12} {:>14} {:>14} {:>6} {:>7} {:>9}",
            "Tenant", "Requests", "FirstTs", "LastTs", "Ckpts", "Points", "HitRate"
        );
        println!("{}", "-".repeat(80));
        for row in &self.tenant_rows {
            println!(
                "{:<12} {:>12} {:>14} {:>14} {:>6} {:>7} {:>8.2}%",
                row.tenant,
                row.requests,
                row.first_ts,
                row.last_ts,
                row.checkpoints,
                row.final_points,
                row.final_hit_rate
            );
        }
    }

    /// Export one CSV row per tenant
    pub fn export_csv(&self, path: &Path) -> Result<(), SimError> {
        let mut writer =
            csv::Writer::from_path(path).map_err(|e| SimError::io(path, e.into()))?;
        for row in &self.tenant_rows {
            writer
                .serialize(row)
                .map_err(|e| SimError::io(path, e.into()))?;
        }
        writer.flush().map_err(|e| SimError::io(path, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(tenant: u64) -> TenantRow {
        TenantRow {
            tenant,
            requests: 3,
            first_ts: 5,
            last_ts: 23,
            checkpoints: 3,
            final_points: 4,
            final_hit_rate: 50.0,
        }
    }

    #[test]
    fn test_skipped_sums_all_kinds() {
        let summary = RunSummary {
            field_errors: 2,
            out_of_order: 4,
            ..Default::default()
        };
        assert_eq!(summary.skipped(), 6);
    }

    #[test]
    fn test_export_csv() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("summary.csv");
        let summary = RunSummary {
            tenant_rows: vec![row(1), row(8)],
            ..Default::default()
        };
        summary.export_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("tenant,requests,first_ts,last_ts,checkpoints,final_points,final_hit_rate")
        );
        assert_eq!(lines.next(), Some("1,3,5,23,3,4,50.0"));
        assert_eq!(lines.next(), Some("8,3,5,23,3,4,50.0"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_export_csv_into_missing_dir_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("missing").join("summary.csv");
        let summary = RunSummary::default();
        assert!(matches!(
            summary.export_csv(&path),
            Err(SimError::Io { .. })
        ));
    }
}
