//! Per-tenant report encoding and the output directory writer
//!
//! A report holds a tenant's first and last trace timestamps and the curve
//! captured at every checkpoint, each curve stored as its text lines. Keys of
//! the checkpoint map are numeric timestamps, so the history serializes in
//! trace order.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use ghost_cache::{MissRateCurve, ParseCurveError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SimError;
use crate::models::ReportFormat;

/// What gets written for one tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantReport {
    pub first_ts: u64,
    pub last_ts: u64,
    /// Checkpoint timestamp to curve lines; an empty list is an idle period
    pub checkpoints: BTreeMap<u64, Vec<String>>,
}

impl TenantReport {
    pub fn from_history(
        first_ts: u64,
        last_ts: u64,
        history: &BTreeMap<u64, MissRateCurve>,
    ) -> Self {
        Self {
            first_ts,
            last_ts,
            checkpoints: history
                .iter()
                .map(|(&ts, curve)| (ts, curve.lines()))
                .collect(),
        }
    }

    /// True if no checkpoint holds a curve
    pub fn is_empty(&self) -> bool {
        self.checkpoints.values().all(Vec::is_empty)
    }

    /// Parses every checkpoint's lines back into curves.
    pub fn curves(&self) -> Result<BTreeMap<u64, MissRateCurve>, (u64, ParseCurveError)> {
        self.checkpoints
            .iter()
            .map(|(&ts, lines)| {
                MissRateCurve::parse_lines(lines)
                    .map(|curve| (ts, curve))
                    .map_err(|e| (ts, e))
            })
            .collect()
    }

    /// Encodes the report onto `writer`.
    pub fn write<W: Write>(&self, format: ReportFormat, mut writer: W) -> io::Result<()> {
        match format {
            ReportFormat::Json => {
                serde_json::to_writer(&mut writer, self)?;
                writeln!(writer)?;
            }
            ReportFormat::Text => {
                writeln!(writer, "first_ts {}", self.first_ts)?;
                writeln!(writer, "last_ts {}", self.last_ts)?;
                for (ts, lines) in &self.checkpoints {
                    writeln!(writer, "# {ts}")?;
                    for line in lines {
                        writeln!(writer, "{line}")?;
                    }
                }
            }
        }
        writer.flush()
    }

    /// Decodes a JSON report.
    pub fn read_json<R: Read>(reader: R) -> Result<Self, serde_json::Error> {
        serde_json::from_reader(reader)
    }

    /// Loads a JSON report from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SimError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| SimError::io(path, e))?;
        Self::read_json(io::BufReader::new(file)).map_err(|source| SimError::ReportFormat {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Writes one report file per tenant into a directory
#[derive(Debug)]
pub struct ReportWriter {
    dir: PathBuf,
    format: ReportFormat,
    written: u64,
}

impl ReportWriter {
    /// Makes sure `dir` exists and is a directory.
    ///
    /// Called before the trace is read, so a bad output path ends the run
    /// before any work is done.
    pub fn prepare<P: Into<PathBuf>>(dir: P, format: ReportFormat) -> Result<Self, SimError> {
        let dir = dir.into();
        match fs::metadata(&dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(SimError::NotADirectory { path: dir }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                fs::create_dir_all(&dir).map_err(|e| SimError::io(&dir, e))?;
                debug!(dir = %dir.display(), "created output directory");
            }
            Err(e) => return Err(SimError::io(&dir, e)),
        }
        Ok(Self {
            dir,
            format,
            written: 0,
        })
    }

    /// Path the report of `tenant` is written to
    pub fn path_for(&self, tenant: u64) -> PathBuf {
        self.dir.join(tenant.to_string())
    }

    /// Writes (or overwrites) the report of `tenant`.
    pub fn write(&mut self, tenant: u64, report: &TenantReport) -> Result<PathBuf, SimError> {
        let path = self.path_for(tenant);
        let file = File::create(&path).map_err(|e| SimError::io(&path, e))?;
        report
            .write(self.format, BufWriter::new(file))
            .map_err(|e| SimError::io(&path, e))?;
        self.written += 1;
        Ok(path)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn format(&self) -> ReportFormat {
        self.format
    }

    /// Reports written so far
    pub fn written(&self) -> u64 {
        self.written
    }
}
