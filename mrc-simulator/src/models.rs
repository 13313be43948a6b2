// Data models for multi-tenant MRC simulation

use clap::ValueEnum;
use ghost_cache::GhostCacheConfig;
use std::fmt;
use std::num::NonZeroU64;
use std::path::PathBuf;

/// A single request read from a trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Trace time of the request, non-decreasing over a well-formed trace
    pub timestamp: u64,
    /// Cache key, kept as raw bytes
    pub key: Vec<u8>,
    /// Size of the key in bytes
    pub key_size: u64,
    /// Size of the value in bytes
    pub value_size: u64,
    /// Tenant (client) the request belongs to
    pub tenant: u64,
    /// Operation name as it appears in the trace; not interpreted
    pub operation: String,
}

impl Request {
    /// Create a new request
    pub fn new(
        timestamp: u64,
        key: impl Into<Vec<u8>>,
        key_size: u64,
        value_size: u64,
        tenant: u64,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            key: key.into(),
            key_size,
            value_size,
            tenant,
            operation: operation.into(),
        }
    }

    /// Bytes this request charges to a cache: key plus value
    pub fn cost(&self) -> u64 {
        self.key_size.saturating_add(self.value_size)
    }
}

/// Column positions of one trace layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub timestamp: usize,
    pub key: usize,
    pub key_size: usize,
    pub value_size: usize,
    pub tenant: usize,
    pub operation: usize,
    /// Whether the first row is a header and must be skipped
    pub has_headers: bool,
}

/// Trace formats the simulator can read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum FormatProfile {
    /// Twitter cache traces: `ts,key,key_size,value_size,client,op,ttl`, no header
    #[value(alias = "tw")]
    Twitter,
    /// Meta (Facebook) KV cache traces, with a header row
    #[value(alias = "fb")]
    Facebook,
}

impl FormatProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatProfile::Twitter => "twitter",
            FormatProfile::Facebook => "facebook",
        }
    }

    /// Where each field lives in a row of this format
    pub fn layout(&self) -> FieldLayout {
        match self {
            FormatProfile::Twitter => FieldLayout {
                timestamp: 0,
                key: 1,
                key_size: 2,
                value_size: 3,
                tenant: 4,
                operation: 5,
                has_headers: false,
            },
            FormatProfile::Facebook => FieldLayout {
                timestamp: 0,
                key: 1,
                key_size: 2,
                value_size: 5,
                tenant: 8,
                operation: 3,
                has_headers: true,
            },
        }
    }
}

impl fmt::Display for FormatProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// On-disk encoding of per-tenant reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ValueEnum)]
pub enum ReportFormat {
    /// One compact JSON object per tenant
    #[default]
    Json,
    /// `# <ts>` headed blocks of curve lines
    Text,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Text => "text",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration for a simulation run, fixed at startup
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Trace file to replay
    pub trace: PathBuf,
    /// Layout of the trace
    pub profile: FormatProfile,
    /// Directory receiving one report per tenant
    pub output_dir: PathBuf,
    /// Trace-time distance between checkpoint barriers
    pub interval: NonZeroU64,
    /// Trace time the first barrier interval is measured from
    pub origin: u64,
    /// Sweep and sampling shared by every tenant's ghost cache
    pub engine: GhostCacheConfig,
    /// Report encoding
    pub format: ReportFormat,
    /// Optional per-tenant summary export
    pub summary_csv: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_is_key_plus_value() {
        let request = Request::new(1, "k", 3, 40, 7, "get");
        assert_eq!(request.cost(), 43);

        let huge = Request::new(1, "k", u64::MAX, 1, 7, "get");
        assert_eq!(huge.cost(), u64::MAX);
    }

    #[test]
    fn test_profile_aliases() {
        assert_eq!(
            FormatProfile::from_str("tw", false),
            Ok(FormatProfile::Twitter)
        );
        assert_eq!(
            FormatProfile::from_str("fb", false),
            Ok(FormatProfile::Facebook)
        );
        assert_eq!(
            FormatProfile::from_str("twitter", false),
            Ok(FormatProfile::Twitter)
        );
        assert!(FormatProfile::from_str("memcached", false).is_err());
    }

    #[test]
    fn test_layouts() {
        let tw = FormatProfile::Twitter.layout();
        assert!(!tw.has_headers);
        assert_eq!((tw.value_size, tw.tenant, tw.operation), (3, 4, 5));

        let fb = FormatProfile::Facebook.layout();
        assert!(fb.has_headers);
        assert_eq!((fb.value_size, fb.tenant, fb.operation), (5, 8, 3));
    }
}
