// Multi-tenant MRC simulator library

pub mod compare;
pub mod error;
pub mod generator;
pub mod input;
pub mod models;
pub mod registry;
pub mod report;
pub mod runner;
pub mod stats;
pub mod tenant;

pub use error::SimError;
pub use models::{FormatProfile, ReportFormat, Request, SimulationConfig};
pub use runner::{MultiTenantSimulator, SimulationRunner};
