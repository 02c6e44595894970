//! Core business logic and abstractions

pub mod cache;
pub mod config;
pub mod currency;
pub mod debounce;
pub mod error;
pub mod export;
pub mod gateway;
pub mod inventory;
pub mod log;
pub mod records;
pub mod report;
pub mod session;
pub mod tables;

// Re-export main types for cleaner imports
pub use error::{ExportError, ReportError};
pub use gateway::DataGateway;
pub use report::DateRange;
pub use session::{Dashboard, ReportSession};
