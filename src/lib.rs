//! Client-side core of the triage console: patient selection, schema-driven
//! assessment intake, risk banding, and the polled queue/resource dashboard.
//!
//! Risk scoring itself happens in the collaborator behind [`client::Collaborator`].

pub mod client;
pub mod config;
pub mod directory;
pub mod error;
pub mod intake;
pub mod models;
pub mod polling;
pub mod queue;
pub mod report;
pub mod resources;
pub mod risk;
pub mod schema;

pub use error::{TriageError, TriageResult};
