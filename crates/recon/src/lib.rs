//! `croptaxa-recon`: crop and land-cover taxonomy reconciliation engine.
//!
//! Maps source-specific class codes onto one canonical four-level hierarchy,
//! resolves lifecycle duration by ordered fallback, and builds the
//! cross-reference and per-source summaries. Pure engine crate: the only IO
//! is reading a catalogue directory on request.

pub mod catalogue;
pub mod config;
pub mod engine;
pub mod error;
pub mod hierarchy;
pub mod indexer;
pub mod model;
pub mod registry;
pub mod report;
pub mod resolver;

pub use catalogue::Catalogue;
pub use config::ReportSettings;
pub use engine::{run, ReconciledModel};
pub use error::TaxonomyError;
pub use hierarchy::HierarchyStore;
pub use indexer::ReconciliationIndex;
pub use model::{Duration, HierarchyNode, Level, SourceClassEntry};
pub use registry::{SourceDataset, SourceRegistry};
pub use resolver::{DurationResolver, Resolution, ResolutionRule};
