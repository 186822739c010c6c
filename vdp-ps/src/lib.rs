//! vdp-ps library - Progress Syncer
//!
//! Batch reconciliation of cache-resident learner progress into the durable
//! store. Run on a schedule; each run drains whatever the dirty set holds.

pub mod report;
pub mod syncer;

pub use report::SyncReport;
pub use syncer::Syncer;
