//! Durable progress database

pub mod init;
pub mod progress;

pub use init::*;
pub use progress::{ProgressStore, SqliteProgressStore};
