//! # VDP Common Library
//!
//! Shared code for the vocabulary data platform binaries including:
//! - Error and result types
//! - Configuration loading and root folder resolution
//! - Progress model (mastery status, cache field keys)
//! - Low-latency cache store (in-memory and SQLite backends)
//! - Durable progress store
//! - Progress writer and the cache-over-durable read merge

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod progress;
pub mod time;

pub use error::{Error, Result};
pub use progress::{ProgressField, ProgressRecord, Status};
