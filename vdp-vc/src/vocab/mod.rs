//! Vocabulary ingestion: repair, normalization and the book catalog

pub mod catalog;
pub mod model;
pub mod normalize;
pub mod repair;

pub use catalog::{Catalog, CatalogSnapshot};
pub use model::{VocabularyBook, VocabularyEntry};
pub use normalize::{normalize, Shape};
pub use repair::{repair, RepairError, Repaired};
