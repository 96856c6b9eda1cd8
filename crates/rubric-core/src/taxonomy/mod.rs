//! Taxonomy tree: loader seam and the in-memory store.

pub mod loader;
pub mod store;

pub use loader::{load_taxonomy, JsonFileSource, TaxonomySource};
pub use store::Taxonomy;
