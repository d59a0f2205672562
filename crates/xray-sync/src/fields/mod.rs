//! Field metadata: name resolution, typed extraction and batched fetching.
//!
//! These building blocks fail fast. The issue repository is the layer that
//! turns their errors into logged, partial results.

pub mod extract;
pub mod fetcher;
pub mod resolver;

pub use extract::FieldExtractor;
pub use fetcher::{fetch_field_values, issue_keys_jql};
pub use resolver::FieldResolver;
