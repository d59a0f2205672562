//! xray-sync - keeps Jira issues stable while synchronizing Cucumber feature
//! files through Xray.
//!
//! Importing a feature file into Xray rewrites the summaries and labels of
//! every referenced test and precondition. This crate wraps the import: it
//! snapshots the affected fields, imports the file, compares the issues Xray
//! touched with the issues the file references, and writes the snapshot values
//! back where needed.
//!
//! # Layers
//!
//! - [`client`]: Jira and Xray access behind async traits, with HTTP
//!   implementations
//! - [`fields`]: field name resolution and batched, typed field fetching
//! - [`repository`]: per-field caches of issue metadata; logs failures and
//!   returns what is known
//! - [`sync`]: the feature file synchronizer
//!
//! The crate also provides the `xray-sync` binary ([`cli`]).

#![forbid(unsafe_code)]

// Public modules for library usage
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod fields;
pub mod repository;
pub mod sync;

// Public CLI module (needed by binary)
pub mod app;
pub mod cli;
pub mod output;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use error::{Error, Result};
