//! Validation and extraction service for digital-diploma fiscalization
//! files.
//!
//! A fiscalization batch is a set of XML files, each filed either by the
//! issuing institution (emissora) or the registering institution
//! (registradora). Every file is validated against the fiscalization
//! XSD, classified by its marker element, and projected into a flat
//! record model; emissora filings additionally reference per-diploma
//! documents by URL, which are fetched, validated against the diploma
//! XSD, and extracted. Results come back in input order with per-file
//! failure isolation, and can be re-projected into a CSV table.
//!
//! Schema validation is delegated to libxml2 through a thin FFI layer;
//! schemas are compiled once at startup and shared read-only.

pub mod api;
pub mod batch;
pub mod classify;
pub mod cli;
pub mod document;
pub mod error;
pub mod export;
pub mod extract;
pub mod fields;
pub mod http_client;
pub mod libxml2;
pub mod model;
pub mod registry;
pub mod resolver;
pub mod validator;

pub use batch::{BatchConfig, BatchItem, BatchProcessor};
pub use classify::{Role, classify};
pub use error::{FetchError, ProcessError, StartupError};
pub use model::{BatchResult, DiplomaRecord, FileResult, RecordStatus};
pub use registry::SchemaRegistry;
