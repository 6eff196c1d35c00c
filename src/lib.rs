//! Structural and cryptographic validation of Chrome OS-style update
//! payloads: header, protobuf manifest, per-operation block accounting,
//! and the metadata/payload signature pair.
//!
//! The wire format itself (header parsing, manifest protobuf types, the
//! RSA recovery primitive) lives in the `update-format-payload` crate this
//! one depends on; this crate is the semantic layer on top of it.

pub mod checker;
pub mod config;
pub mod error;
pub mod format_utils;
pub mod histogram;
pub mod report;

pub use checker::PayloadChecker;
pub use config::{CheckerConfig, DisabledCheck, PayloadType};
pub use error::PayloadError;
pub use report::Report;
