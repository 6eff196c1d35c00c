//! The payload "source" collaborator: wire format only, no semantic checks.
//!
//! Turns a Chrome OS-style update payload file into typed values (header,
//! protobuf manifest, a running manifest hash, and random access into the
//! data section) and provides the RSA signature-recovery primitive the
//! checker builds on. Nothing in this crate validates that the payload is
//! *correct* -- only that its bytes can be interpreted as the wire format.

mod common;
mod error;
mod payload;
pub mod verify_sig;

pub use common::{format_extent, format_sha256, PSEUDO_EXTENT_MARKER};
pub use error::Error;
pub use payload::{Payload, PayloadHeader};

pub type Result<T> = std::result::Result<T, Error>;

pub mod proto {
    include!(concat!(env!("OUT_DIR"), "/protos/mod.rs"));
}
