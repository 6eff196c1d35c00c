//! Small helpers shared by the payload/manifest model and its consumers.
//!
//! Grounded on the `common` module the original Python checker imports
//! (`common.PSEUDO_EXTENT_MARKER`, `common.FormatSha256`, `common.FormatExtent`);
//! that module isn't part of the retrieved source, so only the handful of
//! helpers the spec actually names are reconstructed here.

/// Sentinel `start_block` value denoting a pseudo-extent (no physical blocks).
pub const PSEUDO_EXTENT_MARKER: u64 = u64::MAX;

/// Hex-formats a hash digest for error messages and report fields.
pub fn format_sha256(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Formats an extent for error messages: `[start, start+num) * block_size`.
pub fn format_extent(start_block: u64, num_blocks: u64, block_size: u64) -> String {
    format!(
        "{start_block}:{num_blocks} ({} bytes)",
        num_blocks.saturating_mul(block_size)
    )
}
