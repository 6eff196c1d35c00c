//! Extent and block-counter accounting (§4.3), grounded on `_CheckExtents`
//! in the Python checker.

use update_format_payload::proto::update_metadata::Extent;
use update_format_payload::{format_extent, PSEUDO_EXTENT_MARKER};

use crate::error::PayloadError;

/// Walks one extent list, validating each extent against `usable_size` and
/// bumping `block_counters` for every block it covers. Returns the total
/// number of blocks spanned (pseudo-extents included).
///
/// `allow_pseudo` permits a `start_block == PSEUDO_EXTENT_MARKER` entry
/// (data that isn't backed by any real block range). `allow_signature`
/// additionally permits one when the extent is the sole entry in the
/// list -- this is how the payload's trailing signature blob addresses
/// itself through its fake operation's single dst_extent. Real (non-
/// pseudo) extents are range-checked against `usable_size` regardless of
/// either flag, except when `usable_size` is itself zero (no partition to
/// bound against, e.g. the old side of a full payload); a pseudo-extent's
/// `num_blocks` still flows into the returned total even though no
/// physical blocks back it.
pub fn check_extents(
    extents: &[Extent],
    usable_size: u64,
    block_counters: &mut [u8],
    name: &str,
    block_size: u64,
    allow_pseudo: bool,
    allow_signature: bool,
) -> Result<u64, PayloadError> {
    let mut total_num_blocks = 0u64;

    for (index, extent) in extents.iter().enumerate() {
        let path = format!("{name}[{index}]");
        let start_block = extent.start_block.ok_or_else(|| PayloadError::MissingField { path: path.clone(), field: "start_block" })?;
        let num_blocks = extent.num_blocks.ok_or_else(|| PayloadError::MissingField { path: path.clone(), field: "num_blocks" })?;

        if num_blocks == 0 {
            return Err(PayloadError::ExtentLengthZero { path });
        }

        let is_pseudo = start_block == PSEUDO_EXTENT_MARKER;
        if is_pseudo {
            let signature_self_extent = allow_signature && extents.len() == 1;
            if !(allow_pseudo || signature_self_extent) {
                return Err(PayloadError::UnexpectedPseudoExtent { path });
            }
            total_num_blocks += num_blocks;
            continue;
        }

        let end_block = start_block
            .checked_add(num_blocks)
            .ok_or_else(|| PayloadError::ExtentExceedsPartition { path: path.clone(), extent: format_extent(start_block, num_blocks, block_size), usable_size })?;

        // A zero usable_size means "no partition to bound against" (e.g. the
        // old side of a full payload, which has no old partition at all) --
        // not "every extent is out of range".
        let usable_blocks = usable_size.div_ceil(block_size.max(1));
        if usable_size > 0 && end_block > usable_blocks {
            return Err(PayloadError::ExtentExceedsPartition {
                path,
                extent: format_extent(start_block, num_blocks, block_size),
                usable_size,
            });
        }

        for block in start_block..end_block {
            if let Some(counter) = block_counters.get_mut(block as usize) {
                *counter = counter.saturating_add(1);
            }
        }

        total_num_blocks += num_blocks;
    }

    Ok(total_num_blocks)
}
