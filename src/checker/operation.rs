//! Per-operation checks (§4.4), grounded on `_CheckOperation` and its three
//! type-specific helpers `_CheckReplaceOperation`/`_CheckMoveOperation`/
//! `_CheckBsdiffOperation` in the Python checker.

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use update_format_payload::proto::update_metadata::install_operation::Type as OpType;
use update_format_payload::proto::update_metadata::InstallOperation;
use update_format_payload::Payload;

use crate::checker::extent;
use crate::config::{CheckerConfig, PayloadType};
use crate::error::PayloadError;

fn check_blocks_fit_length(path: &str, length_name: &'static str, length: u64, num_blocks: u64, block_size: u64) -> Result<(), PayloadError> {
    if length == 0 {
        return Err(PayloadError::LengthIsZero { path: path.to_string(), length_name });
    }
    let lower = num_blocks.saturating_sub(1) * block_size;
    let upper = num_blocks * block_size;
    if !(lower < length && length <= upper) {
        return Err(PayloadError::LengthDoesNotFitBlocks {
            path: path.to_string(),
            length_name: length_name.to_string(),
            length,
            num_blocks,
            block_size,
        });
    }
    Ok(())
}

/// Everything a single operation check needs about its surrounding sequence.
pub struct OperationContext<'a> {
    pub payload: &'a Payload,
    pub config: &'a CheckerConfig,
    pub block_size: u64,
    pub payload_type: PayloadType,
    pub old_usable_size: u64,
    pub new_usable_size: u64,
    pub allow_signature: bool,
}

/// Validates one operation end-to-end and returns the data-section offset
/// just past its blob (unchanged for MOVE, which carries no blob).
pub fn check_operation(
    ctx: &OperationContext<'_>,
    op: &InstallOperation,
    op_name: &str,
    is_last: bool,
    old_block_counters: &mut [u8],
    new_block_counters: &mut [u8],
    prev_data_offset: u64,
    blob_hash_counts: &mut HashMap<String, u64>,
) -> Result<u64, PayloadError> {
    let op_type = op
        .type_
        .enum_value()
        .map_err(|v| PayloadError::UnknownOperationType { path: op_name.to_string(), type_value: v })?;

    // 1. src_extents: every operation type may carry them (MOVE/BSDIFF use
    // them for real; REPLACE/REPLACE_BZ are required to have none, checked
    // below), so the pseudo-extent allowance here is unconditional.
    let total_src_blocks = extent::check_extents(
        &op.src_extents,
        ctx.old_usable_size,
        old_block_counters,
        &format!("{op_name}.src_extents"),
        ctx.block_size,
        true,
        false,
    )?;

    // 2. dst_extents: the trailing signature's fake operation addresses
    // itself via a lone pseudo dst_extent, so the signature allowance is
    // scoped to the last operation of a REPLACE whose sequence is signed.
    let allow_signature_in_extents = ctx.allow_signature && is_last && op_type == OpType::REPLACE;
    let total_dst_blocks = extent::check_extents(
        &op.dst_extents,
        ctx.new_usable_size,
        new_block_counters,
        &format!("{op_name}.dst_extents"),
        ctx.block_size,
        !ctx.config.check_dst_pseudo_extents(),
        allow_signature_in_extents,
    )?;

    // 3.
    if total_dst_blocks == 0 {
        return Err(PayloadError::DstExtentsEmpty { path: op_name.to_string() });
    }

    // 4. data_offset/data_length: jointly present or jointly absent.
    if op.data_offset.is_some() != op.data_length.is_some() {
        let (present, missing) =
            if op.data_offset.is_some() { ("data_offset", "data_length") } else { ("data_length", "data_offset") };
        return Err(PayloadError::PresentWithoutCounterpart { path: op_name.to_string(), present, missing });
    }

    // 5. length-vs-block-count bounds, when the caller bothered to state them.
    if let Some(src_length) = op.src_length {
        check_blocks_fit_length(op_name, "src_length", src_length, total_src_blocks, ctx.block_size)?;
    }
    if let Some(dst_length) = op.dst_length {
        check_blocks_fit_length(op_name, "dst_length", dst_length, total_dst_blocks, ctx.block_size)?;
    }

    // 6-8. blob bookkeeping and data-offset contiguity.
    if op.data_sha256_hash.is_some() && op.data_offset.is_none() {
        return Err(PayloadError::PresentWithoutCounterpart { path: op_name.to_string(), present: "data_sha256_hash", missing: "data_offset" });
    }
    if let Some(data_offset) = op.data_offset {
        match op.data_sha256_hash.as_ref() {
            Some(expected_hash) => {
                let data_length = op.data_length.expect("checked jointly present above");
                let mut hasher = Sha256::new();
                ctx.payload.hash_data_range(data_offset, data_length, &mut hasher)?;
                let actual_hash: [u8; 32] = hasher.finalize().into();
                if expected_hash.as_slice() != actual_hash.as_slice() {
                    return Err(PayloadError::DataSha256Mismatch {
                        path: op_name.to_string(),
                        expected: update_format_payload::format_sha256(expected_hash),
                        actual: update_format_payload::format_sha256(&actual_hash),
                    });
                }
                *blob_hash_counts.entry("hashed".to_string()).or_insert(0) += 1;
            }
            None if allow_signature_in_extents => {
                *blob_hash_counts.entry("signature".to_string()).or_insert(0) += 1;
            }
            None if ctx.config.allow_unhashed => {
                *blob_hash_counts.entry("unhashed".to_string()).or_insert(0) += 1;
            }
            None => return Err(PayloadError::UnhashedOperationNotAllowed { path: op_name.to_string() }),
        }

        if data_offset != prev_data_offset {
            return Err(PayloadError::DataOffsetNotContiguous { path: op_name.to_string(), data_offset, expected: prev_data_offset });
        }
    }

    // 9. type-specific dispatch.
    match op_type {
        OpType::REPLACE | OpType::REPLACE_BZ => {
            check_replace_operation(op, op_type, op.data_length, total_dst_blocks, ctx.block_size, op_name)?;
        }
        OpType::MOVE if ctx.payload_type == PayloadType::Full => {
            return Err(PayloadError::NonReplaceInFullPayload { path: op_name.to_string() });
        }
        OpType::BSDIFF if ctx.payload_type == PayloadType::Full => {
            return Err(PayloadError::NonReplaceInFullPayload { path: op_name.to_string() });
        }
        OpType::MOVE => {
            check_move_operation(op, total_src_blocks, total_dst_blocks, ctx.config, op_name)?;
        }
        OpType::BSDIFF => {
            let data_length = op.data_length.ok_or_else(|| PayloadError::MissingDataOffsetLength { path: op_name.to_string() })?;
            check_bsdiff_operation(data_length, total_dst_blocks, ctx.block_size, op_name)?;
        }
    }

    // 10.
    match (op.data_offset, op.data_length) {
        (Some(data_offset), Some(data_length)) => Ok(data_offset + data_length),
        _ => Ok(prev_data_offset),
    }
}

fn check_replace_operation(
    op: &InstallOperation,
    op_type: OpType,
    data_length: Option<u64>,
    total_dst_blocks: u64,
    block_size: u64,
    op_name: &str,
) -> Result<(), PayloadError> {
    if !op.src_extents.is_empty() {
        return Err(PayloadError::ReplaceContainsSrcExtents { path: op_name.to_string() });
    }
    let data_length = data_length.ok_or_else(|| PayloadError::MissingDataOffsetLength { path: op_name.to_string() })?;
    match op_type {
        OpType::REPLACE => check_blocks_fit_length(op_name, "data_length", data_length, total_dst_blocks, block_size),
        OpType::REPLACE_BZ => {
            let allotted = total_dst_blocks * block_size;
            if data_length >= allotted {
                return Err(PayloadError::DataLengthTooLarge { path: op_name.to_string(), data_length, allotted });
            }
            Ok(())
        }
        _ => unreachable!("only REPLACE/REPLACE_BZ dispatch here"),
    }
}

fn check_bsdiff_operation(data_length: u64, total_dst_blocks: u64, block_size: u64, op_name: &str) -> Result<(), PayloadError> {
    let allotted = total_dst_blocks * block_size;
    if data_length >= allotted {
        return Err(PayloadError::DataLengthTooLarge { path: op_name.to_string(), data_length, allotted });
    }
    Ok(())
}

fn check_move_operation(
    op: &InstallOperation,
    total_src_blocks: u64,
    total_dst_blocks: u64,
    config: &CheckerConfig,
    op_name: &str,
) -> Result<(), PayloadError> {
    if op.data_offset.is_some() || op.data_length.is_some() {
        return Err(PayloadError::MoveContainsData { path: op_name.to_string() });
    }

    if total_src_blocks != total_dst_blocks {
        return Err(PayloadError::MoveBlockCountMismatch { path: op_name.to_string(), total_src: total_src_blocks, total_dst: total_dst_blocks });
    }

    if config.check_move_same_src_dst_block() {
        let src_blocks = expand_blocks(&op.src_extents);
        let dst_blocks = expand_blocks(&op.dst_extents);
        for (index, (src_block, dst_block)) in src_blocks.iter().zip(dst_blocks.iter()).enumerate() {
            if src_block == dst_block {
                return Err(PayloadError::MoveSameSrcDstBlock { path: op_name.to_string(), index: index as u64, block: *src_block });
            }
        }
    }

    Ok(())
}

fn expand_blocks(extents: &[update_format_payload::proto::update_metadata::Extent]) -> Vec<u64> {
    let mut blocks = Vec::new();
    for e in extents {
        if let (Some(start), Some(num)) = (e.start_block, e.num_blocks) {
            blocks.extend(start..start + num);
        }
    }
    blocks
}

pub(crate) fn op_type_name(op_type: OpType) -> &'static str {
    match op_type {
        OpType::REPLACE => "REPLACE",
        OpType::REPLACE_BZ => "REPLACE_BZ",
        OpType::MOVE => "MOVE",
        OpType::BSDIFF => "BSDIFF",
    }
}
