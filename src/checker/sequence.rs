//! Per-sequence checks (§4.5), grounded on `_CheckOperations` in the Python
//! checker: runs every operation in one `install_operations`-shaped list
//! through [`operation::check_operation`], tracks block counters across the
//! whole sequence, and (for full payloads) verifies every block was
//! written exactly once.

use std::collections::HashMap;

use update_format_payload::proto::update_metadata::install_operation::Type as OpType;
use update_format_payload::proto::update_metadata::InstallOperation;
use update_format_payload::Payload;

use crate::checker::operation::{self, op_type_name, OperationContext};
use crate::config::{CheckerConfig, PayloadType};
use crate::error::PayloadError;
use crate::format_utils::bytes_to_human_readable;
use crate::histogram::Histogram;
use crate::report::Report;

/// What a sequence check reports back to the manifest-level driver.
pub struct SequenceSummary {
    pub end_data_offset: u64,
}

fn num_blocks(size: u64, block_size: u64) -> u64 {
    size.div_ceil(block_size.max(1))
}

const OP_TYPES: [OpType; 4] = [OpType::REPLACE, OpType::REPLACE_BZ, OpType::MOVE, OpType::BSDIFF];
// MOVE carries no blob, so it never contributes to a blob-size histogram.
const BLOB_OP_TYPES: [OpType; 3] = [OpType::REPLACE, OpType::REPLACE_BZ, OpType::BSDIFF];

#[allow(clippy::too_many_arguments)]
pub fn check_operations(
    operations: &[InstallOperation],
    name: &str,
    config: &CheckerConfig,
    block_size: u64,
    payload_type: PayloadType,
    old_fs_size: u64,
    new_fs_size: u64,
    new_usable_size: u64,
    prev_data_offset: u64,
    allow_signature: bool,
    payload: &Payload,
    report: &mut Report,
) -> Result<SequenceSummary, PayloadError> {
    let old_usable_size = old_fs_size;
    let mut old_block_counters = vec![0u8; num_blocks(old_usable_size, block_size) as usize];
    let mut new_block_counters = vec![0u8; num_blocks(new_usable_size, block_size) as usize];

    let ctx = OperationContext { payload, config, block_size, payload_type, old_usable_size, new_usable_size, allow_signature };

    let mut data_offset = prev_data_offset;

    let mut blob_hash_counts: HashMap<String, u64> = HashMap::new();
    blob_hash_counts.insert("hashed".to_string(), 0);
    blob_hash_counts.insert("unhashed".to_string(), 0);
    if allow_signature {
        blob_hash_counts.insert("signature".to_string(), 0);
    }

    let mut op_counts: HashMap<String, u64> = OP_TYPES.iter().map(|t| (op_type_name(*t).to_string(), 0)).collect();
    let mut op_blob_totals: HashMap<String, u64> = BLOB_OP_TYPES.iter().map(|t| (op_type_name(*t).to_string(), 0)).collect();
    let mut total_data_used = 0u64;

    for (index, op) in operations.iter().enumerate() {
        let op_name = format!("{name}[{index}]");
        let is_last = index + 1 == operations.len();

        let op_type = op
            .type_
            .enum_value()
            .map_err(|v| PayloadError::UnknownOperationType { path: op_name.clone(), type_value: v })?;
        *op_counts.entry(op_type_name(op_type).to_string()).or_insert(0) += 1;

        let before = data_offset;
        data_offset = operation::check_operation(&ctx, op, &op_name, is_last, &mut old_block_counters, &mut new_block_counters, data_offset, &mut blob_hash_counts)?;
        let curr_data_used = data_offset - before;
        if curr_data_used > 0 {
            total_data_used += curr_data_used;
            if let Some(total) = op_blob_totals.get_mut(op_type_name(op_type)) {
                *total += curr_data_used;
            }
        }
    }

    let content_blocks = num_blocks(new_fs_size, block_size) as usize;
    let write_slice_end = content_blocks.min(new_block_counters.len());

    if payload_type == PayloadType::Full {
        let fully_written = new_block_counters[..write_slice_end].iter().all(|&count| count == 1);
        if !fully_written {
            return Err(PayloadError::NotAllBlocksWrittenOnce { path: name.to_string() });
        }
    }

    report.add_field("total operations", operations.len());
    report.add_field("op_counts", Histogram::from_count_dict(&op_counts));

    let total_blobs: u64 = blob_hash_counts.values().sum();
    report.add_field("total blobs", total_blobs);
    report.add_field("blob_hash_counts", Histogram::from_count_dict(&blob_hash_counts));

    report.add_field("total blob size", bytes_to_human_readable(total_data_used));
    report.add_field("op_blob_totals", Histogram::from_count_dict(&op_blob_totals).with_value_formatter(bytes_to_human_readable));

    if old_usable_size > 0 {
        report.add_field("block read hist", Histogram::from_counter_values(&old_block_counters));
    }
    report.add_field("block write hist", Histogram::from_counter_values(&new_block_counters[..write_slice_end]));

    report.finalize();

    Ok(SequenceSummary { end_data_offset: data_offset })
}
