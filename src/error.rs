//! `PayloadError`: the single failure type the checker ever returns.
//!
//! Grounded on `update-format-crau::delta_update::Error` / `ue-rs::Error`'s
//! own hand-rolled `enum` + `Display` (+ `From`) pattern -- neither teacher
//! error module reaches for `thiserror` for its own domain errors, so this
//! one doesn't either. Each variant carries the dotted object path the
//! Python checker builds via string interpolation (e.g.
//! `install_operations[3].dst_extents[1]`), so error text stays debuggable
//! without re-deriving context at the call site.

use update_format_payload::verify_sig;

#[derive(Debug)]
pub enum PayloadError {
    // --- structural ---
    MissingField { path: String, field: &'static str },
    MissingSubMessage { path: String, field: &'static str },
    PresentWithoutCounterpart { path: String, present: &'static str, missing: &'static str },
    InvalidAssertType,
    UnknownOperationType { path: String, type_value: i32 },
    UnknownPayloadVersion(u64),
    UnknownSignatureVersion(u32),

    // --- numeric ---
    BlockSizeNotPowerOfTwo(u64),
    BlockSizeMismatch { actual: u64, expected: u64 },
    ExtentLengthZero { path: String },
    ExtentExceedsPartition { path: String, extent: String, usable_size: u64 },
    UnexpectedPseudoExtent { path: String },
    DstExtentsEmpty { path: String },
    LengthIsZero { path: String, length_name: &'static str },
    LengthDoesNotFitBlocks { path: String, length_name: String, length: u64, num_blocks: u64, block_size: u64 },
    OldContentExceedsPartition { path: String, size: u64, partition_size: u64 },
    NewContentExceedsPartition { path: String, size: u64, partition_size: u64 },
    NoOperations,

    // --- type-specific ---
    PayloadTypeMismatch { detected: &'static str, asserted: &'static str },
    ReplaceContainsSrcExtents { path: String },
    MissingDataOffsetLength { path: String },
    DataLengthTooLarge { path: String, data_length: u64, allotted: u64 },
    MoveContainsData { path: String },
    MoveBlockCountMismatch { path: String, total_src: u64, total_dst: u64 },
    MoveRanOutOfExtents { path: String, side: &'static str, done: u64, total: u64 },
    MoveExcessBlocks { path: String, side: &'static str },
    MoveSameSrcDstBlock { path: String, index: u64, block: u64 },
    NonReplaceInFullPayload { path: String },

    // --- data-section ---
    DataOffsetNotContiguous { path: String, data_offset: u64, expected: u64 },
    DataSha256Mismatch { path: String, expected: String, actual: String },
    UnhashedOperationNotAllowed { path: String },
    NotAllBlocksWrittenOnce { path: String },
    UsedPayloadSizeMismatch { used: u64, actual: u64 },

    // --- signature ---
    MissingPublicKey { reason: &'static str },
    SignatureBlockEmpty,
    SignatureOperationMismatch { sigs_offset: u64, sigs_size: u64, op_data_offset: u64, op_data_length: u64 },
    SignatureVerificationFailed { label: String, source: verify_sig::Error },
    ReadMetadataSignature(std::io::Error),

    // --- collaborators ---
    Format(update_format_payload::Error),
}

impl std::error::Error for PayloadError {}

impl std::fmt::Display for PayloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadError::MissingField { path, field } => write!(f, "{path}: missing mandatory field '{field}'"),
            PayloadError::MissingSubMessage { path, field } => write!(f, "{path}: missing mandatory sub-message '{field}'"),
            PayloadError::PresentWithoutCounterpart { path, present, missing } => {
                write!(f, "{path}: '{present}' present without '{missing}'")
            }
            PayloadError::InvalidAssertType => write!(f, "invalid assert_type value"),
            PayloadError::UnknownOperationType { path, type_value } => write!(f, "{path}: invalid type ({type_value})"),
            PayloadError::UnknownPayloadVersion(version) => write!(f, "unknown payload version ({version})"),
            PayloadError::UnknownSignatureVersion(version) => write!(f, "unknown signature version ({version})"),

            PayloadError::BlockSizeNotPowerOfTwo(size) => write!(f, "expected block size ({size}) is not a power of two"),
            PayloadError::BlockSizeMismatch { actual, expected } => write!(f, "block_size ({actual}) not as expected ({expected})"),
            PayloadError::ExtentLengthZero { path } => write!(f, "{path}: extent length is zero"),
            PayloadError::ExtentExceedsPartition { path, extent, usable_size } => {
                write!(f, "{path}: extent ({extent}) exceeds usable partition size ({usable_size})")
            }
            PayloadError::UnexpectedPseudoExtent { path } => write!(f, "{path}: unexpected pseudo-extent"),
            PayloadError::DstExtentsEmpty { path } => write!(f, "{path}: dst_extents is empty"),
            PayloadError::LengthIsZero { path, length_name } => write!(f, "{path}: {length_name} is zero"),
            PayloadError::LengthDoesNotFitBlocks { path, length_name, length, num_blocks, block_size } => write!(
                f,
                "{path}: {length_name} ({length}) does not fit allotted blocks ({num_blocks} * {block_size})"
            ),
            PayloadError::OldContentExceedsPartition { path, size, partition_size } => {
                write!(f, "{path}: old content ({size}) exceeds partition size ({partition_size})")
            }
            PayloadError::NewContentExceedsPartition { path, size, partition_size } => {
                write!(f, "{path}: new content ({size}) exceeds partition size ({partition_size})")
            }
            PayloadError::NoOperations => write!(f, "payload contains no operations"),

            PayloadError::PayloadTypeMismatch { detected, asserted } => {
                write!(f, "apparent {detected} payload does not match asserted type ({asserted})")
            }
            PayloadError::ReplaceContainsSrcExtents { path } => write!(f, "{path}: contains src_extents"),
            PayloadError::MissingDataOffsetLength { path } => write!(f, "{path}: missing data_{{offset,length}}"),
            PayloadError::DataLengthTooLarge { path, data_length, allotted } => write!(
                f,
                "{path}: data_length ({data_length}) must be less than allotted dst block space ({allotted})"
            ),
            PayloadError::MoveContainsData { path } => write!(f, "{path}: contains data_{{offset,length}}"),
            PayloadError::MoveBlockCountMismatch { path, total_src, total_dst } => {
                write!(f, "{path}: total src blocks ({total_src}) != total dst blocks ({total_dst})")
            }
            PayloadError::MoveRanOutOfExtents { path, side, done, total } => {
                write!(f, "{path}: ran out of {side} extents ({done}/{total})")
            }
            PayloadError::MoveExcessBlocks { path, side } => write!(f, "{path}: excess {side} blocks"),
            PayloadError::MoveSameSrcDstBlock { path, index, block } => {
                write!(f, "{path}: src/dst block number {index} is the same ({block})")
            }
            PayloadError::NonReplaceInFullPayload { path } => write!(f, "{path}: non-REPLACE operation in a full payload"),

            PayloadError::DataOffsetNotContiguous { path, data_offset, expected } => write!(
                f,
                "{path}: data offset ({data_offset}) not matching amount used so far ({expected})"
            ),
            PayloadError::DataSha256Mismatch { path, expected, actual } => {
                write!(f, "{path}: data_sha256_hash ({expected}) does not match actual hash ({actual})")
            }
            PayloadError::UnhashedOperationNotAllowed { path } => write!(f, "{path}: unhashed operation not allowed"),
            PayloadError::NotAllBlocksWrittenOnce { path } => {
                write!(f, "{path}: not all blocks written exactly once during full update")
            }
            PayloadError::UsedPayloadSizeMismatch { used, actual } => write!(
                f,
                "used payload size ({used}) different from actual file size ({actual})"
            ),

            PayloadError::MissingPublicKey { reason } => write!(f, "no public key provided, cannot verify {reason}"),
            PayloadError::SignatureBlockEmpty => write!(f, "signature block is empty"),
            PayloadError::SignatureOperationMismatch { sigs_offset, sigs_size, op_data_offset, op_data_length } => write!(
                f,
                "signatures_{{offset,size}} ({sigs_offset}+{sigs_size}) does not match last operation ({op_data_offset}+{op_data_length})"
            ),
            PayloadError::SignatureVerificationFailed { label, source } => write!(f, "{label}: {source}"),
            PayloadError::ReadMetadataSignature(err) => write!(f, "failed to read metadata signature file: {err}"),

            PayloadError::Format(err) => write!(f, "{err}"),
        }
    }
}

impl From<update_format_payload::Error> for PayloadError {
    fn from(err: update_format_payload::Error) -> Self {
        PayloadError::Format(err)
    }
}
