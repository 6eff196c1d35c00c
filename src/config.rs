//! Checker configuration: assert type, block size, and which optional
//! checks are enabled.
//!
//! Grounded on `PayloadChecker.__init__`'s constructor arguments
//! (`assert_type`, `block_size`, `allow_unhashed`, `disabled_tests`) and the
//! three named `_CHECK_*` constants it tests `disabled_tests` against.

use std::collections::HashSet;

use crate::error::PayloadError;

/// The default block size used when the caller doesn't override it, and the
/// value `DeltaArchiveManifest.block_size` must match when `block_size` is
/// left at 0 (unspecified) in a [`CheckerConfig`].
pub const DEFAULT_BLOCK_SIZE: u64 = 4096;

/// Which payload type the caller expects, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadType {
    Full,
    Delta,
}

impl PayloadType {
    pub fn as_str(self) -> &'static str {
        match self {
            PayloadType::Full => "full",
            PayloadType::Delta => "delta",
        }
    }
}

/// An individually-disableable optional check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisabledCheck {
    /// Skip validating that the destination pseudo-extent's implied size
    /// matches the operation's `dst_length`.
    DstPseudoExtents,
    /// Skip rejecting a MOVE operation whose `src`/`dst` block at a given
    /// index are identical (a no-op copy, legal but wasteful).
    MoveSameSrcDstBlock,
    /// Skip payload-signature verification entirely (metadata signature
    /// verification, which doesn't depend on this flag, is unaffected).
    PayloadSig,
}

/// Caller-supplied knobs controlling which checks run and how strict they are.
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Expected payload type. `None` means either full or delta is accepted.
    pub assert_type: Option<PayloadType>,
    /// Expected block size; 0 means "use `DEFAULT_BLOCK_SIZE` and let the
    /// manifest assert its own".
    pub block_size: u64,
    /// When true, operations without a `data_sha256_hash` are allowed even
    /// though per-operation hashing can't then be verified.
    pub allow_unhashed: bool,
    pub disabled_tests: HashSet<DisabledCheck>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        CheckerConfig {
            assert_type: None,
            block_size: 0,
            allow_unhashed: false,
            disabled_tests: HashSet::new(),
        }
    }
}

impl CheckerConfig {
    /// Validates the config itself (not the payload) and resolves `block_size`
    /// to a concrete power-of-two value.
    pub fn resolved_block_size(&self) -> Result<u64, PayloadError> {
        let size = if self.block_size == 0 { DEFAULT_BLOCK_SIZE } else { self.block_size };
        if size == 0 || size & (size - 1) != 0 {
            return Err(PayloadError::BlockSizeNotPowerOfTwo(size));
        }
        Ok(size)
    }

    pub fn check_dst_pseudo_extents(&self) -> bool {
        !self.disabled_tests.contains(&DisabledCheck::DstPseudoExtents)
    }

    pub fn check_move_same_src_dst_block(&self) -> bool {
        !self.disabled_tests.contains(&DisabledCheck::MoveSameSrcDstBlock)
    }

    pub fn check_payload_sig(&self) -> bool {
        !self.disabled_tests.contains(&DisabledCheck::PayloadSig)
    }
}
