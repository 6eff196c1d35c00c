//! The checker itself (§4.2-§4.8): manifest validation, extent and
//! operation accounting, block bookkeeping, and the two-layer signature
//! check, tied together by a `Run`-equivalent driver.
//!
//! Grounded module-for-method on the Python checker's `PayloadChecker`
//! class (`checker.py`): `_CheckManifest` -> [`manifest`], `_CheckExtents`
//! -> [`extent`], `_CheckOperation`/`_CheckReplaceOperation`/
//! `_CheckMoveOperation`/`_CheckBsdiffOperation` -> [`operation`],
//! `_CheckOperations` -> [`sequence`], `_CheckSignatures` -> [`signature`],
//! `Run` -> [`run`].

mod extent;
mod manifest;
mod operation;
mod sequence;
mod signature;

use std::path::Path;

use log::info;
use update_format_payload::verify_sig::{KeyType, RsaRecoveryOracle, SignatureOracle};
use update_format_payload::Payload;

use crate::config::CheckerConfig;
use crate::error::PayloadError;
use crate::report::Report;

pub use manifest::ManifestSummary;
pub use sequence::SequenceSummary;

/// Drives every check against one parsed payload.
pub struct PayloadChecker<'a> {
    payload: &'a Payload,
    config: &'a CheckerConfig,
    oracle: Box<dyn SignatureOracle>,
}

impl<'a> PayloadChecker<'a> {
    pub fn new(payload: &'a Payload, config: &'a CheckerConfig) -> Self {
        PayloadChecker { payload, config, oracle: Box::new(RsaRecoveryOracle) }
    }

    /// Runs every check, producing a finalized [`Report`] on success.
    ///
    /// `public_key_path`/`key_type` and `metadata_sig_file` are both
    /// optional: when absent, signature verification is skipped (with a
    /// report note) rather than treated as a hard failure, matching the
    /// Python driver's own `pubkey_file_name=None` default.
    pub fn run(
        &self,
        rootfs_part_size: u64,
        kernel_part_size: u64,
        public_key_path: Option<&str>,
        key_type: KeyType,
        metadata_sig_file: Option<&Path>,
    ) -> (Result<(), PayloadError>, Report) {
        let mut report = Report::new();
        let result = self.run_inner(rootfs_part_size, kernel_part_size, public_key_path, key_type, metadata_sig_file, &mut report);
        if result.is_ok() {
            report.finalize();
        }
        info!("payload check {}", if result.is_ok() { "passed" } else { "failed" });
        (result, report)
    }

    fn run_inner(
        &self,
        rootfs_part_size: u64,
        kernel_part_size: u64,
        public_key_path: Option<&str>,
        key_type: KeyType,
        metadata_sig_file: Option<&Path>,
        report: &mut Report,
    ) -> Result<(), PayloadError> {
        if self.payload.header.version != 1 {
            return Err(PayloadError::UnknownPayloadVersion(self.payload.header.version));
        }
        {
            let header_report = report.add_sub_report("header");
            header_report.add_field("version", self.payload.header.version);
            header_report.add_field("manifest_len", self.payload.header.manifest_len);
            header_report.finalize();
        }

        let manifest = &self.payload.manifest;
        let block_size = self.config.resolved_block_size()?;

        let summary = manifest::check_manifest(manifest, self.config, block_size, rootfs_part_size, kernel_part_size, report.add_sub_report("manifest"))?;

        if let Some(asserted) = self.config.assert_type {
            if asserted != summary.payload_type {
                return Err(PayloadError::PayloadTypeMismatch {
                    detected: summary.payload_type.as_str(),
                    asserted: asserted.as_str(),
                });
            }
        }

        let mut prev_data_offset = 0u64;

        let rootfs_summary = sequence::check_operations(
            &manifest.install_operations,
            "install_operations",
            self.config,
            block_size,
            summary.payload_type,
            summary.old_rootfs_size,
            summary.new_rootfs_size,
            summary.new_rootfs_usable_size,
            prev_data_offset,
            false,
            self.payload,
            report.add_sub_report("install_operations"),
        )?;
        prev_data_offset = rootfs_summary.end_data_offset;

        let kernel_summary = sequence::check_operations(
            &manifest.kernel_install_operations,
            "kernel_install_operations",
            self.config,
            block_size,
            summary.payload_type,
            summary.old_kernel_size,
            summary.new_kernel_size,
            summary.new_kernel_usable_size,
            prev_data_offset,
            true,
            self.payload,
            report.add_sub_report("kernel_install_operations"),
        )?;
        prev_data_offset = kernel_summary.end_data_offset;

        if self.config.check_payload_sig() {
            signature::check_signatures(
                self.payload,
                manifest,
                public_key_path,
                key_type,
                metadata_sig_file,
                self.oracle.as_ref(),
                report.add_sub_report("signatures"),
            )?;
        } else {
            report.add_field("payload_signature_check", "skipped (disabled)");
        }

        let file_size = self.payload.file_size()?;
        let used_size = self.payload.data_offset + prev_data_offset;
        if used_size != file_size {
            return Err(PayloadError::UsedPayloadSizeMismatch { used: used_size, actual: file_size });
        }

        Ok(())
    }
}
