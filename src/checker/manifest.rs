//! Manifest-level checks (§4.2), grounded on `_CheckManifest` in the Python
//! checker: block size, the old-partition-info joint presence that decides
//! full vs. delta, partition size bounds, and "at least one operation".

use update_format_payload::proto::update_metadata::{DeltaArchiveManifest, PartitionInfo};

use crate::config::{CheckerConfig, PayloadType};
use crate::error::PayloadError;
use crate::report::Report;

/// Partition sizes and the detected payload type, handed down to the
/// per-sequence and signature checks so they don't have to re-derive them.
#[derive(Debug, Clone, Copy)]
pub struct ManifestSummary {
    pub payload_type: PayloadType,
    pub old_kernel_size: u64,
    pub new_kernel_size: u64,
    pub new_kernel_usable_size: u64,
    pub old_rootfs_size: u64,
    pub new_rootfs_size: u64,
    pub new_rootfs_usable_size: u64,
}

fn check_partition_info(
    info: Option<&PartitionInfo>,
    name: &str,
    mandatory: bool,
    part_size: u64,
    report: &mut Report,
) -> Result<u64, PayloadError> {
    let Some(info) = info else {
        if mandatory {
            return Err(PayloadError::MissingSubMessage { path: "manifest".into(), field: name });
        }
        return Ok(0);
    };

    let size = info.size.ok_or_else(|| PayloadError::MissingField { path: name.into(), field: "size" })?;
    let hash = info
        .hash
        .as_ref()
        .ok_or_else(|| PayloadError::MissingField { path: name.into(), field: "hash" })?;

    if part_size > 0 && size > part_size {
        return Err(PayloadError::OldContentExceedsPartition { path: name.into(), size, partition_size: part_size });
    }

    let sub = report.add_sub_report(name.to_string());
    sub.add_field("size", size);
    sub.add_field("hash", update_format_payload::format_sha256(hash));
    sub.finalize();

    Ok(size)
}

pub fn check_manifest(
    manifest: &DeltaArchiveManifest,
    config: &CheckerConfig,
    block_size: u64,
    rootfs_part_size: u64,
    kernel_part_size: u64,
    report: &mut Report,
) -> Result<ManifestSummary, PayloadError> {
    let manifest_block_size = manifest.block_size.unwrap_or(block_size as u32) as u64;
    if manifest_block_size != block_size {
        return Err(PayloadError::BlockSizeMismatch { actual: manifest_block_size, expected: block_size });
    }
    report.add_field("block_size", block_size);

    let old_kernel_present = manifest.old_kernel_info.is_some();
    let old_rootfs_present = manifest.old_rootfs_info.is_some();
    if old_kernel_present != old_rootfs_present {
        let (present, missing) = if old_kernel_present {
            ("old_kernel_info", "old_rootfs_info")
        } else {
            ("old_rootfs_info", "old_kernel_info")
        };
        return Err(PayloadError::PresentWithoutCounterpart { path: "manifest".into(), present, missing });
    }
    let payload_type = if old_kernel_present { PayloadType::Delta } else { PayloadType::Full };
    report.add_field("payload_type", payload_type.as_str());

    let sigs_offset_present = manifest.signatures_offset.is_some();
    let sigs_size_present = manifest.signatures_size.is_some();
    if sigs_offset_present != sigs_size_present {
        let (present, missing) = if sigs_offset_present {
            ("signatures_offset", "signatures_size")
        } else {
            ("signatures_size", "signatures_offset")
        };
        return Err(PayloadError::PresentWithoutCounterpart { path: "manifest".into(), present, missing });
    }

    let old_kernel_size = check_partition_info(manifest.old_kernel_info.as_ref(), "old_kernel_info", false, kernel_part_size, report)?;
    let old_rootfs_size = check_partition_info(manifest.old_rootfs_info.as_ref(), "old_rootfs_info", false, rootfs_part_size, report)?;
    let new_kernel_size = check_partition_info(manifest.new_kernel_info.as_ref(), "new_kernel_info", true, kernel_part_size, report)?;
    let new_rootfs_size = check_partition_info(manifest.new_rootfs_info.as_ref(), "new_rootfs_info", true, rootfs_part_size, report)?;

    if manifest.install_operations.is_empty() && manifest.kernel_install_operations.is_empty() {
        return Err(PayloadError::NoOperations);
    }

    let new_kernel_usable_size = if kernel_part_size > 0 { kernel_part_size } else { new_kernel_size };
    let new_rootfs_usable_size = if rootfs_part_size > 0 { rootfs_part_size } else { new_rootfs_size };

    Ok(ManifestSummary {
        payload_type,
        old_kernel_size,
        new_kernel_size,
        new_kernel_usable_size,
        old_rootfs_size,
        new_rootfs_size,
        new_rootfs_usable_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use update_format_payload::proto::update_metadata::InstallOperation;

    fn partition_info(size: u64) -> PartitionInfo {
        let mut info = PartitionInfo::new();
        info.size = Some(size);
        info.hash = Some(vec![0u8; 32]);
        info
    }

    #[test]
    fn full_payload_has_no_old_info() {
        let mut manifest = DeltaArchiveManifest::new();
        manifest.block_size = Some(4096);
        manifest.new_kernel_info = Some(partition_info(1024)).into();
        manifest.new_rootfs_info = Some(partition_info(2048)).into();
        manifest.install_operations.push(InstallOperation::new());

        let config = CheckerConfig::default();
        let mut report = Report::new();
        let summary = check_manifest(&manifest, &config, 4096, 0, 0, &mut report).unwrap();
        assert_eq!(summary.payload_type, PayloadType::Full);
    }

    #[test]
    fn mismatched_old_info_presence_is_rejected() {
        let mut manifest = DeltaArchiveManifest::new();
        manifest.block_size = Some(4096);
        manifest.old_kernel_info = Some(partition_info(512)).into();
        manifest.new_kernel_info = Some(partition_info(1024)).into();
        manifest.new_rootfs_info = Some(partition_info(2048)).into();
        manifest.install_operations.push(InstallOperation::new());

        let config = CheckerConfig::default();
        let mut report = Report::new();
        let err = check_manifest(&manifest, &config, 4096, 0, 0, &mut report).unwrap_err();
        assert!(matches!(err, PayloadError::PresentWithoutCounterpart { .. }));
    }
}
