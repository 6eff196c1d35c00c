//! Two-layer signature verification (§4.7-§4.8), grounded on
//! `_CheckSignatures` in the Python checker: the metadata signature covers
//! the header+manifest hash; the payload signature covers the whole
//! payload up to (not including) the trailing `Signatures` blob itself,
//! with the blob's own "fake" REPLACE operation excluded from that hash.

use std::path::Path;

use protobuf::Message;
use sha2::Digest;
use update_format_payload::proto::update_metadata::install_operation::Type as OpType;
use update_format_payload::proto::update_metadata::{DeltaArchiveManifest, Signatures};
use update_format_payload::verify_sig::{get_public_key_pkcs_pem, KeyType, SignatureOracle};
use update_format_payload::Payload;

use crate::error::PayloadError;
use crate::report::Report;

fn check_one_signature(
    label: &str,
    sig_data: &[u8],
    digest: &[u8; 32],
    public_key_path: &str,
    key_type: KeyType,
    oracle: &dyn SignatureOracle,
    report: &mut Report,
) -> Result<(), PayloadError> {
    let public_key =
        get_public_key_pkcs_pem(public_key_path, key_type).map_err(|source| PayloadError::SignatureVerificationFailed { label: label.to_string(), source })?;

    oracle
        .verify_sha256(sig_data, &public_key, digest)
        .map_err(|source| PayloadError::SignatureVerificationFailed { label: label.to_string(), source })?;

    report.add_field(label, "verified");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn check_signatures(
    payload: &Payload,
    manifest: &DeltaArchiveManifest,
    public_key_path: Option<&str>,
    key_type: KeyType,
    metadata_sig_file: Option<&Path>,
    oracle: &dyn SignatureOracle,
    report: &mut Report,
) -> Result<(), PayloadError> {
    let needs_key = metadata_sig_file.is_some() || manifest.signatures_offset.is_some();
    let Some(public_key_path) = public_key_path else {
        if needs_key {
            return Err(PayloadError::MissingPublicKey { reason: "a signed payload or metadata signature file was provided" });
        }
        report.add_field("signature_check", "skipped (no public key provided)");
        report.finalize();
        return Ok(());
    };

    // Metadata signature: covers the header + manifest bytes hashed while
    // the payload was opened.
    if let Some(metadata_sig_path) = metadata_sig_file {
        let sig_data = std::fs::read(metadata_sig_path).map_err(PayloadError::ReadMetadataSignature)?;
        let digest: [u8; 32] = payload.manifest_hasher.clone().finalize().into();
        check_one_signature("metadata_signature", &sig_data, &digest, public_key_path, key_type, oracle, report)?;
    } else {
        report.add_field("metadata_signature", "skipped (no metadata signature file provided)");
    }

    // Payload signature: a trailing `Signatures` message located by
    // `signatures_offset`/`signatures_size`, covering every byte up to
    // (not including) that message itself.
    let (sigs_offset, sigs_size) = match (manifest.signatures_offset, manifest.signatures_size) {
        (Some(offset), Some(size)) => (offset, size),
        (None, None) => {
            report.add_field("payload_signature", "skipped (payload is unsigned)");
            report.finalize();
            return Ok(());
        }
        _ => return Err(PayloadError::PresentWithoutCounterpart { path: "manifest".into(), present: "signatures_offset", missing: "signatures_size" }),
    };

    // The trailing Signatures blob is addressed by a "fake" REPLACE
    // operation already present at the end of whichever sequence is
    // non-empty (kernel, else rootfs) -- not by an independent offset
    // derived from how much data the real operations consumed.
    let last_ops_section =
        if !manifest.kernel_install_operations.is_empty() { &manifest.kernel_install_operations } else { &manifest.install_operations };
    let fake_sig_op = last_ops_section
        .last()
        .ok_or(PayloadError::SignatureBlockEmpty)?;
    let fake_op_type = fake_sig_op
        .type_
        .enum_value()
        .map_err(|v| PayloadError::UnknownOperationType { path: "signatures.fake_op".into(), type_value: v })?;
    if fake_op_type != OpType::REPLACE || fake_sig_op.data_offset != Some(sigs_offset) || fake_sig_op.data_length != Some(sigs_size) {
        return Err(PayloadError::SignatureOperationMismatch {
            sigs_offset,
            sigs_size,
            op_data_offset: fake_sig_op.data_offset.unwrap_or(0),
            op_data_length: fake_sig_op.data_length.unwrap_or(0),
        });
    }

    let sig_blob = payload.read_data_blob(sigs_offset, sigs_size)?;
    let signatures = Signatures::parse_from_bytes(&sig_blob).map_err(update_format_payload::Error::ParseManifest)?;

    if signatures.signatures.is_empty() {
        return Err(PayloadError::SignatureBlockEmpty);
    }

    // The payload hash covers everything up through the end of the last
    // real operation's data, i.e. everything strictly before the
    // signatures blob -- continue the same rolling hash the manifest
    // parse started, fed with the data section up to `sigs_offset`.
    let mut payload_hasher = payload.manifest_hasher.clone();
    payload.hash_data_range(0, sigs_offset, &mut payload_hasher)?;
    let payload_digest: [u8; 32] = payload_hasher.finalize().into();

    for (index, sig) in signatures.signatures.iter().enumerate() {
        let version = sig.version.ok_or_else(|| PayloadError::MissingField { path: format!("signatures[{index}]"), field: "version" })?;
        if version != 1 {
            return Err(PayloadError::UnknownSignatureVersion(version));
        }
        let data = sig.data.as_ref().ok_or_else(|| PayloadError::MissingField { path: format!("signatures[{index}]"), field: "data" })?;
        check_one_signature(&format!("payload_signature[{index}]"), data, &payload_digest, public_key_path, key_type, oracle, report)?;
    }

    report.finalize();
    Ok(())
}
