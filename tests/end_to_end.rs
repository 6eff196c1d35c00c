//! End-to-end scenarios against real (if tiny) payload files, built
//! in-memory and written to a scratch path rather than checked in as
//! binary fixtures -- the same "build the input programmatically"
//! preference the teacher's own `verify_sig` tests show for key material.
//!
//! Covers the six scenarios named in the checker's testable-properties
//! section: a minimal full payload, a delta payload with a MOVE, an
//! illegal MOVE inside a full payload, a data-offset gap, a bad blob
//! hash, and the full metadata+payload signature flow.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use protobuf::Message;
use sha2::{Digest, Sha256};
use update_format_payload::proto::update_metadata::install_operation::Type as OpType;
use update_format_payload::proto::update_metadata::{DeltaArchiveManifest, Extent, InstallOperation, PartitionInfo, Signature, Signatures};
use update_format_payload::verify_sig::KeyType;
use update_format_payload::{Payload, PSEUDO_EXTENT_MARKER};

use payload_checker::checker::PayloadChecker;
use payload_checker::config::{CheckerConfig, PayloadType};
use payload_checker::error::PayloadError;

const MAGIC: &[u8; 4] = b"CrAU";
const BLOCK_SIZE: u64 = 4096;

/// Deletes its path on drop, so a failing assertion still cleans up.
struct ScratchFile(PathBuf);

impl Drop for ScratchFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

fn scratch_path(label: &str) -> PathBuf {
    let pid = std::process::id();
    let nanos = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap().subsec_nanos();
    std::env::temp_dir().join(format!("payload-checker-test-{label}-{pid}-{nanos}"))
}

fn write_payload_file(manifest: &DeltaArchiveManifest, data: &[u8]) -> ScratchFile {
    let path = scratch_path("payload");
    let manifest_bytes = manifest.write_to_bytes().expect("manifest encodes");

    let mut file = File::create(&path).expect("create scratch payload file");
    file.write_all(MAGIC).unwrap();
    file.write_all(&1u64.to_be_bytes()).unwrap();
    file.write_all(&(manifest_bytes.len() as u64).to_be_bytes()).unwrap();
    file.write_all(&manifest_bytes).unwrap();
    file.write_all(data).unwrap();
    ScratchFile(path)
}

fn extent(start: u64, num: u64) -> Extent {
    let mut e = Extent::new();
    e.start_block = Some(start);
    e.num_blocks = Some(num);
    e
}

fn partition_info(size: u64, hash: Vec<u8>) -> PartitionInfo {
    let mut info = PartitionInfo::new();
    info.size = Some(size);
    info.hash = Some(hash);
    info
}

fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

fn empty_partition_info() -> PartitionInfo {
    partition_info(0, sha256(b""))
}

fn run_checker(path: &Path, config: &CheckerConfig) -> (Result<(), PayloadError>, String) {
    let payload = Payload::open(path).expect("payload opens");
    let checker = PayloadChecker::new(&payload, config);
    let (result, report) = checker.run(0, 0, None, KeyType::KeyTypePkcs8, None);
    (result, report.dump())
}

/// S1: a minimal full payload -- one REPLACE writing the whole (one-block)
/// rootfs, no kernel operations.
#[test]
fn s1_minimal_full_payload_passes() {
    let data = vec![0xABu8; BLOCK_SIZE as usize];

    let mut manifest = DeltaArchiveManifest::new();
    manifest.block_size = Some(BLOCK_SIZE as u32);
    manifest.new_kernel_info = Some(empty_partition_info()).into();
    manifest.new_rootfs_info = Some(partition_info(BLOCK_SIZE, sha256(b"rootfs"))).into();

    let mut op = InstallOperation::new();
    op.type_ = OpType::REPLACE.into();
    op.dst_extents.push(extent(0, 1));
    op.data_offset = Some(0);
    op.data_length = Some(BLOCK_SIZE);
    op.data_sha256_hash = Some(sha256(&data));
    manifest.install_operations.push(op);

    let file = write_payload_file(&manifest, &data);
    let mut config = CheckerConfig::default();
    config.assert_type = Some(PayloadType::Full);

    let (result, _report) = run_checker(&file.0, &config);
    assert!(result.is_ok(), "{result:?}");
}

/// S2: a delta payload whose single rootfs operation is a MOVE.
#[test]
fn s2_delta_with_move_passes() {
    let mut manifest = DeltaArchiveManifest::new();
    manifest.block_size = Some(BLOCK_SIZE as u32);
    manifest.old_kernel_info = Some(empty_partition_info()).into();
    manifest.old_rootfs_info = Some(partition_info(3 * BLOCK_SIZE, sha256(b"old-rootfs"))).into();
    manifest.new_kernel_info = Some(empty_partition_info()).into();
    manifest.new_rootfs_info = Some(partition_info(BLOCK_SIZE, sha256(b"new-rootfs"))).into();

    let mut op = InstallOperation::new();
    op.type_ = OpType::MOVE.into();
    op.src_extents.push(extent(2, 1));
    op.dst_extents.push(extent(0, 1));
    manifest.install_operations.push(op);

    let file = write_payload_file(&manifest, &[]);
    let mut config = CheckerConfig::default();
    config.assert_type = Some(PayloadType::Delta);

    let (result, _report) = run_checker(&file.0, &config);
    assert!(result.is_ok(), "{result:?}");
}

/// S3: a full payload (no old_*_info) containing a MOVE, which is illegal
/// outside a delta.
#[test]
fn s3_illegal_move_in_full_payload_is_rejected() {
    let mut manifest = DeltaArchiveManifest::new();
    manifest.block_size = Some(BLOCK_SIZE as u32);
    manifest.new_kernel_info = Some(empty_partition_info()).into();
    manifest.new_rootfs_info = Some(partition_info(BLOCK_SIZE, sha256(b"new-rootfs"))).into();

    let mut op = InstallOperation::new();
    op.type_ = OpType::MOVE.into();
    op.src_extents.push(extent(0, 1));
    op.dst_extents.push(extent(0, 1));
    manifest.install_operations.push(op);

    let file = write_payload_file(&manifest, &[]);
    let config = CheckerConfig::default();

    let (result, _report) = run_checker(&file.0, &config);
    assert!(matches!(result, Err(PayloadError::NonReplaceInFullPayload { .. })));
}

/// S4: two REPLACE operations where the second's `data_offset` leaves a
/// gap instead of picking up exactly where the first left off.
#[test]
fn s4_data_offset_gap_is_rejected() {
    let data = vec![0u8; 2 * BLOCK_SIZE as usize];

    let mut manifest = DeltaArchiveManifest::new();
    manifest.block_size = Some(BLOCK_SIZE as u32);
    manifest.new_kernel_info = Some(empty_partition_info()).into();
    manifest.new_rootfs_info = Some(partition_info(2 * BLOCK_SIZE, sha256(b"new-rootfs"))).into();

    let mut op1 = InstallOperation::new();
    op1.type_ = OpType::REPLACE.into();
    op1.dst_extents.push(extent(0, 1));
    op1.data_offset = Some(0);
    op1.data_length = Some(BLOCK_SIZE);
    op1.data_sha256_hash = Some(sha256(&data[0..BLOCK_SIZE as usize]));
    manifest.install_operations.push(op1);

    let mut op2 = InstallOperation::new();
    op2.type_ = OpType::REPLACE.into();
    op2.dst_extents.push(extent(1, 1));
    // Should be `BLOCK_SIZE`; skips ahead by one extra byte to open a gap.
    op2.data_offset = Some(BLOCK_SIZE + 1);
    op2.data_length = Some(BLOCK_SIZE);
    op2.data_sha256_hash = Some(sha256(&data[BLOCK_SIZE as usize..]));
    manifest.install_operations.push(op2);

    let file = write_payload_file(&manifest, &data);
    let config = CheckerConfig::default();

    let (result, _report) = run_checker(&file.0, &config);
    assert!(matches!(result, Err(PayloadError::DataOffsetNotContiguous { .. })));
}

/// S5: a REPLACE operation whose declared hash doesn't match its blob.
#[test]
fn s5_bad_hash_is_rejected() {
    let data = vec![0x11u8; BLOCK_SIZE as usize];

    let mut manifest = DeltaArchiveManifest::new();
    manifest.block_size = Some(BLOCK_SIZE as u32);
    manifest.new_kernel_info = Some(empty_partition_info()).into();
    manifest.new_rootfs_info = Some(partition_info(BLOCK_SIZE, sha256(b"new-rootfs"))).into();

    let mut op = InstallOperation::new();
    op.type_ = OpType::REPLACE.into();
    op.dst_extents.push(extent(0, 1));
    op.data_offset = Some(0);
    op.data_length = Some(BLOCK_SIZE);
    op.data_sha256_hash = Some(sha256(b"not the actual data"));
    manifest.install_operations.push(op);

    let file = write_payload_file(&manifest, &data);
    let config = CheckerConfig::default();

    let (result, _report) = run_checker(&file.0, &config);
    assert!(matches!(result, Err(PayloadError::DataSha256Mismatch { .. })));
}

/// S6b: rootfs operations are checked (and their data consumed) before
/// kernel operations -- a kernel REPLACE whose data sits right after the
/// rootfs REPLACE's data only lines up if rootfs runs first.
#[test]
fn s6b_kernel_data_after_rootfs_data_passes() {
    let rootfs_data = vec![0x22u8; BLOCK_SIZE as usize];
    let kernel_data = vec![0x33u8; BLOCK_SIZE as usize];
    let mut full_data = rootfs_data.clone();
    full_data.extend_from_slice(&kernel_data);

    let mut manifest = DeltaArchiveManifest::new();
    manifest.block_size = Some(BLOCK_SIZE as u32);
    manifest.new_kernel_info = Some(partition_info(BLOCK_SIZE, sha256(b"new-kernel"))).into();
    manifest.new_rootfs_info = Some(partition_info(BLOCK_SIZE, sha256(b"new-rootfs"))).into();

    let mut rootfs_op = InstallOperation::new();
    rootfs_op.type_ = OpType::REPLACE.into();
    rootfs_op.dst_extents.push(extent(0, 1));
    rootfs_op.data_offset = Some(0);
    rootfs_op.data_length = Some(BLOCK_SIZE);
    rootfs_op.data_sha256_hash = Some(sha256(&rootfs_data));
    manifest.install_operations.push(rootfs_op);

    let mut kernel_op = InstallOperation::new();
    kernel_op.type_ = OpType::REPLACE.into();
    kernel_op.dst_extents.push(extent(0, 1));
    kernel_op.data_offset = Some(BLOCK_SIZE);
    kernel_op.data_length = Some(BLOCK_SIZE);
    kernel_op.data_sha256_hash = Some(sha256(&kernel_data));
    manifest.kernel_install_operations.push(kernel_op);

    let file = write_payload_file(&manifest, &full_data);
    let config = CheckerConfig::default();

    let (result, report) = run_checker(&file.0, &config);
    assert!(result.is_ok(), "{result:?}\n{report}");
}

/// S6: a signed full payload -- both the metadata signature (over
/// header+manifest) and the payload signature (over everything up to the
/// signatures blob) must verify against the same key.
#[test]
fn s6_signed_payload_verifies() {
    use rand::rngs::OsRng;
    use rsa::pkcs1v15::SigningKey;
    use rsa::pkcs8::EncodePublicKey;
    use rsa::sha2::{Digest as _, Sha256 as RsaSha256};
    use rsa::signature::hazmat::PrehashSigner;
    use rsa::signature::SignatureEncoding;
    use rsa::traits::PublicKeyParts;
    use rsa::{RsaPrivateKey, RsaPublicKey};

    let private_key = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
    let public_key = RsaPublicKey::from(&private_key);
    let signing_key = SigningKey::<RsaSha256>::new(private_key);

    let data = vec![0x42u8; BLOCK_SIZE as usize];

    let mut manifest = DeltaArchiveManifest::new();
    manifest.block_size = Some(BLOCK_SIZE as u32);
    manifest.new_kernel_info = Some(empty_partition_info()).into();
    manifest.new_rootfs_info = Some(partition_info(BLOCK_SIZE, sha256(b"new-rootfs"))).into();

    let mut op = InstallOperation::new();
    op.type_ = OpType::REPLACE.into();
    op.dst_extents.push(extent(0, 1));
    op.data_offset = Some(0);
    op.data_length = Some(BLOCK_SIZE);
    op.data_sha256_hash = Some(sha256(&data));
    manifest.install_operations.push(op);

    let sigs_offset = BLOCK_SIZE;
    manifest.signatures_offset = Some(sigs_offset);

    // A PKCS#1v1.5 signature is always exactly `public_key.size()` bytes,
    // so the `Signatures` blob's encoded length can be pinned down with a
    // placeholder of that length before the real digest is known -- the
    // manifest (and therefore its hash) must be complete and final before
    // either signature is computed.
    let placeholder_sig_len = public_key.size();
    let mut placeholder_msg = Signatures::new();
    let mut placeholder_entry = Signature::new();
    placeholder_entry.version = Some(1);
    placeholder_entry.data = Some(vec![0u8; placeholder_sig_len]);
    placeholder_msg.signatures.push(placeholder_entry);
    let sigs_size = placeholder_msg.write_to_bytes().unwrap().len() as u64;
    manifest.signatures_size = Some(sigs_size);

    // The trailing Signatures blob is addressed by its own "fake"
    // operation -- a REPLACE with a single pseudo dst_extent whose
    // data_offset/data_length point at the signature bytes themselves.
    // It lives in kernel_install_operations, the sequence the checker
    // trusts with allow_signature, not install_operations.
    let mut fake_sig_op = InstallOperation::new();
    fake_sig_op.type_ = OpType::REPLACE.into();
    fake_sig_op.dst_extents.push(extent(PSEUDO_EXTENT_MARKER, 1));
    fake_sig_op.data_offset = Some(sigs_offset);
    fake_sig_op.data_length = Some(sigs_size);
    manifest.kernel_install_operations.push(fake_sig_op);

    let manifest_bytes = manifest.write_to_bytes().unwrap();

    let mut metadata_hasher = RsaSha256::new();
    metadata_hasher.update(MAGIC);
    metadata_hasher.update(1u64.to_be_bytes());
    metadata_hasher.update((manifest_bytes.len() as u64).to_be_bytes());
    metadata_hasher.update(&manifest_bytes);
    let metadata_digest: [u8; 32] = metadata_hasher.clone().finalize().into();
    let metadata_sig = signing_key.sign_prehash(&metadata_digest).unwrap().to_bytes().to_vec();

    let mut payload_hasher = metadata_hasher;
    payload_hasher.update(&data);
    let payload_digest: [u8; 32] = payload_hasher.finalize().into();
    let payload_sig = signing_key.sign_prehash(&payload_digest).unwrap().to_bytes().to_vec();
    assert_eq!(payload_sig.len(), placeholder_sig_len, "RSA signature length must be fixed for a given key");

    let mut sig_msg = Signatures::new();
    let mut sig_entry = Signature::new();
    sig_entry.version = Some(1);
    sig_entry.data = Some(payload_sig);
    sig_msg.signatures.push(sig_entry);
    let sig_msg_bytes = sig_msg.write_to_bytes().unwrap();
    assert_eq!(sig_msg_bytes.len() as u64, manifest.signatures_size.unwrap(), "real signature blob must match the size reserved for it");

    let mut full_data = data.clone();
    full_data.extend_from_slice(&sig_msg_bytes);

    let file = write_payload_file(&manifest, &full_data);

    let pem = public_key.to_public_key_pem(rsa::pkcs8::LineEnding::LF).unwrap();
    let key_path = scratch_path("pubkey");
    std::fs::write(&key_path, pem).unwrap();
    let _key_guard = ScratchFile(key_path.clone());

    let metadata_sig_path = scratch_path("metadata-sig");
    std::fs::write(&metadata_sig_path, &metadata_sig).unwrap();
    let _sig_guard = ScratchFile(metadata_sig_path.clone());

    let config = CheckerConfig::default();
    let payload = Payload::open(&file.0).expect("payload opens");
    let checker = PayloadChecker::new(&payload, &config);
    let (result, report) = checker.run(
        0,
        0,
        Some(key_path.to_str().unwrap()),
        KeyType::KeyTypePkcs8,
        Some(metadata_sig_path.as_path()),
    );

    assert!(result.is_ok(), "{result:?}\n{}", report.dump());
}
