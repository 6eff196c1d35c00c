//! `check-payload`: a thin CLI wrapper around [`payload_checker`].
//!
//! Grounded on the teacher's own small `argh` + `env_logger` binaries: parse
//! args, open the payload, run the checker, print the report (or the
//! error) and exit with a matching status code.

use std::path::PathBuf;
use std::process::ExitCode;

use argh::FromArgs;
use payload_checker::config::{CheckerConfig, DisabledCheck, PayloadType};
use payload_checker::checker::PayloadChecker;
use update_format_payload::verify_sig::KeyType;
use update_format_payload::Payload;

#[derive(FromArgs)]
/// Verify the structural and cryptographic integrity of an update payload.
struct Args {
    /// path to the update payload file
    #[argh(positional)]
    payload: PathBuf,

    /// assert the payload is of this type ("full" or "delta")
    #[argh(option)]
    assert_type: Option<String>,

    /// expected block size, in bytes (default: 4096)
    #[argh(option, default = "0")]
    block_size: u64,

    /// allow operations without a data_sha256_hash
    #[argh(switch)]
    allow_unhashed: bool,

    /// disable a named optional check; may be repeated
    /// (dst-pseudo-extents, move-same-src-dst-block, payload-sig)
    #[argh(option)]
    disable: Vec<String>,

    /// size of the rootfs partition, in bytes
    #[argh(option, default = "0")]
    rootfs_part_size: u64,

    /// size of the kernel partition, in bytes
    #[argh(option, default = "0")]
    kernel_part_size: u64,

    /// path to a PEM-encoded public key used to verify signatures
    #[argh(option)]
    public_key_file: Option<String>,

    /// public key encoding ("pkcs1" or "pkcs8", default: pkcs8)
    #[argh(option, default = "String::from(\"pkcs8\")")]
    key_type: String,

    /// path to a detached metadata signature file
    #[argh(option)]
    metadata_sig_file: Option<PathBuf>,
}

fn parse_disabled_check(name: &str) -> Option<DisabledCheck> {
    match name {
        "dst-pseudo-extents" => Some(DisabledCheck::DstPseudoExtents),
        "move-same-src-dst-block" => Some(DisabledCheck::MoveSameSrcDstBlock),
        "payload-sig" => Some(DisabledCheck::PayloadSig),
        _ => None,
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args: Args = argh::from_env();

    let mut config = CheckerConfig { block_size: args.block_size, allow_unhashed: args.allow_unhashed, ..CheckerConfig::default() };

    config.assert_type = match args.assert_type.as_deref() {
        Some("full") => Some(PayloadType::Full),
        Some("delta") => Some(PayloadType::Delta),
        Some(other) => {
            eprintln!("error: invalid --assert-type '{other}', expected 'full' or 'delta'");
            return ExitCode::FAILURE;
        }
        None => None,
    };

    for name in &args.disable {
        match parse_disabled_check(name) {
            Some(check) => {
                config.disabled_tests.insert(check);
            }
            None => {
                eprintln!("error: unknown --disable '{name}'");
                return ExitCode::FAILURE;
            }
        }
    }

    let key_type = match args.key_type.as_str() {
        "pkcs1" => KeyType::KeyTypePkcs1,
        "pkcs8" => KeyType::KeyTypePkcs8,
        other => {
            eprintln!("error: invalid --key-type '{other}', expected 'pkcs1' or 'pkcs8'");
            return ExitCode::FAILURE;
        }
    };

    let payload = match Payload::open(&args.payload) {
        Ok(payload) => payload,
        Err(err) => {
            eprintln!("error: failed to open payload: {err}");
            return ExitCode::FAILURE;
        }
    };

    let checker = PayloadChecker::new(&payload, &config);
    let (result, report) = checker.run(
        args.rootfs_part_size,
        args.kernel_part_size,
        args.public_key_file.as_deref(),
        key_type,
        args.metadata_sig_file.as_deref(),
    );

    println!("{}", report.dump());

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
