//! The RSA-with-SHA-256 signature primitive (spec §4.7).
//!
//! Grounded on `update-format-crau::verify_sig` (in-process `rsa` crate use,
//! `KeyType`/PEM loading), but reshaped from "verify and report ok/err" into
//! "recover the plaintext and let the caller make the three structural
//! checks" -- the split the Python checker itself draws between its RSA
//! subprocess call and `_CheckSha256Signature`'s own length/prefix/digest
//! comparisons. Going in-process (instead of shelling out to `openssl
//! rsautl`, as the original Python tool does) is the choice this crate's own
//! Rust teacher already made for the same primitive.

mod error;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

use std::fs;

use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};

/// ASN.1 DigestInfo prefix identifying SHA-256, per RFC 3447.
pub const SIG_ASN1_HEADER: [u8; 19] = [
    0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01, 0x05, 0x00, 0x04, 0x20,
];

pub const RSA_SIGNATURE_LEN: usize = 256;

#[derive(Debug, Clone, Copy)]
pub enum KeyType {
    KeyTypePkcs1,
    KeyTypePkcs8,
}

pub fn get_public_key_pkcs_pem(public_key_path: &str, key_type: KeyType) -> Result<RsaPublicKey> {
    let public_key_buf = fs::read_to_string(public_key_path).map_err(Error::ReadPublicKey)?;
    match key_type {
        KeyType::KeyTypePkcs1 => RsaPublicKey::from_pkcs1_pem(public_key_buf.as_str()).map_err(Error::DeserialisePkcs1),
        KeyType::KeyTypePkcs8 => RsaPublicKey::from_public_key_pem(public_key_buf.as_str()).map_err(Error::DecodePublicKey),
    }
}

/// An opaque RSA-with-SHA-256 verification oracle.
///
/// Modeled as a trait per the spec's own design note: tests can substitute a
/// fake oracle instead of generating or checking in real key material, while
/// production code gets [`RsaRecoveryOracle`].
pub trait SignatureOracle {
    /// Verifies that `sig_data` is a valid RSA-PKCS#1v1.5 signature (over a
    /// SHA-256 DigestInfo) of `expected_digest`, recovered using `public_key`.
    fn verify_sha256(&self, sig_data: &[u8], public_key: &RsaPublicKey, expected_digest: &[u8; 32]) -> Result<()>;
}

/// Recovers the signed plaintext via raw RSA public-key exponentiation
/// (the same operation `openssl rsautl -verify -pubin` performs) and checks
/// it against the expected PKCS#1v1.5 SHA-256 DigestInfo shape.
#[derive(Debug, Default, Clone, Copy)]
pub struct RsaRecoveryOracle;

impl RsaRecoveryOracle {
    /// Performs the raw RSA public-key operation and strips PKCS#1v1.5
    /// Type-1 ("signature") padding, returning the recovered message.
    fn recover(sig_data: &[u8], public_key: &RsaPublicKey) -> Result<Vec<u8>> {
        if sig_data.len() != RSA_SIGNATURE_LEN {
            return Err(Error::InvalidSignatureLength(sig_data.len()));
        }

        let modulus_len = public_key.size();
        let c = BigUint::from_bytes_be(sig_data);
        let m = c.modpow(public_key.e(), public_key.n());

        let mut recovered = m.to_bytes_be();
        if recovered.len() < modulus_len {
            let mut padded = vec![0u8; modulus_len - recovered.len()];
            padded.append(&mut recovered);
            recovered = padded;
        }

        // PKCS#1v1.5 Type-1 padding: 0x00 0x01 0xFF..0xFF 0x00 <message>.
        let mut pos = 0;
        if recovered.get(pos) != Some(&0x00) {
            return Ok(recovered);
        }
        pos += 1;
        if recovered.get(pos) != Some(&0x01) {
            return Ok(recovered);
        }
        pos += 1;
        while recovered.get(pos) == Some(&0xff) {
            pos += 1;
        }
        if recovered.get(pos) != Some(&0x00) {
            return Ok(recovered);
        }
        pos += 1;

        Ok(recovered[pos..].to_vec())
    }
}

impl SignatureOracle for RsaRecoveryOracle {
    fn verify_sha256(&self, sig_data: &[u8], public_key: &RsaPublicKey, expected_digest: &[u8; 32]) -> Result<()> {
        let recovered = Self::recover(sig_data, public_key)?;

        let want_len = SIG_ASN1_HEADER.len() + expected_digest.len();
        if recovered.len() != want_len || !recovered.starts_with(&SIG_ASN1_HEADER) || &recovered[SIG_ASN1_HEADER.len()..] != expected_digest.as_slice() {
            return Err(Error::InvalidSignatureLength(recovered.len()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use rsa::pkcs1v15;
    use rsa::sha2::{Digest, Sha256};
    use rsa::signature::hazmat::PrehashSigner;
    use rsa::signature::SignatureEncoding;
    use rsa::RsaPrivateKey;

    fn digest_of(data: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hasher.finalize().into()
    }

    #[test]
    fn recovers_valid_signature() {
        let private_key = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
        let public_key = RsaPublicKey::from(&private_key);
        let digest = digest_of(b"payload hash bytes");

        let signing_key = pkcs1v15::SigningKey::<Sha256>::new(private_key);
        let signature = signing_key.sign_prehash(&digest).unwrap();
        let sig_bytes = signature.to_bytes();

        RsaRecoveryOracle
            .verify_sha256(&sig_bytes, &public_key, &digest)
            .expect("signature should verify");
    }

    #[test]
    fn rejects_digest_mismatch() {
        let private_key = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
        let public_key = RsaPublicKey::from(&private_key);
        let digest = digest_of(b"payload hash bytes");
        let other_digest = digest_of(b"some other bytes");

        let signing_key = pkcs1v15::SigningKey::<Sha256>::new(private_key);
        let signature = signing_key.sign_prehash(&digest).unwrap();
        let sig_bytes = signature.to_bytes();

        let err = RsaRecoveryOracle
            .verify_sha256(&sig_bytes, &public_key, &other_digest)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSignatureLength(_)));
    }

    #[test]
    fn rejects_wrong_length_signature() {
        let private_key = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
        let public_key = RsaPublicKey::from(&private_key);
        let digest = digest_of(b"payload hash bytes");

        let err = RsaRecoveryOracle.verify_sha256(&[0u8; 128], &public_key, &digest).unwrap_err();
        assert!(matches!(err, Error::InvalidSignatureLength(128)));
    }
}
