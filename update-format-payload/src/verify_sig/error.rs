#[derive(Debug)]
pub enum Error {
    ReadPublicKey(std::io::Error),
    DeserialisePkcs1(rsa::pkcs1::Error),
    DecodePublicKey(rsa::pkcs8::spki::Error),
    InvalidSignatureLength(usize),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::ReadPublicKey(err) => write!(f, "failed to read public key: {err}"),
            Error::DeserialisePkcs1(err) => write!(f, "failed to deserialise PKCS1 PEM: {err}"),
            Error::DecodePublicKey(err) => write!(f, "failed to decode public key: {err}"),
            Error::InvalidSignatureLength(len) => write!(f, "signature size ({len}) not as expected (256)"),
        }
    }
}
