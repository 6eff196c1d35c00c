#[derive(Debug)]
pub enum Error {
    ReadHeaderMagic(std::io::Error),
    BadHeaderMagic([u8; 4]),
    ReadFileFormatVersion(std::io::Error),
    ReadManifestSize(std::io::Error),
    ReadManifestBytes(std::io::Error),
    ParseManifest(protobuf::Error),
    ReadDataBlob(std::io::Error),
    OpenFile(std::io::Error),
    GetFileMetadata(std::io::Error),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::ReadHeaderMagic(err) => write!(f, "failed to read header magic: {err}"),
            Error::BadHeaderMagic(magic) => write!(f, "bad header magic: {magic:?}"),
            Error::ReadFileFormatVersion(err) => write!(f, "failed to read file format version: {err}"),
            Error::ReadManifestSize(err) => write!(f, "failed to read manifest size: {err}"),
            Error::ReadManifestBytes(err) => write!(f, "failed to read manifest bytes: {err}"),
            Error::ParseManifest(err) => write!(f, "failed to parse manifest: {err}"),
            Error::ReadDataBlob(err) => write!(f, "failed to read data blob: {err}"),
            Error::OpenFile(err) => write!(f, "failed to open payload file: {err}"),
            Error::GetFileMetadata(err) => write!(f, "failed to get payload file metadata: {err}"),
        }
    }
}
