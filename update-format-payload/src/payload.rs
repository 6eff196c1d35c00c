//! The parsed-payload handle consumed by the checker.
//!
//! This is the "payload source" collaborator: it turns header + manifest +
//! data-blob bytes into typed values and back, and nothing more. It does not
//! validate payload semantics -- that's the checker's job.

use std::fs::File;
use std::os::unix::fs::FileExt;
use std::path::Path;

use log::debug;
use protobuf::Message;
use sha2::{Digest, Sha256};

use crate::proto::update_metadata::DeltaArchiveManifest;
use crate::{Error, Result};

const DELTA_UPDATE_HEADER_SIZE: u64 = 4 + 8 + 8;
const DELTA_UPDATE_FILE_MAGIC: &[u8; 4] = b"CrAU";

/// The fixed-size binary header preceding the manifest.
#[derive(Debug, Clone, Copy)]
pub struct PayloadHeader {
    pub version: u64,
    pub manifest_len: u64,
}

/// A parsed update payload: header, manifest, and a handle onto the
/// data section and the running manifest hash.
pub struct Payload {
    pub header: PayloadHeader,
    pub manifest: DeltaArchiveManifest,
    pub manifest_hasher: Sha256,
    /// Byte offset of the data section within the payload file.
    pub data_offset: u64,
    payload_file: File,
}

impl Payload {
    /// Opens and parses a payload file: header, then manifest.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(Error::OpenFile)?;

        let mut magic = [0u8; 4];
        file.read_exact_at(&mut magic, 0).map_err(Error::ReadHeaderMagic)?;
        if &magic != DELTA_UPDATE_FILE_MAGIC {
            return Err(Error::BadHeaderMagic(magic));
        }

        let mut buf = [0u8; 8];
        file.read_exact_at(&mut buf, magic.len() as u64).map_err(Error::ReadFileFormatVersion)?;
        let version = u64::from_be_bytes(buf);

        file.read_exact_at(&mut buf, DELTA_UPDATE_HEADER_SIZE - 8).map_err(Error::ReadManifestSize)?;
        let manifest_len = u64::from_be_bytes(buf);

        let mut manifest_bytes = vec![0u8; manifest_len as usize];
        file.read_exact_at(&mut manifest_bytes, DELTA_UPDATE_HEADER_SIZE).map_err(Error::ReadManifestBytes)?;

        let manifest = DeltaArchiveManifest::parse_from_bytes(&manifest_bytes).map_err(Error::ParseManifest)?;

        let mut manifest_hasher = Sha256::new();
        manifest_hasher.update(magic);
        manifest_hasher.update(version.to_be_bytes());
        manifest_hasher.update(manifest_len.to_be_bytes());
        manifest_hasher.update(&manifest_bytes);

        debug!("opened payload {path:?}: version {version}, manifest_len {manifest_len}");

        Ok(Payload {
            header: PayloadHeader { version, manifest_len },
            manifest,
            manifest_hasher,
            data_offset: DELTA_UPDATE_HEADER_SIZE + manifest_len,
            payload_file: file,
        })
    }

    /// Total size, in bytes, of the payload file on disk.
    pub fn file_size(&self) -> Result<u64> {
        Ok(self.payload_file.metadata().map_err(Error::GetFileMetadata)?.len())
    }

    /// Reads `length` bytes starting at `offset` within the data section.
    pub fn read_data_blob(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; length as usize];
        self.payload_file
            .read_exact_at(&mut buf, self.data_offset + offset)
            .map_err(Error::ReadDataBlob)?;
        Ok(buf)
    }

    /// Feeds `length` bytes starting at data-section offset `start` into `hasher`,
    /// without materializing the whole range in memory at once.
    pub fn hash_data_range(&self, start: u64, length: u64, hasher: &mut Sha256) -> Result<()> {
        const CHUNK: usize = 1 << 20;
        let mut remaining = length;
        let mut offset = self.data_offset + start;
        let mut buf = vec![0u8; (length as usize).min(CHUNK).max(1)];
        while remaining > 0 {
            let want = (remaining as usize).min(buf.len());
            self.payload_file
                .read_exact_at(&mut buf[..want], offset)
                .map_err(Error::ReadDataBlob)?;
            hasher.update(&buf[..want]);
            offset += want as u64;
            remaining -= want as u64;
        }
        Ok(())
    }
}
