use std::fmt;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::{HASH_BUFFER_SIZE, TransferError};

/// Lowercase hex SHA-256 of a file's content.
///
/// Used both as the dedup key for uploads and as the blob name in
/// remote storage.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentDigest(String);

impl ContentDigest {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentDigest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<ContentDigest> for String {
    fn from(d: ContentDigest) -> Self {
        d.0
    }
}

/// Computes SHA-256 of `data`.
pub fn checksum_bytes(data: &[u8]) -> ContentDigest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    ContentDigest(hex::encode(hasher.finalize()))
}

/// Streams `reader` through SHA-256 with a fixed-size buffer.
pub fn hash_reader<R: Read>(reader: &mut R) -> std::io::Result<ContentDigest> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_BUFFER_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(ContentDigest(hex::encode(hasher.finalize())))
}

/// Computes SHA-256 of an entire file without loading it into memory.
pub fn hash_file(path: &Path) -> Result<ContentDigest, TransferError> {
    let mut file = std::fs::File::open(path).map_err(|e| TransferError::io(path, e))?;
    hash_reader(&mut file).map_err(|e| TransferError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn checksum_bytes_deterministic() {
        let c1 = checksum_bytes(b"hello world");
        let c2 = checksum_bytes(b"hello world");
        assert_eq!(c1, c2);
        assert_eq!(c1.as_str().len(), 64); // SHA-256 = 64 hex chars.
    }

    #[test]
    fn checksum_known_vector() {
        assert_eq!(
            checksum_bytes(b"").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            checksum_bytes(b"hi").as_str(),
            "8f434346648f6b96df89dda901c5176b10a6d83961dd3c1ac88b59b2dc327aa4"
        );
    }

    #[test]
    fn checksum_is_lowercase_hex() {
        let d = checksum_bytes(b"Case");
        assert!(d.as_str().chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
    }

    #[test]
    fn hash_file_matches_bytes() {
        let dir = TempDir::new().unwrap();
        let data = b"test content for checksum";
        let path = dir.path().join("test.bin");
        std::fs::write(&path, data).unwrap();

        assert_eq!(hash_file(&path).unwrap(), checksum_bytes(data));
    }

    #[test]
    fn hash_file_larger_than_buffer() {
        let dir = TempDir::new().unwrap();
        let data: Vec<u8> = (0..HASH_BUFFER_SIZE * 3 + 17).map(|i| (i % 251) as u8).collect();
        let path = dir.path().join("big.bin");
        std::fs::write(&path, &data).unwrap();

        assert_eq!(hash_file(&path).unwrap(), checksum_bytes(&data));
    }

    #[test]
    fn hash_missing_file_reports_path() {
        let err = hash_file(Path::new("/nonexistent/asset.bin")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/asset.bin"));
    }
}
