//! MIME type resolution for uploaded assets.

use std::path::Path;

use tokio::io::AsyncReadExt;

use crate::error::DeployError;

/// Number of leading bytes inspected when the extension is unknown.
pub const SNIFF_LEN: usize = 1024;

/// Resolves a MIME type for `filename` given the first bytes of its content.
///
/// Extension lookup wins, then magic-byte sniffing on `prefix`, then
/// `text/plain` for a non-empty pure-ASCII prefix. `None` leaves the type
/// to the remote default.
pub fn resolve_content_type(filename: &str, prefix: &[u8]) -> Option<&'static str> {
    by_extension(filename)
        .or_else(|| sniff(prefix))
        .or_else(|| (!prefix.is_empty() && prefix.is_ascii()).then_some("text/plain"))
}

/// Resolves the MIME type of the file at `path`, reading at most
/// [`SNIFF_LEN`] bytes and only when the extension is not recognized.
pub async fn detect_for_file(path: &Path) -> Result<Option<&'static str>, DeployError> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if let Some(known) = by_extension(name) {
        return Ok(Some(known));
    }

    let io_err = |source| DeployError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = tokio::fs::File::open(path).await.map_err(io_err)?;
    let mut prefix = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64)
        .read_to_end(&mut prefix)
        .await
        .map_err(io_err)?;

    Ok(resolve_content_type(name, &prefix))
}

fn by_extension(filename: &str) -> Option<&'static str> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("html" | "htm") => Some("text/html"),
        Some("css") => Some("text/css"),
        Some("js" | "mjs") => Some("application/javascript"),
        Some("json" | "map") => Some("application/json"),
        Some("txt") => Some("text/plain"),
        Some("md") => Some("text/markdown"),
        Some("csv") => Some("text/csv"),
        Some("xml") => Some("application/xml"),
        Some("svg") => Some("image/svg+xml"),
        Some("png") => Some("image/png"),
        Some("jpg" | "jpeg") => Some("image/jpeg"),
        Some("gif") => Some("image/gif"),
        Some("webp") => Some("image/webp"),
        Some("ico") => Some("image/x-icon"),
        Some("bmp") => Some("image/bmp"),
        Some("woff") => Some("font/woff"),
        Some("woff2") => Some("font/woff2"),
        Some("ttf") => Some("font/ttf"),
        Some("otf") => Some("font/otf"),
        Some("mp3") => Some("audio/mpeg"),
        Some("wav") => Some("audio/wav"),
        Some("ogg") => Some("audio/ogg"),
        Some("mp4") => Some("video/mp4"),
        Some("webm") => Some("video/webm"),
        Some("pdf") => Some("application/pdf"),
        Some("zip") => Some("application/zip"),
        Some("gz") => Some("application/gzip"),
        Some("wasm") => Some("application/wasm"),
        _ => None,
    }
}

fn sniff(prefix: &[u8]) -> Option<&'static str> {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"%PDF-", "application/pdf"),
        (b"PK\x03\x04", "application/zip"),
        (b"\x1f\x8b", "application/gzip"),
        (b"\x00asm", "application/wasm"),
        (b"wOFF", "font/woff"),
        (b"wOF2", "font/woff2"),
        (b"OTTO", "font/otf"),
        (b"OggS", "audio/ogg"),
        (b"ID3", "audio/mpeg"),
        (b"\x00\x00\x01\x00", "image/x-icon"),
        (b"BM", "image/bmp"),
    ];

    if let Some((_, mime)) = SIGNATURES.iter().find(|(magic, _)| prefix.starts_with(magic)) {
        return Some(*mime);
    }

    // RIFF containers carry their format at offset 8.
    if prefix.len() >= 12 && prefix.starts_with(b"RIFF") {
        match &prefix[8..12] {
            b"WEBP" => return Some("image/webp"),
            b"WAVE" => return Some("audio/wav"),
            _ => {}
        }
    }
    if prefix.len() >= 8 && &prefix[4..8] == b"ftyp" {
        return Some("video/mp4");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_wins_over_content() {
        assert_eq!(resolve_content_type("index.html", b"\x89PNG\r\n\x1a\n"), Some("text/html"));
        assert_eq!(resolve_content_type("app.JS", b""), Some("application/javascript"));
        assert_eq!(resolve_content_type("logo.PNG", b""), Some("image/png"));
    }

    #[test]
    fn magic_bytes_when_extension_unknown() {
        assert_eq!(resolve_content_type("blob", b"\x89PNG\r\n\x1a\n\0\0"), Some("image/png"));
        assert_eq!(resolve_content_type("blob", b"GIF89a..."), Some("image/gif"));
        assert_eq!(resolve_content_type("blob", b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(resolve_content_type("blob", b"\0\0\0\x18ftypmp42"), Some("video/mp4"));
    }

    #[test]
    fn ascii_falls_back_to_plain_text() {
        assert_eq!(resolve_content_type("LICENSE", b"MIT License\n"), Some("text/plain"));
        assert_eq!(resolve_content_type("data.bin", b"plain words"), Some("text/plain"));
    }

    #[test]
    fn binary_and_empty_stay_unset() {
        assert_eq!(resolve_content_type("data.bin", &[0xde, 0xad, 0xbe, 0xef, 0x80]), None);
        assert_eq!(resolve_content_type("empty", b""), None);
    }

    #[test]
    fn resolution_is_deterministic() {
        let prefix = b"\xff\xd8\xff\xe0 jfif";
        let first = resolve_content_type("photo", prefix);
        assert_eq!(first, Some("image/jpeg"));
        assert_eq!(resolve_content_type("photo", prefix), first);
    }

    #[tokio::test]
    async fn detects_from_file_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("README");
        std::fs::write(&text, "hello world\n").unwrap();
        assert_eq!(detect_for_file(&text).await.unwrap(), Some("text/plain"));

        let mut big = vec![0x80u8; 4096];
        big[..4].copy_from_slice(b"%PDF");
        big[4] = b'-';
        let pdf = dir.path().join("doc");
        std::fs::write(&pdf, &big).unwrap();
        assert_eq!(detect_for_file(&pdf).await.unwrap(), Some("application/pdf"));
    }

    #[tokio::test]
    async fn known_extension_skips_reading() {
        // The file does not exist; the extension alone decides.
        let path = Path::new("/nonexistent/site.css");
        assert_eq!(detect_for_file(path).await.unwrap(), Some("text/css"));
    }

    #[tokio::test]
    async fn unreadable_file_is_an_error() {
        let path = Path::new("/nonexistent/blob");
        assert!(matches!(
            detect_for_file(path).await,
            Err(DeployError::Io { .. })
        ));
    }
}
