//! Payload normalization and ZIP validation.
//!
//! The marketplace normally answers with a VSIX, which is a ZIP container.
//! Two things go wrong in practice: the package arrives gzip-wrapped even
//! though it is not labelled that way, or the body is not a package at all
//! (an HTML error page for a wrong version or platform). Normalization
//! removes the gzip layer when present and then insists on a ZIP container.

use crate::atomic::{self, ReadChunks};
use crate::error::{Result, VsixError};
use crate::headers::{CONTENT_ENCODING, ResponseHeaders};
use crate::preview::BytePreview;
use camino::Utf8Path;
use flate2::read::MultiGzDecoder;
use log::info;
use std::fs::File;
use std::io::{self, Read};
use zip::ZipArchive;
use zip::result::ZipError;

/// Leading bytes of every gzip member.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// How the raw payload is encoded on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadEncoding {
    /// The payload is gzip-compressed and must be decoded.
    Gzip,
    /// The payload is used as-is.
    Identity,
}

/// Decide whether the raw payload at `path` is gzip-encoded.
///
/// Either signal is sufficient: a `Content-Encoding` header mentioning
/// `gzip`, or the file starting with [`GZIP_MAGIC`].
///
/// # Errors
///
/// Returns [`VsixError::Filesystem`] if the file cannot be read.
pub fn detect_encoding(path: &Utf8Path, headers: &ResponseHeaders) -> Result<PayloadEncoding> {
    let declared_gzip = headers
        .get_all(CONTENT_ENCODING)
        .any(|value| value.to_ascii_lowercase().contains("gzip"));
    if declared_gzip || starts_with_gzip_magic(path)? {
        Ok(PayloadEncoding::Gzip)
    } else {
        Ok(PayloadEncoding::Identity)
    }
}

fn starts_with_gzip_magic(path: &Utf8Path) -> io::Result<bool> {
    let mut magic = Vec::with_capacity(GZIP_MAGIC.len());
    File::open(path)?
        .take(GZIP_MAGIC.len() as u64)
        .read_to_end(&mut magic)?;
    Ok(magic == GZIP_MAGIC)
}

/// Normalize the raw payload at `src` into a ZIP file at `dest`.
///
/// Gzip payloads are decoded in a streaming fashion; everything else is
/// copied byte-for-byte. Both paths go through the atomic writer, and the
/// result is validated with [`ensure_archive`].
///
/// # Errors
///
/// Returns [`VsixError::NotAnArchive`] if the gzip stream is corrupt or the
/// normalized bytes are not a ZIP container, and [`VsixError::Filesystem`]
/// on I/O failures.
pub fn normalize_payload(
    src: &Utf8Path,
    dest: &Utf8Path,
    headers: &ResponseHeaders,
) -> Result<PayloadEncoding> {
    let encoding = detect_encoding(src, headers)?;
    match encoding {
        PayloadEncoding::Gzip => {
            info!("Normalizing: detected gzip-encoded payload; decompressing");
            decompress_gzip(src, dest)?;
        }
        PayloadEncoding::Identity => {
            info!("Normalizing: payload is not gzip-encoded; copying as-is");
            atomic::copy_file(src, dest)?;
        }
    }
    ensure_archive(dest, "no ZIP end of central directory after normalization")?;
    Ok(encoding)
}

fn decompress_gzip(src: &Utf8Path, dest: &Utf8Path) -> Result<u64> {
    let decoder = MultiGzDecoder::new(File::open(src)?);
    let chunks = ReadChunks::new(decoder).map(|chunk| {
        chunk.map_err(|err| match err.kind() {
            io::ErrorKind::InvalidData
            | io::ErrorKind::InvalidInput
            | io::ErrorKind::UnexpectedEof => {
                not_an_archive(src, format!("gzip stream could not be decoded ({err})"))
            }
            _ => VsixError::Filesystem(err),
        })
    });
    atomic::write_chunks(dest, chunks)
}

/// Report whether the file at `path` is a structurally valid ZIP container.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened or read. Structural
/// problems are reported as `Ok(false)`.
pub fn is_archive(path: &Utf8Path) -> io::Result<bool> {
    match ZipArchive::new(File::open(path)?) {
        Ok(_) => Ok(true),
        Err(ZipError::Io(err)) if err.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(ZipError::Io(err)) => Err(err),
        Err(_) => Ok(false),
    }
}

/// Fail with [`VsixError::NotAnArchive`] unless `path` is a ZIP container.
///
/// `reason` describes the stage that expected an archive.
///
/// # Errors
///
/// Returns [`VsixError::NotAnArchive`] with a byte preview for invalid
/// containers, or [`VsixError::Filesystem`] if the file cannot be read.
pub fn ensure_archive(path: &Utf8Path, reason: &str) -> Result<()> {
    if is_archive(path)? {
        Ok(())
    } else {
        Err(not_an_archive(path, reason))
    }
}

/// Build a [`VsixError::NotAnArchive`] previewing the start of `path`.
pub(crate) fn not_an_archive(path: &Utf8Path, reason: impl Into<String>) -> VsixError {
    VsixError::NotAnArchive {
        path: path.to_owned(),
        reason: reason.into(),
        preview: BytePreview::read_from(path.as_std_path()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{gzip_bytes, zip_bytes};
    use camino::Utf8PathBuf;
    use rstest::{fixture, rstest};
    use std::fs;

    const HTML_PAGE: &[u8] = b"<!DOCTYPE html><html><body>Not Found</body></html>";

    struct Scratch {
        _dir: tempfile::TempDir,
        root: Utf8PathBuf,
    }

    impl Scratch {
        fn write(&self, name: &str, bytes: &[u8]) -> Utf8PathBuf {
            let path = self.root.join(name);
            fs::write(&path, bytes).expect("write fixture");
            path
        }
    }

    #[fixture]
    fn scratch() -> Scratch {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("UTF-8 path");
        Scratch { _dir: dir, root }
    }

    fn sample_zip() -> Vec<u8> {
        zip_bytes(&[
            ("extension/package.json", b"{\"name\":\"pkg\"}".as_slice()),
            ("extension.vsixmanifest", b"<PackageManifest/>".as_slice()),
        ])
    }

    #[rstest]
    fn identity_payload_is_copied_byte_for_byte(scratch: Scratch) {
        let raw = sample_zip();
        let src = scratch.write("pkg.vsix.download", &raw);
        let dest = scratch.root.join("pkg.vsix.normalized.zip");

        let encoding =
            normalize_payload(&src, &dest, &ResponseHeaders::new()).expect("normalizes");

        assert_eq!(encoding, PayloadEncoding::Identity);
        assert_eq!(fs::read(&dest).expect("read"), raw);
    }

    #[rstest]
    fn gzip_magic_triggers_decompression(scratch: Scratch) {
        let raw = sample_zip();
        let src = scratch.write("pkg.vsix.download", &gzip_bytes(&raw));
        let dest = scratch.root.join("pkg.vsix.normalized.zip");

        let encoding =
            normalize_payload(&src, &dest, &ResponseHeaders::new()).expect("normalizes");

        assert_eq!(encoding, PayloadEncoding::Gzip);
        assert_eq!(fs::read(&dest).expect("read"), raw);
    }

    #[rstest]
    #[case("gzip")]
    #[case("GZip")]
    #[case("x-gzip")]
    fn content_encoding_header_signals_gzip(scratch: Scratch, #[case] value: &str) {
        let src = scratch.write("payload", b"PK\x03\x04");
        let headers = ResponseHeaders::from_pairs([("content-encoding", value)]);
        assert_eq!(
            detect_encoding(&src, &headers).expect("readable"),
            PayloadEncoding::Gzip
        );
    }

    #[rstest]
    fn plain_payload_without_header_is_identity(scratch: Scratch) {
        let src = scratch.write("payload", b"PK\x03\x04");
        let headers = ResponseHeaders::from_pairs([("content-encoding", "identity")]);
        assert_eq!(
            detect_encoding(&src, &headers).expect("readable"),
            PayloadEncoding::Identity
        );
    }

    #[rstest]
    fn html_error_page_is_not_an_archive(scratch: Scratch) {
        let src = scratch.write("pkg.vsix.download", HTML_PAGE);
        let dest = scratch.root.join("pkg.vsix.normalized.zip");

        let err = normalize_payload(&src, &dest, &ResponseHeaders::new())
            .expect_err("HTML is not a package");

        match err {
            VsixError::NotAnArchive { preview, .. } => {
                assert!(preview.to_string().contains("<!DOCTYPE html>"));
            }
            other => panic!("expected NotAnArchive, got {other:?}"),
        }
    }

    #[rstest]
    fn corrupt_gzip_is_not_an_archive(scratch: Scratch) {
        let mut bytes = GZIP_MAGIC.to_vec();
        bytes.extend_from_slice(b"definitely not deflate data");
        let src = scratch.write("pkg.vsix.download", &bytes);
        let dest = scratch.root.join("pkg.vsix.normalized.zip");

        let err = normalize_payload(&src, &dest, &ResponseHeaders::new())
            .expect_err("corrupt gzip");

        assert!(err.is_not_an_archive(), "got {err:?}");
        assert!(!dest.exists());
    }

    #[rstest]
    #[case::empty(b"".as_slice())]
    #[case::tiny(b"PK".as_slice())]
    #[case::html(HTML_PAGE)]
    fn is_archive_rejects_non_zip_bytes(scratch: Scratch, #[case] bytes: &[u8]) {
        let path = scratch.write("candidate", bytes);
        assert!(!is_archive(&path).expect("readable"));
    }

    #[rstest]
    fn is_archive_accepts_empty_zip(scratch: Scratch) {
        let path = scratch.write("empty.zip", &zip_bytes(&[]));
        assert!(is_archive(&path).expect("readable"));
    }

    #[rstest]
    fn missing_file_is_a_filesystem_error(scratch: Scratch) {
        let result = ensure_archive(&scratch.root.join("absent.zip"), "validation");
        assert!(matches!(result, Err(VsixError::Filesystem(_))));
    }
}
