//! Streaming, atomic file writes.
//!
//! Bytes are written to a sibling `.part` file which is renamed onto the
//! destination only once the whole stream has been written and synced.
//! Readers of the destination therefore see either the previous file or the
//! complete new one, never a truncated write.

use crate::error::{Result, VsixError};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};

/// Chunk size used when streaming from a reader.
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Suffix of the in-progress sibling file.
pub const PART_SUFFIX: &str = ".part";

/// Path of the in-progress sibling for `dest`.
#[must_use]
pub fn part_path(dest: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{dest}{PART_SUFFIX}"))
}

/// Write every chunk produced by `chunks` to `dest` atomically.
///
/// Parent directories are created as needed and an existing destination is
/// replaced. Returns the number of bytes written.
///
/// # Errors
///
/// Propagates the first error yielded by `chunks` and any I/O failure while
/// creating, writing, syncing, or renaming the `.part` file. On failure the
/// `.part` file is left in place and `dest` is untouched.
pub fn write_chunks<I, B, E>(dest: &Utf8Path, chunks: I) -> Result<u64>
where
    I: IntoIterator<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    VsixError: From<E>,
{
    let tmp = part_path(dest);
    if let Some(parent) = dest.parent().filter(|p| !p.as_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(&tmp)?);
    let mut total: u64 = 0;
    for chunk in chunks {
        let chunk = chunk?;
        let bytes = chunk.as_ref();
        writer.write_all(bytes)?;
        total += bytes.len() as u64;
    }

    let file = writer.into_inner().map_err(io::IntoInnerError::into_error)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp, dest)?;
    Ok(total)
}

/// Stream `reader` into `dest` atomically in [`CHUNK_SIZE`] chunks.
///
/// # Errors
///
/// Read failures surface as [`VsixError::Filesystem`]; see [`write_chunks`]
/// for the write side.
pub fn write_reader<R: Read>(dest: &Utf8Path, reader: R) -> Result<u64> {
    write_chunks(dest, ReadChunks::new(reader))
}

/// Copy the file at `src` onto `dest` atomically.
///
/// # Errors
///
/// Returns [`VsixError::Filesystem`] if `src` cannot be opened or read, or if
/// the write to `dest` fails.
pub fn copy_file(src: &Utf8Path, dest: &Utf8Path) -> Result<u64> {
    write_reader(dest, File::open(src)?)
}

/// Iterator adapter yielding bounded chunks from a reader until EOF.
///
/// Interrupted reads are retried; any other read error is yielded once and
/// ends the iteration.
#[derive(Debug)]
pub struct ReadChunks<R> {
    reader: R,
    chunk_size: usize,
    done: bool,
}

impl<R: Read> ReadChunks<R> {
    /// Chunk `reader` using [`CHUNK_SIZE`].
    pub const fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, CHUNK_SIZE)
    }

    /// Chunk `reader` using `chunk_size` (at least one byte).
    pub const fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size: if chunk_size == 0 { 1 } else { chunk_size },
            done: false,
        }
    }
}

impl<R: Read> Iterator for ReadChunks<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut buffer = vec![0_u8; self.chunk_size];
        loop {
            match self.reader.read(&mut buffer) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(read) => {
                    buffer.truncate(read);
                    return Some(Ok(buffer));
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn scratch() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("UTF-8 path");
        (dir, root)
    }

    /// Yields `good` chunks of `chunk` and then a failure.
    fn failing_after(
        good: usize,
        chunk: &'static [u8],
    ) -> impl Iterator<Item = std::result::Result<&'static [u8], io::Error>> {
        (0..=good).map(move |index| {
            if index < good {
                Ok(chunk)
            } else {
                Err(io::Error::other("connection reset"))
            }
        })
    }

    #[test]
    fn writes_all_chunks_and_reports_total() {
        let (_dir, root) = scratch();
        let dest = root.join("nested/deeper/out.bin");
        let chunks: Vec<std::result::Result<&[u8], io::Error>> =
            vec![Ok(&b"abc"[..]), Ok(&b"defg"[..])];

        let total = write_chunks(&dest, chunks).expect("write succeeds");

        assert_eq!(total, 7);
        assert_eq!(fs::read(&dest).expect("read dest"), b"abcdefg");
        assert!(!part_path(&dest).exists());
    }

    #[test]
    fn replaces_existing_destination() {
        let (_dir, root) = scratch();
        let dest = root.join("out.bin");
        fs::write(&dest, b"old contents").expect("seed dest");

        write_reader(&dest, &b"new"[..]).expect("write succeeds");

        assert_eq!(fs::read(&dest).expect("read dest"), b"new");
    }

    #[rstest]
    #[case::first_chunk(0)]
    #[case::mid_stream(3)]
    fn interrupted_write_leaves_absent_destination_absent(#[case] good: usize) {
        let (_dir, root) = scratch();
        let dest = root.join("out.bin");

        let result = write_chunks(&dest, failing_after(good, b"chunk"));

        assert!(matches!(result, Err(VsixError::Filesystem(_))));
        assert!(!dest.exists());
        assert!(part_path(&dest).exists(), "temporary file is left for inspection");
    }

    #[rstest]
    #[case::first_chunk(0)]
    #[case::mid_stream(3)]
    fn interrupted_write_preserves_previous_destination(#[case] good: usize) {
        let (_dir, root) = scratch();
        let dest = root.join("out.bin");
        fs::write(&dest, b"previous release").expect("seed dest");

        let result = write_chunks(&dest, failing_after(good, b"chunk"));

        assert!(result.is_err());
        assert_eq!(fs::read(&dest).expect("read dest"), b"previous release");
    }

    #[test]
    fn copy_file_duplicates_bytes() {
        let (_dir, root) = scratch();
        let src = root.join("src.bin");
        let dest = root.join("dest.bin");
        fs::write(&src, [0_u8, 1, 2, 255]).expect("seed src");

        let total = copy_file(&src, &dest).expect("copy succeeds");

        assert_eq!(total, 4);
        assert_eq!(fs::read(&dest).expect("read"), fs::read(&src).expect("read"));
    }

    #[test]
    fn copy_file_from_missing_source_fails() {
        let (_dir, root) = scratch();
        let result = copy_file(&root.join("absent"), &root.join("dest"));
        assert!(matches!(result, Err(VsixError::Filesystem(_))));
        assert!(!root.join("dest").exists());
    }

    #[test]
    fn read_chunks_respects_chunk_size() {
        let data = [7_u8; 10];
        let chunks: Vec<Vec<u8>> = ReadChunks::with_chunk_size(&data[..], 4)
            .collect::<io::Result<_>>()
            .expect("in-memory read");
        let sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }
}
