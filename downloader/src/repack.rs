//! Canonical re-encoding of ZIP containers.
//!
//! Repacking decodes every entry of a validated archive and writes it into a
//! fresh container with deflate compression, so the final artefact always
//! comes from the same encoder regardless of what produced the upstream
//! bytes. Entry metadata the writer can express is carried over: name,
//! entry kind (file, directory or symlink), modification time, unix
//! permission bits, extra-field records, and the raw archive comment.

use crate::atomic::{self, ReadChunks};
use crate::error::{Result, VsixError};
use crate::normalize::{ensure_archive, not_an_archive};
use camino::Utf8Path;
use log::{debug, info};
use std::fs::{self, File};
use std::io::{Read, Write};
use zip::result::ZipError;
use zip::write::FullFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// Extra-field header IDs managed by the ZIP writer itself.
///
/// `0x0001` is the Zip64 extended information record and `0x9901` the AES
/// encryption record; both are regenerated by the writer when needed.
const WRITER_MANAGED_EXTRA_IDS: [u16; 2] = [0x0001, 0x9901];

/// Entries at or above this size need Zip64 records.
const LARGE_FILE_THRESHOLD: u64 = 0xFFFF_FFFF;

/// Counts reported after a successful repack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepackSummary {
    /// Number of entries written, directories included.
    pub entries: usize,
    /// Total uncompressed bytes written.
    pub bytes: u64,
}

/// Per-entry metadata captured from the source archive.
#[derive(Debug)]
struct EntryMetadata {
    name: String,
    is_dir: bool,
    is_symlink: bool,
    size: u64,
    modified: Option<DateTime>,
    unix_mode: Option<u32>,
    extra: Vec<u8>,
}

/// Re-encode the ZIP archive at `src` into a fresh container at `dest`.
///
/// The new container is written to `{dest}.part` and renamed into place, so
/// `dest` is never observed half-written.
///
/// # Errors
///
/// Returns [`VsixError::NotAnArchive`] if `src` is not a ZIP container or an
/// entry cannot be decoded, and [`VsixError::Filesystem`] on I/O failures.
pub fn repack_archive(src: &Utf8Path, dest: &Utf8Path) -> Result<RepackSummary> {
    ensure_archive(src, "cannot repack: source is not a ZIP container")?;
    let mut archive = ZipArchive::new(File::open(src)?).map_err(|e| zip_failure(src, e))?;

    let tmp = atomic::part_path(dest);
    if let Some(parent) = dest.parent().filter(|p| !p.as_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    info!("Repacking {src} into a canonical VSIX container");
    let mut writer = ZipWriter::new(File::create(&tmp)?);
    writer.set_raw_comment(archive.comment().into());

    let mut summary = RepackSummary::default();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|e| zip_failure(src, e))?;
        let metadata = EntryMetadata {
            name: entry.name().to_owned(),
            is_dir: entry.is_dir(),
            is_symlink: entry.is_symlink(),
            size: entry.size(),
            modified: entry.last_modified(),
            unix_mode: entry.unix_mode(),
            extra: entry.extra_data().map(<[u8]>::to_vec).unwrap_or_default(),
        };
        let options = entry_options(src, &metadata)?;

        if metadata.is_dir {
            debug!("Repacking directory {}", metadata.name);
            writer
                .add_directory(metadata.name.as_str(), options)
                .map_err(|e| zip_failure(src, e))?;
        } else if metadata.is_symlink {
            let target = read_symlink_target(src, &metadata.name, &mut entry)?;
            debug!("Repacking symlink {} -> {target}", metadata.name);
            summary.bytes += target.len() as u64;
            writer
                .add_symlink(metadata.name.as_str(), target, options)
                .map_err(|e| zip_failure(src, e))?;
        } else {
            debug!("Repacking {} ({} bytes)", metadata.name, metadata.size);
            writer
                .start_file(metadata.name.as_str(), options)
                .map_err(|e| zip_failure(src, e))?;
            for chunk in ReadChunks::new(&mut entry) {
                let chunk = chunk.map_err(|err| {
                    not_an_archive(
                        src,
                        format!("entry {} could not be decoded ({err})", metadata.name),
                    )
                })?;
                writer.write_all(&chunk)?;
                summary.bytes += chunk.len() as u64;
            }
        }
        summary.entries += 1;
    }

    let file = writer.finish().map_err(|e| zip_failure(src, e))?;
    file.sync_all()?;
    drop(file);
    fs::rename(&tmp, dest)?;

    info!(
        "Repacked {} entries ({} bytes uncompressed) into {dest}",
        summary.entries, summary.bytes
    );
    Ok(summary)
}

/// Writer options reproducing the metadata of one source entry.
fn entry_options(src: &Utf8Path, metadata: &EntryMetadata) -> Result<FullFileOptions<'static>> {
    let mut options = FullFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(metadata.size >= LARGE_FILE_THRESHOLD);
    if let Some(modified) = metadata.modified {
        options = options.last_modified_time(modified);
    }
    if let Some(mode) = metadata.unix_mode {
        options = options.unix_permissions(mode);
    }
    for (header_id, data) in split_extra_fields(&metadata.extra) {
        if WRITER_MANAGED_EXTRA_IDS.contains(&header_id) {
            continue;
        }
        options
            .add_extra_data(header_id, data.to_vec().into_boxed_slice(), false)
            .map_err(|e| zip_failure(src, e))?;
    }
    Ok(options)
}

/// Decode the link target stored as a symlink entry's contents.
fn read_symlink_target(src: &Utf8Path, name: &str, entry: &mut impl Read) -> Result<String> {
    let mut raw = Vec::new();
    entry.read_to_end(&mut raw).map_err(|err| {
        not_an_archive(src, format!("symlink {name} could not be decoded ({err})"))
    })?;
    String::from_utf8(raw)
        .map_err(|_| not_an_archive(src, format!("symlink {name} has a non-UTF-8 target")))
}

/// Split a raw extra-field block into `(header_id, data)` records.
///
/// Parsing stops at the first truncated record; trailing garbage is dropped.
fn split_extra_fields(mut raw: &[u8]) -> Vec<(u16, &[u8])> {
    let mut fields = Vec::new();
    while let [id_lo, id_hi, len_lo, len_hi, rest @ ..] = raw {
        let header_id = u16::from_le_bytes([*id_lo, *id_hi]);
        let len = usize::from(u16::from_le_bytes([*len_lo, *len_hi]));
        let Some((data, tail)) = rest.split_at_checked(len) else {
            break;
        };
        fields.push((header_id, data));
        raw = tail;
    }
    fields
}

/// Map a ZIP library error, keeping I/O failures distinct from bad archives.
fn zip_failure(path: &Utf8Path, err: ZipError) -> VsixError {
    match err {
        ZipError::Io(io) => VsixError::Filesystem(io),
        other => not_an_archive(path, other.to_string()),
    }
}
