//! Writing ComicInfo.xml into comic archives.
//!
//! A new archive is staged next to the original, every existing entry is
//! raw-copied into it (compressed bytes, compression method and order
//! untouched) and the metadata entry is written at the position of the old
//! one, or appended. The staged file then replaces the original with a
//! rename, so a failure at any point leaves the original as it was.
//!
//! Concurrent injections into the same archive are not coordinated here.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::comicinfo::COMICINFO_ENTRY;
use crate::{Result, TebeoError};

/// What an injection did to the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Injection {
    /// True when an existing metadata entry was overwritten.
    pub replaced: bool,
    /// Number of entries in the rewritten archive.
    pub entries: usize,
}

/// Writes `xml` into the archive at `archive_path` as `ComicInfo.xml`.
///
/// An existing entry with that name (compared without case, at the archive
/// root) is replaced in place; further duplicates are dropped. The new
/// entry is deflated.
///
/// # Errors
///
/// - [`TebeoError::FileNotFound`] if the archive does not exist
/// - [`TebeoError::MalformedArchive`] if it is not a readable zip container
/// - [`TebeoError::WriteFailure`] if staging or replacing fails
///
/// In every error case the original file is unchanged.
///
/// # Example
///
/// ```rust,no_run
/// use std::path::Path;
/// use tebeo_core::{IssueRecord, generate_comicinfo, inject_comicinfo};
///
/// let xml = generate_comicinfo(&IssueRecord::new("VALERIAN", "1"));
/// let injection = inject_comicinfo(Path::new("valerian_01.cbz"), &xml)?;
/// println!("replaced existing metadata: {}", injection.replaced);
/// # Ok::<(), tebeo_core::TebeoError>(())
/// ```
pub fn inject_comicinfo(archive_path: &Path, xml: &str) -> Result<Injection> {
    if !archive_path.is_file() {
        return Err(TebeoError::FileNotFound(archive_path.to_path_buf()));
    }

    let source = File::open(archive_path)?;
    let permissions = source.metadata()?.permissions();
    let mut archive = ZipArchive::new(source).map_err(|e| malformed(archive_path, e))?;

    let parent = match archive_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut staged = NamedTempFile::new_in(&parent).map_err(|e| write_failure(archive_path, e))?;

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(staged.as_file_mut());
    let mut replaced = false;
    let mut entries = 0;

    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index).map_err(|e| malformed(archive_path, e))?;

        if is_metadata_entry(entry.name()) {
            if replaced {
                tracing::warn!(entry = entry.name(), "dropping duplicate metadata entry");
                continue;
            }
            drop(entry);
            write_entry(&mut writer, xml, options).map_err(|e| write_failure(archive_path, e))?;
            replaced = true;
        } else {
            writer
                .raw_copy_file(entry)
                .map_err(|e| write_failure(archive_path, e.into()))?;
        }
        entries += 1;
    }

    if !replaced {
        write_entry(&mut writer, xml, options).map_err(|e| write_failure(archive_path, e))?;
        entries += 1;
    }

    let staged_file = writer.finish().map_err(|e| write_failure(archive_path, e.into()))?;
    staged_file.sync_all().map_err(|e| write_failure(archive_path, e))?;
    drop(archive);

    fs::set_permissions(staged.path(), permissions).map_err(|e| write_failure(archive_path, e))?;
    staged
        .persist(archive_path)
        .map_err(|e| write_failure(archive_path, e.error))?;

    tracing::info!(path = %archive_path.display(), replaced, entries, "wrote {COMICINFO_ENTRY}");
    Ok(Injection { replaced, entries })
}

/// Reads the metadata entry back out of an archive, if it has one.
pub fn read_comicinfo(archive_path: &Path) -> Result<Option<String>> {
    if !archive_path.is_file() {
        return Err(TebeoError::FileNotFound(archive_path.to_path_buf()));
    }

    let mut archive = ZipArchive::new(File::open(archive_path)?).map_err(|e| malformed(archive_path, e))?;
    let mut found = None;
    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index).map_err(|e| malformed(archive_path, e))?;
        if is_metadata_entry(entry.name()) {
            found = Some(index);
            break;
        }
    }
    let Some(index) = found else {
        return Ok(None);
    };

    let mut entry = archive.by_index(index).map_err(|e| malformed(archive_path, e))?;
    let mut xml = String::new();
    io::Read::read_to_string(&mut entry, &mut xml)?;
    Ok(Some(xml))
}

fn is_metadata_entry(name: &str) -> bool {
    name.eq_ignore_ascii_case(COMICINFO_ENTRY)
}

fn write_entry<W: Write + io::Seek>(writer: &mut ZipWriter<W>, xml: &str, options: SimpleFileOptions) -> io::Result<()> {
    writer.start_file(COMICINFO_ENTRY, options)?;
    writer.write_all(xml.as_bytes())
}

fn malformed(path: &Path, err: zip::result::ZipError) -> TebeoError {
    TebeoError::MalformedArchive { path: path.to_path_buf(), reason: err.to_string() }
}

fn write_failure(path: &Path, source: io::Error) -> TebeoError {
    TebeoError::WriteFailure { path: path.to_path_buf(), source }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_archive(path: &Path, entries: &[(&str, &str, CompressionMethod)]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        for (name, data, method) in entries {
            zip.start_file(*name, SimpleFileOptions::default().compression_method(*method))
                .unwrap();
            zip.write_all(data.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    fn entry_names(path: &Path) -> Vec<String> {
        let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    /// Name, method, CRC, stored bytes and decompressed bytes of every entry.
    type Snapshot = Vec<(String, CompressionMethod, u32, Vec<u8>, Vec<u8>)>;

    fn snapshot(path: &Path) -> Snapshot {
        let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut raw = Vec::new();
                let mut entry = archive.by_index_raw(i).unwrap();
                io::Read::read_to_end(&mut entry, &mut raw).unwrap();
                let (name, method, crc) = (entry.name().to_string(), entry.compression(), entry.crc32());
                drop(entry);

                let mut data = Vec::new();
                io::Read::read_to_end(&mut archive.by_index(i).unwrap(), &mut data).unwrap();
                (name, method, crc, raw, data)
            })
            .collect()
    }

    fn build_mixed_archive(path: &Path, metadata: Option<&str>) {
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(File::create(path).unwrap());

        if let Some(xml) = metadata {
            zip.start_file("ComicInfo.xml", stored).unwrap();
            zip.write_all(xml.as_bytes()).unwrap();
        }
        zip.start_file("001.jpg", stored).unwrap();
        zip.write_all(&[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10]).unwrap();
        zip.add_directory("sub/", stored).unwrap();
        zip.start_file("sub/002.jpg", deflated).unwrap();
        zip.write_all("página dos ".repeat(200).as_bytes()).unwrap();
        zip.start_file("notes.txt", deflated).unwrap();
        zip.write_all(b"scan v2").unwrap();
        zip.finish().unwrap();
    }

    #[test]
    fn test_append_keeps_original_entries_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("comic.cbz");
        build_mixed_archive(&path, None);
        let before = snapshot(&path);

        let injection = inject_comicinfo(&path, "<ComicInfo/>").unwrap();

        let after = snapshot(&path);
        assert_eq!(injection, Injection { replaced: false, entries: before.len() + 1 });
        assert_eq!(after.len(), before.len() + 1);
        assert_eq!(&after[..before.len()], &before[..]);
        assert_eq!(after[before.len()].0, COMICINFO_ENTRY);
        assert_eq!(after[before.len()].4, b"<ComicInfo/>");
    }

    #[test]
    fn test_replace_keeps_other_entries_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("comic.cbz");
        build_mixed_archive(&path, Some("<old/>"));
        let before = snapshot(&path);

        let injection = inject_comicinfo(&path, "<new/>").unwrap();

        let after = snapshot(&path);
        assert_eq!(injection, Injection { replaced: true, entries: before.len() });
        assert_eq!(after.len(), before.len());
        assert_eq!(after[0].0, COMICINFO_ENTRY);
        assert_eq!(after[0].4, b"<new/>");
        assert_eq!(&after[1..], &before[1..]);
        assert!(after.iter().any(|(name, ..)| name == "sub/"));
    }

    #[test]
    fn test_append_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("comic.cbz");
        build_archive(
            &path,
            &[
                ("001.jpg", "page one", CompressionMethod::Stored),
                ("002.jpg", "page two", CompressionMethod::Deflated),
            ],
        );

        let injection = inject_comicinfo(&path, "<ComicInfo/>").unwrap();

        assert_eq!(injection, Injection { replaced: false, entries: 3 });
        let mut archive = ZipArchive::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(archive.len(), 3);
        assert_eq!(archive.by_index(0).unwrap().name(), "001.jpg");
        assert_eq!(archive.by_index(0).unwrap().compression(), CompressionMethod::Stored);
        assert_eq!(archive.by_index(1).unwrap().compression(), CompressionMethod::Deflated);
        let meta = archive.by_index(2).unwrap();
        assert_eq!(meta.name(), COMICINFO_ENTRY);
        assert_eq!(meta.compression(), CompressionMethod::Deflated);
    }

    #[test]
    fn test_replace_in_place_and_drop_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("comic.cbz");
        build_archive(
            &path,
            &[
                ("comicinfo.xml", "<old/>", CompressionMethod::Stored),
                ("001.jpg", "page one", CompressionMethod::Stored),
                ("ComicInfo.xml", "<older/>", CompressionMethod::Stored),
            ],
        );

        let injection = inject_comicinfo(&path, "<new/>").unwrap();

        assert_eq!(injection, Injection { replaced: true, entries: 2 });
        assert_eq!(entry_names(&path), vec!["ComicInfo.xml", "001.jpg"]);
        assert_eq!(read_comicinfo(&path).unwrap().as_deref(), Some("<new/>"));
    }

    #[test]
    fn test_missing_archive() {
        let dir = tempfile::tempdir().unwrap();
        let err = inject_comicinfo(&dir.path().join("nope.cbz"), "<x/>").unwrap_err();
        assert!(matches!(err, TebeoError::FileNotFound(_)));
    }

    #[test]
    fn test_not_a_zip_is_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("comic.cbr");
        fs::write(&path, b"Rar!\x1a\x07\x00 not a zip").unwrap();

        let err = inject_comicinfo(&path, "<x/>").unwrap_err();

        assert!(matches!(err, TebeoError::MalformedArchive { .. }));
        assert_eq!(fs::read(&path).unwrap(), b"Rar!\x1a\x07\x00 not a zip");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_read_comicinfo_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("comic.cbz");
        build_archive(&path, &[("001.jpg", "page", CompressionMethod::Stored)]);
        assert_eq!(read_comicinfo(&path).unwrap(), None);
    }
}
