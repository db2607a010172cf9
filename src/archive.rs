//! Read access to the compressed daily price archives.
//!
//! [`PriceArchive`] is the narrow view the extractor needs: list entry names
//! without decompressing, then unpack a chosen subset into a directory.
//! [`SevenZipArchive`] backs it with the 7z files published by the archive
//! host.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use sevenz_rust2::{ArchiveReader, Password};

use crate::error::Result;

/// A container of named entries that can be listed and selectively unpacked.
pub trait PriceArchive {
    /// Names of all file entries, as stored in the archive.
    fn entry_names(&self) -> Vec<String>;

    /// Unpack the named entries under `dest`, keeping their relative paths.
    ///
    /// Names not present in the archive are ignored.
    fn extract_entries(&mut self, entries: &[String], dest: &Path) -> Result<()>;
}

/// A 7z archive on disk.
pub struct SevenZipArchive {
    path: PathBuf,
    names: Vec<String>,
}

impl SevenZipArchive {
    /// Open an archive and read its entry listing.
    ///
    /// Only the archive header is read; nothing is decompressed.
    pub fn open(path: &Path) -> Result<Self> {
        let reader = ArchiveReader::open(path, Password::empty())?;
        let names = reader
            .archive()
            .files
            .iter()
            .filter(|entry| !entry.is_directory())
            .map(|entry| entry.name().to_string())
            .collect();
        Ok(Self {
            path: path.to_path_buf(),
            names,
        })
    }
}

impl PriceArchive for SevenZipArchive {
    fn entry_names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn extract_entries(&mut self, entries: &[String], dest: &Path) -> Result<()> {
        let wanted: HashSet<&str> = entries.iter().map(String::as_str).collect();
        let mut reader = ArchiveReader::open(&self.path, Password::empty())?;

        reader.for_each_entries(|entry, data| {
            if entry.is_directory() || !wanted.contains(entry.name()) {
                // Solid blocks are shared between entries, so skipped data
                // still has to be consumed.
                io::copy(data, &mut io::sink())?;
                return Ok(true);
            }
            let out_path = dest.join(entry_relative_path(entry.name()));
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut writer = BufWriter::new(File::create(&out_path)?);
            io::copy(data, &mut writer)?;
            writer.flush()?;
            Ok(true)
        })?;

        Ok(())
    }
}

/// Relative on-disk path of an archive entry, ignoring absolute or parent
/// components so an entry can never escape the destination directory.
pub fn entry_relative_path(name: &str) -> PathBuf {
    name.replace('\\', "/")
        .split('/')
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .collect()
}
