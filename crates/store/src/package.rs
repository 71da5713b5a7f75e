//! In-memory Open Document package
//!
//! An Open Document file (`.odt`, `.ods`, `.odg`, ...) is a ZIP archive whose
//! entries are XML streams (`content.xml`, `styles.xml`, `meta.xml`, ...) and
//! binary resources (`Pictures/`, fonts, thumbnails). [`Package`] unpacks every
//! entry into memory, lets callers replace entries in place, and repacks the
//! whole set into a new archive.

use crate::error::{Result, StoreError};
use std::fs::{self, File};
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::{Component, Path};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use zip::read::ZipArchive;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Name of the entry holding the package media type
pub const MIMETYPE_ENTRY: &str = "mimetype";
/// Main content stream
pub const CONTENT_ENTRY: &str = "content.xml";
/// Style definitions stream
pub const STYLES_ENTRY: &str = "styles.xml";

/// Upper bound on the buffer reserved from an entry's declared size
const MAX_PREALLOC: usize = 16 * 1024 * 1024;

/// Declared sizes come from the archive and are not trusted
fn read_capacity(declared: u64) -> usize {
    usize::try_from(declared).map_or(MAX_PREALLOC, |size| size.min(MAX_PREALLOC))
}

/// A single named byte stream inside a package
#[derive(Debug, Clone, PartialEq)]
pub struct PackageEntry {
    name: String,
    data: Vec<u8>,
    compression: CompressionMethod,
}

impl PackageEntry {
    /// Entry path inside the archive
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entry contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Compression method the entry was read with (or will be written with)
    pub fn compression(&self) -> CompressionMethod {
        self.compression
    }
}

/// A fully materialized package: entry name -> bytes, in archive order
#[derive(Debug, Clone, Default)]
pub struct Package {
    entries: Vec<PackageEntry>,
}

impl Package {
    /// Create an empty package
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a package from a file on disk
    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        debug!(archive = %path.display(), "opening package");
        Self::read_from_reader(BufReader::new(file))
    }

    /// Read a package from an in-memory archive
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::read_from_reader(Cursor::new(bytes))
    }

    /// Read a package from any seekable reader
    ///
    /// Directory entries are skipped. The archive handle is dropped before
    /// returning, on success and on error.
    pub fn read_from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut package = Self::new();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }

            let name = file.name().to_string();
            let expected = file.size();
            let compression = file.compression();

            let mut data = Vec::with_capacity(read_capacity(expected));
            let read = file.read_to_end(&mut data)?;
            if read as u64 != expected {
                warn!(
                    entry = %name,
                    expected,
                    read,
                    "not all bytes read from package entry"
                );
            }
            debug!(entry = %name, bytes = read, "read package entry");

            package.put(name, data, compression);
        }

        Ok(package)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the package has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check whether an entry exists
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Entry names, in archive order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// All entries, in archive order
    pub fn entries(&self) -> &[PackageEntry] {
        &self.entries
    }

    /// Get the contents of an entry
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.position(name).map(|i| self.entries[i].data.as_slice())
    }

    /// Get the contents of an entry as UTF-8 text
    pub fn get_str(&self, name: &str) -> Result<&str> {
        let data = self.get(name).ok_or_else(|| StoreError::missing_entry(name))?;
        std::str::from_utf8(data).map_err(|source| StoreError::Utf8 {
            entry: name.to_string(),
            source,
        })
    }

    /// Insert or replace an entry
    ///
    /// A replaced entry keeps its position and compression method; a new entry
    /// is appended and will be deflated.
    pub fn insert(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.put(name.into(), data.into(), CompressionMethod::Deflated);
    }

    /// Remove an entry, returning its contents
    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        self.position(name).map(|i| self.entries.remove(i).data)
    }

    /// Total uncompressed size of all entries
    pub fn total_size(&self) -> usize {
        self.entries.iter().map(|e| e.data.len()).sum()
    }

    /// Write the package to a file
    ///
    /// The archive is assembled in a temporary file next to `path` and renamed
    /// over it only once fully written, so a failure never leaves a truncated
    /// output behind.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        self.write_to_writer(tmp.as_file_mut())?;
        tmp.as_file().sync_all()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(tmp.path(), fs::Permissions::from_mode(0o644))?;
        }

        tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
        debug!(archive = %path.display(), entries = self.len(), "package written");
        Ok(())
    }

    /// Serialize the package into an in-memory archive
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let cursor = self.write_to_writer(Cursor::new(Vec::new()))?;
        Ok(cursor.into_inner())
    }

    /// Write the package to a writer, returning the writer once the archive
    /// is finished
    ///
    /// `mimetype` goes first and uncompressed, as Open Document readers sniff
    /// it at a fixed offset. Every other entry keeps its archive order.
    pub fn write_to_writer<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let mut zip = ZipWriter::new(writer);

        let mimetype = self.entries.iter().filter(|e| e.name == MIMETYPE_ENTRY);
        let rest = self.entries.iter().filter(|e| e.name != MIMETYPE_ENTRY);

        for entry in mimetype.chain(rest) {
            let method = if entry.name == MIMETYPE_ENTRY
                || entry.compression == CompressionMethod::Stored
            {
                CompressionMethod::Stored
            } else {
                CompressionMethod::Deflated
            };
            let options = SimpleFileOptions::default().compression_method(method);

            zip.start_file(entry.name.as_str(), options)?;
            zip.write_all(&entry.data)?;
            debug!(entry = %entry.name, bytes = entry.data.len(), "wrote package entry");
        }

        Ok(zip.finish()?)
    }

    /// Extract every entry below `folder`, creating intermediate directories
    pub fn extract_to(&self, folder: impl AsRef<Path>) -> Result<()> {
        let folder = folder.as_ref();
        for entry in &self.entries {
            let relative = Path::new(&entry.name);
            let enclosed = relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
            if !enclosed {
                return Err(StoreError::InvalidEntryName(entry.name.clone()));
            }

            let target = folder.join(relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, &entry.data)?;
        }
        Ok(())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    fn put(&mut self, name: String, data: Vec<u8>, compression: CompressionMethod) {
        match self.position(&name) {
            Some(i) => self.entries[i].data = data,
            None => self.entries.push(PackageEntry {
                name,
                data,
                compression,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_package() -> Package {
        let mut package = Package::new();
        package.insert("content.xml", "<office:document-content/>");
        package.insert(MIMETYPE_ENTRY, "application/vnd.oasis.opendocument.text");
        package.insert("Pictures/logo.png", vec![0x89, b'P', b'N', b'G', 0, 1, 2]);
        package
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut package = sample_package();
        package.insert("content.xml", "<changed/>");

        assert_eq!(package.len(), 3);
        assert_eq!(package.names().next(), Some("content.xml"));
        assert_eq!(package.get("content.xml"), Some(&b"<changed/>"[..]));
    }

    #[test]
    fn test_get_str_missing_entry() {
        let package = Package::new();
        let result = package.get_str("styles.xml");
        assert!(matches!(result, Err(StoreError::MissingEntry(name)) if name == "styles.xml"));
    }

    #[test]
    fn test_get_str_invalid_utf8() {
        let mut package = Package::new();
        package.insert("content.xml", vec![0xff, 0xfe]);
        assert!(matches!(package.get_str("content.xml"), Err(StoreError::Utf8 { .. })));
    }

    #[test]
    fn test_round_trip_bytes() {
        let package = sample_package();
        let bytes = package.to_bytes().unwrap();
        let loaded = Package::from_bytes(&bytes).unwrap();

        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.get("Pictures/logo.png"), package.get("Pictures/logo.png"));
        assert_eq!(
            loaded.get_str("content.xml").unwrap(),
            "<office:document-content/>"
        );
    }

    #[test]
    fn test_mimetype_written_first_and_stored() {
        let bytes = sample_package().to_bytes().unwrap();
        let loaded = Package::from_bytes(&bytes).unwrap();

        let first = &loaded.entries()[0];
        assert_eq!(first.name(), MIMETYPE_ENTRY);
        assert_eq!(first.compression(), CompressionMethod::Stored);
        assert_eq!(loaded.entries()[1].compression(), CompressionMethod::Deflated);
    }

    #[test]
    fn test_write_to_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.odt");

        sample_package().write_to_file(&path).unwrap();
        let loaded = Package::read_from_file(&path).unwrap();
        assert!(loaded.contains("content.xml"));
        assert!(loaded.contains(MIMETYPE_ENTRY));
    }

    #[test]
    fn test_write_to_missing_folder_leaves_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("out.odt");

        assert!(sample_package().write_to_file(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_read_capacity_is_bounded() {
        assert_eq!(read_capacity(12), 12);
        assert_eq!(read_capacity(u64::from(u32::MAX)), MAX_PREALLOC);
        assert_eq!(read_capacity(u64::MAX), MAX_PREALLOC);
    }

    #[test]
    fn test_read_with_inflated_declared_sizes() {
        const CENTRAL: [u8; 4] = [0x50, 0x4b, 0x01, 0x02];
        const LOCAL: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];
        let huge = 0xFFFF_FFF0u32.to_le_bytes();

        let mut bytes = sample_package().to_bytes().unwrap();
        let mut i = 0;
        while i + 4 <= bytes.len() {
            let sig = &bytes[i..i + 4];
            let offset = if sig == CENTRAL {
                Some(24)
            } else if sig == LOCAL {
                Some(22)
            } else {
                None
            };
            if let Some(offset) = offset {
                bytes[i + offset..i + offset + 4].copy_from_slice(&huge);
            }
            i += 1;
        }

        // Reading may fail on the size mismatch; it must not reserve 4 GiB
        if let Ok(loaded) = Package::from_bytes(&bytes) {
            assert_eq!(loaded.get("Pictures/logo.png"), sample_package().get("Pictures/logo.png"));
        }
    }

    #[test]
    fn test_read_invalid_bytes() {
        let result = Package::from_bytes(b"This is not a zip archive");
        assert!(matches!(result, Err(StoreError::Zip(_))));
    }

    #[test]
    fn test_extract_to_folder() {
        let dir = tempdir().unwrap();
        sample_package().extract_to(dir.path()).unwrap();

        let content = fs::read_to_string(dir.path().join("content.xml")).unwrap();
        assert_eq!(content, "<office:document-content/>");
        assert!(dir.path().join("Pictures").join("logo.png").exists());
    }

    #[test]
    fn test_extract_rejects_escaping_names() {
        let dir = tempdir().unwrap();
        let mut package = Package::new();
        package.insert("../evil.xml", "<x/>");

        let result = package.extract_to(dir.path());
        assert!(matches!(result, Err(StoreError::InvalidEntryName(_))));
    }

    #[test]
    fn test_remove_and_total_size() {
        let mut package = sample_package();
        let before = package.total_size();
        let removed = package.remove("Pictures/logo.png").unwrap();

        assert_eq!(removed.len(), 7);
        assert_eq!(package.total_size(), before - 7);
        assert!(package.remove("Pictures/logo.png").is_none());
    }
}
