//! Archive container.
//!
//! A zip file holding `manifest.json`, the media payloads under `images/`,
//! and `manifest-with-hashes.json` written after the media. The writer only
//! needs `Write`, so it can feed a pipe; the reader needs `Read + Seek`.

use std::io::{Read, Seek, Write};

use serde_json::Value;
use zip::result::ZipError;
use zip::write::{SimpleFileOptions, StreamWriter};
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::types::{ExchangeError, ExchangeResult, ExportManifest, MANIFEST_VERSION};

/// Manifest entry written first, without hashes.
pub const MANIFEST_ENTRY: &str = "manifest.json";

/// Manifest entry written after the media, with hashes filled in.
pub const HASHED_MANIFEST_ENTRY: &str = "manifest-with-hashes.json";

/// Directory holding media payloads.
pub const MEDIA_DIR: &str = "images";

/// Streaming archive writer.
pub struct ArchiveWriter<W: Write> {
    zip: ZipWriter<StreamWriter<W>>,
}

impl<W: Write> ArchiveWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            zip: ZipWriter::new_stream(sink),
        }
    }

    /// Write a manifest as a deflated JSON entry.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the sink fails.
    pub fn write_manifest(&mut self, name: &str, manifest: &ExportManifest) -> ExchangeResult<()> {
        let json = serde_json::to_vec_pretty(manifest)?;
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.zip.start_file(name, options)?;
        self.zip.write_all(&json)?;
        Ok(())
    }

    /// Write a media payload. Media is stored, not compressed.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink fails.
    pub fn write_media(&mut self, path: &str, bytes: &[u8]) -> ExchangeResult<()> {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .large_file(bytes.len() as u64 >= u64::from(u32::MAX));
        self.zip.start_file(path, options)?;
        self.zip.write_all(bytes)?;
        Ok(())
    }

    /// Write the central directory and flush the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink fails.
    pub fn finish(self) -> ExchangeResult<()> {
        let mut sink = self.zip.finish()?;
        sink.flush()?;
        Ok(())
    }
}

/// Parse and version-check manifest bytes.
///
/// # Errors
///
/// `Json` if the bytes aren't JSON, `UnsupportedVersion` if `version` isn't 1,
/// `InvalidManifest` if the shape is wrong.
pub fn parse_manifest(bytes: &[u8]) -> ExchangeResult<ExportManifest> {
    let value: Value = serde_json::from_slice(bytes)?;

    match value.get("version") {
        Some(v) if v.as_u64() == Some(MANIFEST_VERSION) => {}
        Some(v) => return Err(ExchangeError::UnsupportedVersion { found: v.to_string() }),
        None => {
            return Err(ExchangeError::UnsupportedVersion {
                found: "missing".to_string(),
            })
        }
    }

    serde_json::from_value(value).map_err(|e| ExchangeError::InvalidManifest(e.to_string()))
}

/// Random-access archive reader.
pub struct ArchiveReader<R: Read + Seek> {
    zip: ZipArchive<R>,
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// Open an archive.
    ///
    /// # Errors
    ///
    /// Returns `Archive` if the input isn't a zip file.
    pub fn open(source: R) -> ExchangeResult<Self> {
        Ok(Self {
            zip: ZipArchive::new(source)?,
        })
    }

    /// Read an entry fully. `None` if the archive has no such entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry exists but can't be read.
    pub fn read_entry(&mut self, name: &str) -> ExchangeResult<Option<Vec<u8>>> {
        let mut file = match self.zip.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut bytes = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
        file.read_to_end(&mut bytes)?;
        Ok(Some(bytes))
    }

    /// Read the manifest, preferring the hashed one.
    ///
    /// Returns the manifest and whether it was the hashed variant.
    ///
    /// # Errors
    ///
    /// `MissingManifest` if neither entry exists, else see [`parse_manifest`].
    pub fn manifest(&mut self) -> ExchangeResult<(ExportManifest, bool)> {
        if let Some(bytes) = self.read_entry(HASHED_MANIFEST_ENTRY)? {
            return Ok((parse_manifest(&bytes)?, true));
        }
        if let Some(bytes) = self.read_entry(MANIFEST_ENTRY)? {
            return Ok((parse_manifest(&bytes)?, false));
        }
        Err(ExchangeError::MissingManifest)
    }

    /// Names of the media entries.
    #[must_use]
    pub fn media_entries(&self) -> Vec<String> {
        let dir = format!("{MEDIA_DIR}/");
        self.zip
            .file_names()
            .filter(|name| name.starts_with(&dir) && !name.ends_with('/'))
            .map(str::to_string)
            .collect()
    }
}
