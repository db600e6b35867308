use crate::error::PriceListError;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub(crate) enum UnifiedReaderError {
    #[error("No data from remote file: '{0}'")]
    RemoteFileNoDataError(String),
}

/// A reader over a local file, a downloaded remote file or bytes already in memory
pub(crate) enum UnifiedReader {
    /// Local file reader
    Local(BufReader<File>),
    /// In-memory buffer, filled from a remote URL or handed over by the caller
    Memory(Cursor<Vec<u8>>),
}

impl UnifiedReader {
    /// Opens a local path or a remote URL.
    /// Remote URLs go through DuckDB's `read_blob`, which owns protocols and credentials.
    pub(crate) fn new(file_name: &str) -> Result<UnifiedReader, PriceListError> {
        if Self::is_remote_url(file_name) {
            Self::read_blob_with_duckdb(file_name)
        } else {
            let file = File::open(local_path(file_name))?;
            Ok(UnifiedReader::Local(BufReader::new(file)))
        }
    }

    /// Wraps bytes that are already in memory
    pub(crate) fn from_bytes(bytes: Vec<u8>) -> UnifiedReader {
        UnifiedReader::Memory(Cursor::new(bytes))
    }

    /// Checks if a file name represents a remote URL
    pub(crate) fn is_remote_url(file_name: &str) -> bool {
        if let Ok(url) = Url::parse(file_name) {
            // One-letter schemes are Windows drive letters
            url.scheme() != "file" && url.scheme().len() > 1
        } else {
            false
        }
    }

    fn read_blob_with_duckdb(file_name: &str) -> Result<UnifiedReader, PriceListError> {
        let connection = duckdb::Connection::open_in_memory()?;
        let result: Result<Vec<u8>, _> = connection.query_row("SELECT content FROM read_blob(?)", [file_name], |row| row.get(0));
        connection.close().map_err(|(_, e)| e)?;

        let bytes = result?;
        if bytes.is_empty() {
            Err(UnifiedReaderError::RemoteFileNoDataError(file_name.to_owned()))?;
        }
        Ok(UnifiedReader::from_bytes(bytes))
    }
}

/// Strips the `file://` scheme so the rest opens as a plain path
fn local_path(file_name: &str) -> String {
    Url::parse(file_name)
        .ok()
        .filter(|url| url.scheme() == "file")
        .and_then(|url| url.to_file_path().ok())
        .map(|path| path.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_owned())
}

impl Read for UnifiedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            UnifiedReader::Local(reader) => reader.read(buf),
            UnifiedReader::Memory(reader) => reader.read(buf),
        }
    }
}

impl Seek for UnifiedReader {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        match self {
            UnifiedReader::Local(reader) => reader.seek(pos),
            UnifiedReader::Memory(reader) => reader.seek(pos),
        }
    }
}
