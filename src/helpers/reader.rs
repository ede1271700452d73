use crate::error::RustyQuizError;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use thiserror::Error;
use url::Url;

/// Signature of an OLE compound file, the container used by encrypted Office Open XML packages
const COMPOUND_FILE_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

#[derive(Error, Debug)]
pub(crate) enum UnifiedReaderError {
    #[error("No data from remote file: '{0}'")]
    RemoteFileNoDataError(String),
}

/// A unified reader that can handle both local files and remote URLs
pub(crate) enum UnifiedReader {
    /// Local file reader
    Local(BufReader<File>),
    /// Remote URL reader (in-memory buffer)
    Remote(Cursor<Vec<u8>>),
}

impl UnifiedReader {
    /// Opens a file from either a local path or remote URL
    /// For remote URLs, uses DuckDB's read_blob with proper credential handling
    ///
    /// # Arguments
    /// * `file_name` - Path or URL to the file
    ///
    /// # Returns
    /// * `Result<UnifiedReader, RustyQuizError>` - Reader for the file content
    pub(crate) fn new(file_name: &str) -> Result<UnifiedReader, RustyQuizError> {
        if Self::is_remote_url(file_name) {
            // DuckDB handles credentials and protocols (http, https, s3, gs, hf, ...)
            Self::read_blob_with_duckdb(file_name)
        } else {
            let file = File::open(file_name)?;
            Ok(UnifiedReader::Local(BufReader::new(file)))
        }
    }

    /// Checks if a file name represents a remote URL
    pub(crate) fn is_remote_url(file_name: &str) -> bool {
        if let Ok(url) = Url::parse(file_name) {
            // Single letter schemes are Windows drive letters
            url.scheme() != "file" && url.scheme().len() > 1
        } else {
            false
        }
    }

    /// Reads a remote file using DuckDB's read_blob functionality
    fn read_blob_with_duckdb(file_name: &str) -> Result<UnifiedReader, RustyQuizError> {
        let connection = duckdb::Connection::open_in_memory()?;
        let result: Result<Vec<u8>, _> = connection.query_row("SELECT content FROM read_blob(?)", [file_name], |row| row.get(0));
        connection.close().map_err(|(_, e)| e)?;

        let bytes = result?;
        if bytes.is_empty() {
            Err(UnifiedReaderError::RemoteFileNoDataError(file_name.to_owned()))?;
        }

        Ok(UnifiedReader::Remote(Cursor::new(bytes)))
    }

    /// Reads the first bytes of the file and rewinds, used for format sniffing
    pub(crate) fn peek(&mut self, buffer: &mut [u8]) -> Result<usize, RustyQuizError> {
        let mut size = 0usize;
        while size < buffer.len() {
            let count = self.read(&mut buffer[size..])?;
            if count == 0 {
                break;
            }
            size += count;
        }
        self.rewind()?;
        Ok(size)
    }

    /// Checks whether the file is an OLE compound file rather than a ZIP package.
    /// Password protected .xlsx/.docx files are stored this way.
    pub(crate) fn is_compound_file(&mut self) -> Result<bool, RustyQuizError> {
        let mut signature = [0u8; 8];
        let size = self.peek(&mut signature)?;
        Ok(size == signature.len() && signature == COMPOUND_FILE_SIGNATURE)
    }
}

impl Read for UnifiedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            UnifiedReader::Local(reader) => reader.read(buf),
            UnifiedReader::Remote(reader) => reader.read(buf),
        }
    }
}

impl Seek for UnifiedReader {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        match self {
            UnifiedReader::Local(reader) => reader.seek(pos),
            UnifiedReader::Remote(reader) => reader.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_remote_url() {
        // Test local files
        assert!(!UnifiedReader::is_remote_url("test.docx"));
        assert!(!UnifiedReader::is_remote_url("/path/to/test.docx"));
        assert!(!UnifiedReader::is_remote_url("./relative/test.xlsx"));
        assert!(!UnifiedReader::is_remote_url("C:\\data\\test.xlsx"));

        // Test remote URLs
        assert!(UnifiedReader::is_remote_url("http://example.com/test.docx"));
        assert!(UnifiedReader::is_remote_url("https://example.com/test.xlsx"));
        assert!(UnifiedReader::is_remote_url("s3://bucket/test.xlsx"));
        assert!(UnifiedReader::is_remote_url("gs://bucket/test.docx"));

        // Test file URLs (should not be considered remote)
        assert!(!UnifiedReader::is_remote_url("file:///path/to/test.xlsx"));
    }

    #[test]
    fn test_open_local_file() {
        let result = UnifiedReader::new("Cargo.toml");
        assert!(result.is_ok(), "Failed to open local file: {:?}", result.err());

        let result = UnifiedReader::new("non_existent_file.docx");
        assert!(result.is_err(), "Should fail to open non-existent file");
    }

    #[test]
    fn test_peek_rewinds() {
        let mut reader = UnifiedReader::Remote(Cursor::new(b"PK\x03\x04rest".to_vec()));
        let mut magic = [0u8; 4];
        assert_eq!(reader.peek(&mut magic).unwrap(), 4);
        assert_eq!(&magic, b"PK\x03\x04");
        let mut all = Vec::new();
        reader.read_to_end(&mut all).unwrap();
        assert_eq!(all, b"PK\x03\x04rest");
    }

    #[test]
    fn test_is_compound_file() {
        let mut encrypted = UnifiedReader::Remote(Cursor::new(COMPOUND_FILE_SIGNATURE.to_vec()));
        assert!(encrypted.is_compound_file().unwrap());
        let mut package = UnifiedReader::Remote(Cursor::new(b"PK\x03\x04".to_vec()));
        assert!(!package.is_compound_file().unwrap());
    }
}
