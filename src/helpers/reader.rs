use crate::error::FiscaError;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::path::Path;

/// Signature of an OLE2 compound document (legacy xls, encrypted xlsx)
const CFB_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// A unified reader over a local file or an in-memory buffer
pub enum UnifiedReader {
    /// Local file reader
    Local(BufReader<File>),
    /// In-memory buffer
    Memory(Cursor<Vec<u8>>),
}

impl UnifiedReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<UnifiedReader, FiscaError> {
        let file = File::open(path)?;
        Ok(UnifiedReader::Local(BufReader::new(file)))
    }

    pub fn from_bytes(bytes: Vec<u8>) -> UnifiedReader {
        UnifiedReader::Memory(Cursor::new(bytes))
    }

    /// Checks whether the content is an OLE2 compound document rather than a
    /// ZIP package. Office wraps password protected workbooks this way.
    /// Leaves the reader positioned at the start.
    pub(crate) fn is_compound_document(&mut self) -> Result<bool, FiscaError> {
        let mut signature = [0u8; 8];
        self.seek(SeekFrom::Start(0))?;
        let matched = match self.read_exact(&mut signature) {
            Ok(()) => signature == CFB_SIGNATURE,
            Err(error) if error.kind() == std::io::ErrorKind::UnexpectedEof => false,
            Err(error) => Err(error)?,
        };
        self.seek(SeekFrom::Start(0))?;
        Ok(matched)
    }
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
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        match self {
            UnifiedReader::Local(reader) => reader.seek(pos),
            UnifiedReader::Memory(reader) => reader.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_local_file() {
        // Cargo.toml exists at the package root during tests
        let result = UnifiedReader::open("Cargo.toml");
        assert!(result.is_ok(), "Failed to open local file: {:?}", result.err());

        let result = UnifiedReader::open("non_existent_file.xlsx");
        assert!(result.is_err(), "Should fail to open non-existent file");
    }

    #[test]
    fn test_compound_document_detection() {
        let mut bytes = CFB_SIGNATURE.to_vec();
        bytes.extend_from_slice(&[0u8; 16]);
        let mut reader = UnifiedReader::from_bytes(bytes);
        assert!(reader.is_compound_document().unwrap());

        let mut reader = UnifiedReader::from_bytes(b"PK\x03\x04rest".to_vec());
        assert!(!reader.is_compound_document().unwrap());

        let mut reader = UnifiedReader::from_bytes(b"PK".to_vec());
        assert!(!reader.is_compound_document().unwrap());
    }
}
