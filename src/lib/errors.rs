//! Custom error types for gamsort operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for gamsort operations
pub type Result<T> = std::result::Result<T, GamsortError>;

/// Error type for gamsort operations
#[derive(Error, Debug)]
pub enum GamsortError {
    /// The input record stream was malformed or truncated, or could not be
    /// read. Fatal: the sort aborts and all spill files are cleaned up.
    #[error("Failed to read input record stream: {source}")]
    InputRead {
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A spill file could not be created or written (e.g. storage
    /// exhaustion). Fatal: spills created so far are cleaned up before the
    /// error propagates.
    #[error("Failed to write spill file '{}': {source}", path.display())]
    SpillWrite {
        /// Path of the spill file that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A previously written spill file could not be read back during the
    /// merge. The engine never mutates a spill after writing it, so this
    /// indicates storage-layer corruption.
    #[error("Failed to read spill file '{}': {source}", path.display())]
    SpillRead {
        /// Path of the spill file that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The sorted output stream could not be written.
    #[error("Failed to write sorted output: {source}")]
    OutputWrite {
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// File format error
    #[error("Invalid {file_type} file '{path}': {reason}")]
    InvalidFileFormat {
        /// Type of file (e.g., "GAM")
        file_type: String,
        /// Path to the file
        path: String,
        /// Explanation of the problem
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn io_err(msg: &str) -> io::Error {
        io::Error::new(io::ErrorKind::Other, msg.to_string())
    }

    #[test]
    fn test_input_read() {
        let error = GamsortError::InputRead { source: io_err("unexpected end of frame") };
        let msg = format!("{error}");
        assert!(msg.contains("Failed to read input record stream"));
        assert!(msg.contains("unexpected end of frame"));
    }

    #[test]
    fn test_spill_write() {
        let error = GamsortError::SpillWrite {
            path: PathBuf::from("/tmp/sort/chunk_0001.gam"),
            source: io_err("no space left on device"),
        };
        let msg = format!("{error}");
        assert!(msg.contains("chunk_0001.gam"));
        assert!(msg.contains("no space left on device"));
    }

    #[test]
    fn test_spill_read() {
        let error = GamsortError::SpillRead {
            path: PathBuf::from("/tmp/sort/chunk_0002.gam"),
            source: io_err("bad frame"),
        };
        let msg = format!("{error}");
        assert!(msg.contains("Failed to read spill file"));
        assert!(msg.contains("chunk_0002.gam"));
    }

    #[test]
    fn test_invalid_file_format() {
        let error = GamsortError::InvalidFileFormat {
            file_type: "GAM".to_string(),
            path: "/path/to/file.gam".to_string(),
            reason: "File does not exist".to_string(),
        };
        let msg = format!("{error}");
        assert!(msg.contains("Invalid GAM file"));
        assert!(msg.contains("File does not exist"));
    }
}
