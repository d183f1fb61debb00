//! Exit codes for the CLI tool.

use nszconv::Error;

/// Exit code constants
pub const SUCCESS: i32 = 0;
/// Fatal error occurred
pub const FATAL_ERROR: i32 = 2;
/// Corrupt or unsupported input
pub const BAD_INPUT: i32 = 3;
/// Entry hash verification failed
pub const HASH_MISMATCH: i32 = 4;
/// I/O error
pub const IO_ERROR: i32 = 5;
/// Ctrl+C (128 + SIGINT)
pub const USER_INTERRUPT: i32 = 130;
/// Invalid command line arguments
pub const BAD_ARGS: i32 = 255;

/// Exit code enum for structured handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    FatalError,
    BadInput,
    HashMismatch,
    IoError,
    UserInterrupt,
    BadArgs,
}

impl ExitCode {
    /// Returns the numeric exit code
    pub fn code(self) -> i32 {
        match self {
            Self::Success => SUCCESS,
            Self::FatalError => FATAL_ERROR,
            Self::BadInput => BAD_INPUT,
            Self::HashMismatch => HASH_MISMATCH,
            Self::IoError => IO_ERROR,
            Self::UserInterrupt => USER_INTERRUPT,
            Self::BadArgs => BAD_ARGS,
        }
    }
}

/// Converts an nszconv error to an exit code
pub fn error_to_exit_code(error: &Error) -> ExitCode {
    match error {
        Error::Io(_) => ExitCode::IoError,
        Error::UnsupportedFormat(_) => ExitCode::BadInput,
        Error::CorruptHeader { .. } => ExitCode::BadInput,
        Error::DecompressionFailure { .. } => ExitCode::BadInput,
        Error::InvalidEntryName(_) => ExitCode::BadInput,
        Error::HashMismatch { .. } => ExitCode::HashMismatch,
        Error::CryptoError(_) => ExitCode::FatalError,
        Error::ResourceLimitExceeded(_) => ExitCode::FatalError,
        Error::Cancelled => ExitCode::UserInterrupt,
        // Future error variants - required by #[non_exhaustive]
        _ => ExitCode::FatalError,
    }
}
