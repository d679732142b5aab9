//! Exit codes following sysexits.h conventions.
//!
//! These codes provide semantic meaning for different failure modes,
//! enabling scripts and CI systems to handle errors appropriately.

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// `submit` found a stored near-duplicate. Not an error; nothing was stored.
/// Kept clear of 2, which clap uses for argument errors.
pub const DUPLICATE_FOUND: i32 = 3;

/// Command line usage error.
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Data format error (undecodable image, malformed ground truth).
/// Maps to EX_DATAERR from sysexits.h.
pub const DATA_ERROR: i32 = 65;

/// Cannot open input file.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// Repository unreachable or failing.
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const UNAVAILABLE: i32 = 69;

/// I/O error (cannot write to the upload directory).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Represents an exit code with optional error context.
#[derive(Debug)]
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    /// Exit with `code` without printing anything further.
    pub const fn silent(code: i32) -> Self {
        Self { code, message: None }
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");
        Self {
            code: classify(&message),
            message: Some(message),
        }
    }
}

/// Classify an error chain by the context messages the commands attach.
fn classify(message: &str) -> i32 {
    if message.contains("Failed to read file")
        || message.contains("Failed to read directory")
        || message.contains("Failed to read ground truth")
    {
        INPUT_ERROR
    } else if message.contains("Decode error")
        || message.contains("Invalid ground truth")
        || message.contains("not comparable")
    {
        DATA_ERROR
    } else if message.contains("Repository error")
        || message.contains("Database connection")
        || message.contains("Failed to connect")
    {
        UNAVAILABLE
    } else if message.contains("Failed to write")
        || message.contains("Failed to reset")
        || message.contains("Persistence error")
    {
        IO_ERROR
    } else {
        GENERAL_ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_classify_by_context() {
        let missing: anyhow::Result<()> = Err(std::io::Error::from(std::io::ErrorKind::NotFound))
            .context("Failed to read file: cat.png");
        assert_eq!(ExitCode::from_anyhow(&missing.unwrap_err()).code, INPUT_ERROR);

        assert_eq!(classify("Failed to fingerprint x.png: Decode error: bad magic"), DATA_ERROR);
        assert_eq!(classify("Failed to connect to database: Database connection error: refused"), UNAVAILABLE);
        assert_eq!(classify("Failed to reset storage: permission denied"), IO_ERROR);
        assert_eq!(classify("something else"), GENERAL_ERROR);
    }

    #[test]
    fn test_success_has_no_message() {
        let exit = ExitCode::success();
        assert_eq!(exit.code, SUCCESS);
        assert!(exit.message.is_none());
    }
}
