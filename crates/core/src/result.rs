//! Result type definition and extension traits.
//!
//! Provides combinators for Result types so callers can log failures
//! without reaching for unwrap/expect.

use crate::error::Error;

/// The standard Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait providing logging combinators for Results.
pub trait ResultExt<T> {
    /// Inspect the error without consuming the Result.
    fn inspect_error<F: FnOnce(&Error)>(self, f: F) -> Self;
}

impl<T> ResultExt<T> for Result<T> {
    fn inspect_error<F: FnOnce(&Error)>(self, f: F) -> Self {
        if let Err(ref e) = self {
            f(e);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect_error_sees_error_only() {
        let mut seen = false;
        let ok: Result<u32> = Ok(1);
        let _ = ok.inspect_error(|_| seen = true);
        assert!(!seen);

        let err: Result<u32> = Err(Error::invalid_value("workers", "zero"));
        let _ = err.inspect_error(|_| seen = true);
        assert!(seen);
    }
}
