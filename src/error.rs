pub use crate::types::ScanError;

pub type Result<T> = std::result::Result<T, ScanError>;

/// Attaches a human readable context to I/O failures.
pub trait ErrorContext<T> {
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|source| ScanError::Filesystem { context: f(), source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_context_is_kept_with_source() {
        let failed: io::Result<()> = Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        let err = failed.with_context(|| "failed to open out-1.json".to_string()).unwrap_err();

        assert!(matches!(err, ScanError::Filesystem { .. }));
        assert_eq!(err.to_string(), "Filesystem error: failed to open out-1.json: denied");
    }
}
