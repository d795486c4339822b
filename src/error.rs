use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for simulation setup and execution.
#[derive(Debug, Error)]
pub enum Error {
    /// Inconsistent problem definition (materials, cells, estimators).
    /// Setup must abort before any history runs.
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid user or API parameter.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// The worker pool could not be created.
    #[error("thread pool error: {0}")]
    ThreadPool(String),

    /// Writing a summary failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Geometry failure for a single particle.
///
/// Returned by every geometry query. The transport loop recovers from it
/// locally by terminating only the affected particle, so it never becomes
/// an [`Error`].
#[derive(Debug, Clone, Error, PartialEq)]
#[error("particle lost: {message}")]
pub struct LostParticle {
    pub message: String,
}

impl LostParticle {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_is_informative() {
        let e = Error::Config("cell 3 already has material 1".to_string());
        let msg = format!("{e}");
        assert!(msg.contains("configuration error"));
        assert!(msg.contains("cell 3"));
    }

    #[test]
    fn test_lost_particle_message() {
        let lost = LostParticle::new("no cell contains point");
        assert_eq!(format!("{lost}"), "particle lost: no cell contains point");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let e: Error = io.into();
        assert!(matches!(e, Error::Io(_)));
        assert_eq!(format!("{e}"), "pipe closed");
    }

    #[test]
    fn test_result_type_alias() -> Result<()> {
        Ok(())
    }
}
