use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced to the caller. Expected conditions (permission denied
/// on open, a vanished device node, an empty non-blocking read) are handled
/// internally and never reach this type.
#[derive(Debug, Error)]
pub enum Error {
    /// A required kernel call on a device node failed.
    #[error("{op} failed for {}: {source}", .path.display())]
    Device {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Setting up or draining the device-directory watch failed.
    #[error("watching {} failed: {source}", .path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A config file could not be read or written.
    #[error("config {}: {source}", .path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A config file held malformed JSON.
    #[error("config {}: {source}", .path.display())]
    ConfigFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
