//! Application layer - Generic services over the ports.

pub mod clustering;
pub mod extraction;
pub mod pipeline;

use std::io;
use std::path::Path;

/// Local cleanup must be safe to repeat when a step is re-entered after an
/// interruption.
pub(crate) async fn remove_file_if_exists(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}
