//! Adapters - Concrete implementations of the ports.

pub mod ffmpeg;
pub mod fs;
pub mod model;
pub mod s3;
pub mod window;
