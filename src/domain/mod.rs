//! Domain layer - Pure state model, no I/O.

pub mod groups;
pub mod meta;
pub mod report;
pub mod submeta;
