//! Ports - Trait seams for the external collaborators.

pub mod checkpoint;
pub mod decoder;
pub mod similarity;
pub mod storage;
