//! IO modules - side effects (streaming downloads, archives, copies)

pub mod download;
pub mod extract;
pub mod fs;
