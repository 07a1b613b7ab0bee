//! File sources layered by the loader.

pub mod global_file;
pub mod workspace_file;
