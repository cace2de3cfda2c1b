//! Network description tables and the loader for their text files.

pub mod tables;
pub mod loader;
