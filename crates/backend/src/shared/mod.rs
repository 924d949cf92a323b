pub mod config;
pub mod data;
pub mod docstore;
pub mod format;
