//! Storage module for uploaded file bytes
//!
//! Persists raw file content on a local filesystem directory, addressed by
//! generated names unrelated to the public share codes.

mod disk_store;

pub use disk_store::DiskStore;
