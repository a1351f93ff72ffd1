//! # Tandem Store
//!
//! File-backed local cache for Tandem.
//!
//! This crate provides:
//! - `FileLocalStore`, a `LocalStore` that keeps one CBOR file per owner
//! - `FileStoreConfig` for opening a store directory
//! - `StoreError` and its mapping onto `EngineError`
//!
//! ## Key Invariants
//!
//! - One process writes a store directory at a time (`LOCK`)
//! - A row file is replaced atomically; readers never see a torn write
//! - A write older than the stored row is rejected

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod file;
mod layout;

pub use config::FileStoreConfig;
pub use error::{StoreError, StoreResult};
pub use file::FileLocalStore;
