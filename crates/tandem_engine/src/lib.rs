//! # Tandem Engine
//!
//! Reactive reconciliation engine for Tandem.
//!
//! This crate provides:
//! - Store adapter traits (`LocalStore`, `RemoteStore`)
//! - The engine task that re-runs the decision table on every input change
//! - Owner-scoped sessions that restart the engine on identity changes
//! - A dispatcher for fire-and-forget store writes
//! - In-memory reference stores
//!
//! ## Architecture
//!
//! Every input is a `tokio::sync::watch` channel. The engine keeps the latest
//! value of each, runs one pass per change and publishes the results on five
//! output channels that only wake subscribers when a value actually changes.
//!
//! ## Key Invariants
//!
//! - At most one corrective action per pass
//! - An identical action is not re-dispatched until the inputs converge
//! - Writes never run on the engine task
//! - An engine never outlives the owner it was started for

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod dispatch;
mod engine;
mod error;
mod gate;
mod memory;
mod session;
mod source;

pub use config::EngineConfig;
pub use dispatch::Dispatcher;
pub use engine::{SyncEngine, SyncOutputs, SyncStats};
pub use error::{EngineError, EngineResult};
pub use memory::{MemoryLocalStore, MemoryRemoteStore};
pub use session::SyncSession;
pub use source::{silent, LocalStore, RemoteStore, StatusReceiver};
