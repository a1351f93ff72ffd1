//! # Tandem Testkit
//!
//! Test utilities for Tandem.
//!
//! This crate provides:
//! - `Doc`, a small synchronized entity for tests
//! - `RecordingResolver`, a resolver that records every write it is asked for
//! - Property-based test generators using proptest
//! - Helpers for awaiting `watch` channels with a deadline
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tandem_testkit::prelude::*;
//!
//! #[test]
//! fn remote_row_is_copied() {
//!     let resolver = RecordingResolver::new(Doc::new("alice", 0, ""));
//!     // ... drive the decision table
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod wait;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::wait::*;
}

pub use fixtures::*;
pub use generators::*;
pub use wait::*;
